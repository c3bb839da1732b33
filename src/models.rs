use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// A name/email pair exactly as it was recorded in a patch header.
///
/// Equality is byte-for-byte on both fields: `A@x.com` and `a@x.com` are
/// two different identities.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Identity {
    pub name: String,
    pub email: String,
}

impl Identity {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
        }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <{}>", self.name, self.email)
    }
}

/// Which header field an identity was taken from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentityRole {
    Author,
    Committer,
}

/// One commit's patch text, tagged with where it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchRecord {
    /// Full name of the repository (`owner/name`)
    pub repository: String,

    /// Commit URL, or the SHA when the listing carried no URL
    pub commit_reference: String,

    /// Raw `git format-patch` text
    pub raw_text: String,
}

/// A commit whose patch discloses the target email address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetMatch {
    pub repository: String,
    pub commit_reference: String,
    pub name: String,
}

/// Every distinct identity seen during an enumerate run.
pub type IdentitySet = BTreeSet<Identity>;

/// What a run is looking for. Chosen once from the `RunConfig`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanMode {
    EnumerateAll,
    FindTarget(String),
}

/// Validated inputs for a single run
#[derive(Clone)]
pub struct RunConfig {
    account: String,
    credential: String,
    target_email: Option<String>,
}

impl RunConfig {
    pub fn new(
        account: impl Into<String>,
        credential: impl Into<String>,
        target_email: Option<String>,
    ) -> Result<Self, ConfigError> {
        let account = account.into();
        let credential = credential.into();

        if account.is_empty() || account.contains('/') || account.chars().any(char::is_whitespace) {
            return Err(ConfigError::InvalidAccount(account));
        }

        // Must be usable verbatim in an Authorization header
        if credential.is_empty() || !credential.chars().all(|c| c.is_ascii_graphic()) {
            return Err(ConfigError::MalformedCredential);
        }

        if let Some(ref email) = target_email {
            if email.is_empty() || !email.contains('@') {
                return Err(ConfigError::InvalidTargetEmail(email.clone()));
            }
        }

        Ok(Self {
            account,
            credential,
            target_email,
        })
    }

    pub fn account(&self) -> &str {
        &self.account
    }

    pub fn credential(&self) -> &str {
        &self.credential
    }

    pub fn target_email(&self) -> Option<&str> {
        self.target_email.as_deref()
    }

    pub fn mode(&self) -> ScanMode {
        match self.target_email {
            Some(ref email) => ScanMode::FindTarget(email.clone()),
            None => ScanMode::EnumerateAll,
        }
    }
}

// Keep the credential out of debug logs
impl fmt::Debug for RunConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunConfig")
            .field("account", &self.account)
            .field("credential", &"<redacted>")
            .field("target_email", &self.target_email)
            .finish()
    }
}

/// Outcome of an aggregation run, shaped by the mode
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", content = "results", rename_all = "snake_case")]
pub enum ScanResult {
    Identities(IdentitySet),
    Matches(Vec<TargetMatch>),
}

impl ScanResult {
    pub fn len(&self) -> usize {
        match self {
            ScanResult::Identities(set) => set.len(),
            ScanResult::Matches(matches) => matches.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Complete report of a finished run
#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    /// Account whose repositories were scanned
    pub account: String,

    /// Email searched for, if the run was targeted
    pub target_email: Option<String>,

    pub result: ScanResult,

    /// Repositories whose commit listings were visited
    pub repositories: usize,

    /// Patches fetched and inspected
    pub patches: usize,

    /// Calls skipped after exhausting retries or being rejected
    pub warnings: usize,
}

/// Settings read from `.patchfinderrc`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Base URL of the GitHub REST API
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Page size for repository and commit listings
    #[serde(default = "default_per_page")]
    pub per_page: u32,

    /// Attempts per call before a transient failure is given up on
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// First backoff delay in milliseconds; doubles on every retry
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Upper bound for a single backoff delay in milliseconds
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Per-request timeout (e.g. "30s", "2m")
    #[serde(default = "default_timeout")]
    pub timeout: String,

    /// Scan repositories that are forks of another repository
    #[serde(default = "default_include_forks")]
    pub include_forks: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            per_page: default_per_page(),
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            timeout: default_timeout(),
            include_forks: default_include_forks(),
        }
    }
}

fn default_api_url() -> String {
    "https://api.github.com".to_string()
}

fn default_per_page() -> u32 {
    100
}

fn default_max_attempts() -> u32 {
    4
}

fn default_base_delay_ms() -> u64 {
    500
}

fn default_max_delay_ms() -> u64 {
    30_000
}

fn default_timeout() -> String {
    "30s".to_string()
}

fn default_include_forks() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_equality_is_case_sensitive() {
        let upper = Identity::new("Name", "A@x.com");
        let lower = Identity::new("Name", "a@x.com");
        assert_ne!(upper, lower);

        let mut set = IdentitySet::new();
        set.insert(upper.clone());
        set.insert(lower);
        set.insert(upper);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_identity_display() {
        let identity = Identity::new("Alice", "alice@example.com");
        assert_eq!(identity.to_string(), "Alice <alice@example.com>");
    }

    #[test]
    fn test_run_config_mode() {
        let config = RunConfig::new("octocat", "ghp_token", None).unwrap();
        assert_eq!(config.mode(), ScanMode::EnumerateAll);

        let config =
            RunConfig::new("octocat", "ghp_token", Some("me@example.com".to_string())).unwrap();
        assert_eq!(
            config.mode(),
            ScanMode::FindTarget("me@example.com".to_string())
        );
    }

    #[test]
    fn test_run_config_rejects_malformed_credential() {
        assert!(matches!(
            RunConfig::new("octocat", "", None),
            Err(ConfigError::MalformedCredential)
        ));
        assert!(matches!(
            RunConfig::new("octocat", "ghp token", None),
            Err(ConfigError::MalformedCredential)
        ));
        assert!(matches!(
            RunConfig::new("octocat", "ghp_tok\nen", None),
            Err(ConfigError::MalformedCredential)
        ));
    }

    #[test]
    fn test_run_config_rejects_bad_account_and_email() {
        assert!(matches!(
            RunConfig::new("", "ghp_token", None),
            Err(ConfigError::InvalidAccount(_))
        ));
        assert!(matches!(
            RunConfig::new("org/repo", "ghp_token", None),
            Err(ConfigError::InvalidAccount(_))
        ));
        assert!(matches!(
            RunConfig::new("octocat", "ghp_token", Some("not-an-email".to_string())),
            Err(ConfigError::InvalidTargetEmail(_))
        ));
    }

    #[test]
    fn test_run_config_debug_redacts_credential() {
        let config = RunConfig::new("octocat", "ghp_secret", None).unwrap();
        let debug = format!("{:?}", config);
        assert!(debug.contains("octocat"));
        assert!(!debug.contains("ghp_secret"));
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.api_url, "https://api.github.com");
        assert_eq!(config.per_page, 100);
        assert_eq!(config.max_attempts, 4);
        assert!(config.include_forks);
    }

    #[test]
    fn test_scan_result_len() {
        let mut set = IdentitySet::new();
        set.insert(Identity::new("Alice", "alice@example.com"));
        assert_eq!(ScanResult::Identities(set).len(), 1);
        assert!(ScanResult::Matches(vec![]).is_empty());
    }
}

//! Error types for the patch traversal.
//!
//! [`FetchError`] is what the governor hands back for a failed remote call.
//! Only [`FetchError::is_fatal`] errors ever escape the fetcher; everything
//! else is downgraded to a skipped item and a warning.

use thiserror::Error;

/// Failure of a single remote call after the governor is done with it.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    /// The credential was rejected (HTTP 401).
    #[error("GitHub authentication failed: {0}")]
    Unauthorized(String),

    /// The account whose repositories were requested does not exist.
    #[error("GitHub account not found: {0}")]
    AccountNotFound(String),

    /// The requested resource does not exist or is hidden from us.
    #[error("not found: {url}")]
    NotFound { url: String },

    /// A client error that retrying cannot fix (forbidden, empty repository, ...).
    #[error("request rejected (HTTP {status}): {url}")]
    Rejected { status: u16, url: String },

    /// Every attempt failed with a recoverable error.
    #[error("giving up on {url} after {attempts} attempts: {reason}")]
    Exhausted {
        url: String,
        attempts: u32,
        reason: String,
    },

    /// The payload could not be decoded.
    #[error("failed to decode response from {url}: {reason}")]
    Decode { url: String, reason: String },
}

impl FetchError {
    /// Whether this error must abort the whole run.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            FetchError::Unauthorized(_) | FetchError::AccountNotFound(_)
        )
    }
}

/// Problems with the inputs of a run, caught before any remote call.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid GitHub account name: '{0}'")]
    InvalidAccount(String),

    #[error("malformed credential: the API token must be non-empty printable ASCII")]
    MalformedCredential,

    #[error("invalid target email address: '{0}'")]
    InvalidTargetEmail(String),

    #[error("invalid timeout '{value}': {detail}")]
    InvalidTimeout { value: String, detail: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(FetchError::Unauthorized("HTTP 401".into()).is_fatal());
        assert!(FetchError::AccountNotFound("ghost".into()).is_fatal());
        assert!(!FetchError::NotFound { url: "u".into() }.is_fatal());
        assert!(
            !FetchError::Rejected {
                status: 409,
                url: "u".into()
            }
            .is_fatal()
        );
        assert!(
            !FetchError::Exhausted {
                url: "u".into(),
                attempts: 4,
                reason: "HTTP 502".into()
            }
            .is_fatal()
        );
    }

    #[test]
    fn test_error_display_messages() {
        let err = FetchError::AccountNotFound("ghost".into());
        assert_eq!(err.to_string(), "GitHub account not found: ghost");

        let err = FetchError::Exhausted {
            url: "https://api.github.com/x".into(),
            attempts: 3,
            reason: "HTTP 503".into(),
        };
        assert!(err.to_string().contains("after 3 attempts"));

        assert!(
            ConfigError::MalformedCredential
                .to_string()
                .contains("malformed credential")
        );
    }
}

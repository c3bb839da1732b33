use crate::models::{Identity, IdentityRole};
use regex::Regex;

/// An identity together with the header field it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedIdentity {
    pub role: IdentityRole,
    pub identity: Identity,
}

/// Pulls author/committer identities out of patch headers.
///
/// Recognised fields: `From:` and `Author:` for the author, `Committer:` and
/// `Commit:` for the committer. Only the header block (everything before the
/// first empty line) is looked at, so a commit message quoting a `From:` line
/// contributes nothing.
pub struct IdentityExtractor {
    field: Regex,
    address: Regex,
}

impl IdentityExtractor {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            field: Regex::new(r"^(From|Author|Committer|Commit):[ \t]*(.*)$")?,
            address: Regex::new(r"^(.*)<([^<>]*)>\s*$")?,
        })
    }

    /// Every identity found in the patch header; at most one per role.
    pub fn extract(&self, raw_text: &str) -> Vec<ExtractedIdentity> {
        let mut found: Vec<ExtractedIdentity> = Vec::new();

        for line in header_lines(raw_text) {
            let Some(captures) = self.field.captures(&line) else {
                continue;
            };

            let role = match &captures[1] {
                "From" | "Author" => IdentityRole::Author,
                _ => IdentityRole::Committer,
            };

            if found.iter().any(|f| f.role == role) {
                continue;
            }

            if let Some(identity) = self.parse_address(&captures[2]) {
                found.push(ExtractedIdentity { role, identity });
            }
        }

        found
    }

    /// Split `Name <email>`. The email is kept byte-for-byte; only the name
    /// is trimmed.
    fn parse_address(&self, value: &str) -> Option<Identity> {
        let captures = self.address.captures(value)?;
        let name = captures.get(1)?.as_str().trim();
        let email = captures.get(2)?.as_str();
        Some(Identity::new(name, email))
    }
}

/// Header lines with folded continuations joined
fn header_lines(raw_text: &str) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();

    for line in raw_text.lines() {
        if line.is_empty() {
            break;
        }

        if line.starts_with([' ', '\t']) {
            if let Some(previous) = lines.last_mut() {
                previous.push(' ');
                previous.push_str(line.trim_start());
                continue;
            }
        }

        lines.push(line.to_string());
    }

    lines
}

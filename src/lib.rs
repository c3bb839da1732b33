//! Patchfinder - find identities leaked in commit patches
//!
//! Walks every repository of a GitHub account, downloads the patch of each
//! commit and reads the author/committer headers, which often carry the
//! private email address a developer never meant to publish.
//!
//! # Modes
//!
//! - Enumerate: every distinct `(name, email)` pair found
//! - Targeted: every commit whose patch discloses one given email address
//!
//! # Example
//!
//! ```rust,no_run
//! use patchfinder::*;
//! use std::time::Duration;
//!
//! let config = config::load_config(None).unwrap();
//! let run = RunConfig::new("octocat", "ghp_token", None).unwrap();
//!
//! let transport = github::GitHubTransport::new(run.credential(), Duration::from_secs(30)).unwrap();
//! let scanner = engine::Scanner::new(&config).unwrap();
//! let report = scanner.run(&run, transport, governor::SystemClock).unwrap();
//! println!("{} identities", report.result.len());
//! ```

pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod extractor;
pub mod fetcher;
pub mod github;
pub mod governor;
pub mod models;
pub mod reporter;

#[cfg(test)]
mod test_support;

// Re-export commonly used types
pub use error::{ConfigError, FetchError};
pub use models::{Config, Identity, PatchRecord, RunConfig, ScanMode, ScanReport, ScanResult, TargetMatch};

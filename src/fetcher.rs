//! Lazy traversal of an account's repositories, their commits, and each
//! commit's patch.
//!
//! Repositories are drained one at a time, in listing order. Only
//! credential and account problems end the traversal early; anything else is
//! recorded as a [`FetchWarning`] and skipped.

use crate::error::FetchError;
use crate::github::{CommitSummary, MediaType, RepoSummary, Transport, commits_url, repos_url};
use crate::governor::{Clock, Governor};
use crate::models::{Config, PatchRecord};
use serde::de::DeserializeOwned;
use std::collections::VecDeque;
use std::fmt;
use tracing::{debug, warn};

/// Traversal settings taken from the config file and CLI
#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub api_url: String,
    pub per_page: u32,
    pub include_forks: bool,
}

impl From<&Config> for FetchSettings {
    fn from(config: &Config) -> Self {
        Self {
            api_url: config.api_url.clone(),
            per_page: config.per_page.clamp(1, 100),
            include_forks: config.include_forks,
        }
    }
}

/// A call that was given up on without ending the run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchWarning {
    /// Repository being traversed, if any
    pub repository: Option<String>,
    pub error: FetchError,
}

impl fmt::Display for FetchWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.repository {
            Some(ref repository) => write!(f, "{}: {}", repository, self.error),
            None => write!(f, "{}", self.error),
        }
    }
}

/// Yields one [`PatchRecord`] per commit. A fatal error is yielded once,
/// after which the iterator is exhausted.
pub struct PatchFetcher<T, C> {
    governor: Governor<T, C>,
    account: String,
    settings: FetchSettings,

    repos: VecDeque<RepoSummary>,
    next_repos_page: Option<String>,
    first_repos_page: bool,

    current_repo: Option<String>,
    commits: VecDeque<CommitSummary>,
    next_commits_page: Option<String>,

    warnings: Vec<FetchWarning>,
    repositories: usize,
    patches: usize,
    done: bool,
}

impl<T: Transport, C: Clock> PatchFetcher<T, C> {
    pub fn new(governor: Governor<T, C>, account: &str, settings: FetchSettings) -> Self {
        let first_page = repos_url(&settings.api_url, account, settings.per_page);

        Self {
            governor,
            account: account.to_string(),
            settings,
            repos: VecDeque::new(),
            next_repos_page: Some(first_page),
            first_repos_page: true,
            current_repo: None,
            commits: VecDeque::new(),
            next_commits_page: None,
            warnings: Vec::new(),
            repositories: 0,
            patches: 0,
            done: false,
        }
    }

    /// Calls skipped so far
    pub fn warnings(&self) -> &[FetchWarning] {
        &self.warnings
    }

    /// Repositories whose commits have been (or are being) listed
    pub fn repositories(&self) -> usize {
        self.repositories
    }

    /// Patches successfully fetched
    pub fn patches(&self) -> usize {
        self.patches
    }

    fn fetch_json<D: DeserializeOwned>(
        &mut self,
        url: &str,
    ) -> Result<(D, Option<String>), FetchError> {
        let response = self.governor.get(url, MediaType::Json)?;
        let payload = serde_json::from_str(&response.body).map_err(|e| FetchError::Decode {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        Ok((payload, response.next_page()))
    }

    fn fetch_repos_page(&mut self, url: &str) -> Result<(), FetchError> {
        let first = std::mem::replace(&mut self.first_repos_page, false);

        let (repos, next): (Vec<RepoSummary>, _) = match self.fetch_json(url) {
            Ok(page) => page,
            Err(FetchError::NotFound { .. }) if first => {
                return Err(FetchError::AccountNotFound(self.account.clone()));
            }
            Err(err) => return Err(err),
        };

        debug!(count = repos.len(), more = next.is_some(), "listed repositories");
        self.repos.extend(repos);
        self.next_repos_page = next;
        Ok(())
    }

    fn fetch_commits_page(&mut self, url: &str) -> Result<(), FetchError> {
        let (commits, next): (Vec<CommitSummary>, _) = self.fetch_json(url)?;

        debug!(
            repository = self.current_repo.as_deref().unwrap_or_default(),
            count = commits.len(),
            more = next.is_some(),
            "listed commits"
        );
        self.commits.extend(commits);
        self.next_commits_page = next;
        Ok(())
    }

    fn fetch_patch(&mut self, commit: &CommitSummary) -> Result<PatchRecord, FetchError> {
        let response = self.governor.get(&commit.url, MediaType::Patch)?;
        self.patches += 1;

        Ok(PatchRecord {
            repository: self.current_repo.clone().unwrap_or_default(),
            commit_reference: commit.reference(),
            raw_text: response.body,
        })
    }

    fn skip(&mut self, error: FetchError) {
        let repository = self.current_repo.clone();

        match error {
            // GitHub answers 409 for a repository without commits
            FetchError::Rejected { status: 409, .. } => {
                debug!(repository = repository.as_deref().unwrap_or_default(), "repository is empty");
                return;
            }
            ref error => warn!(
                repository = repository.as_deref().unwrap_or_default(),
                %error,
                "skipping after failed request"
            ),
        }

        self.warnings.push(FetchWarning { repository, error });
    }

    fn abort(&mut self, error: FetchError) -> FetchError {
        self.done = true;
        self.repos.clear();
        self.commits.clear();
        self.next_repos_page = None;
        self.next_commits_page = None;
        error
    }
}

impl<T: Transport, C: Clock> Iterator for PatchFetcher<T, C> {
    type Item = Result<PatchRecord, FetchError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        loop {
            if let Some(commit) = self.commits.pop_front() {
                match self.fetch_patch(&commit) {
                    Ok(record) => return Some(Ok(record)),
                    Err(err) if err.is_fatal() => return Some(Err(self.abort(err))),
                    Err(err) => self.skip(err),
                }
                continue;
            }

            if let Some(url) = self.next_commits_page.take() {
                match self.fetch_commits_page(&url) {
                    Ok(()) => {}
                    Err(err) if err.is_fatal() => return Some(Err(self.abort(err))),
                    Err(err) => self.skip(err),
                }
                continue;
            }

            if let Some(repo) = self.repos.pop_front() {
                if repo.fork && !self.settings.include_forks {
                    debug!(repository = %repo.full_name, "skipping fork");
                    continue;
                }

                self.repositories += 1;
                self.next_commits_page = Some(commits_url(
                    &self.settings.api_url,
                    &repo.full_name,
                    self.settings.per_page,
                ));
                self.current_repo = Some(repo.full_name);
                continue;
            }

            if let Some(url) = self.next_repos_page.take() {
                self.current_repo = None;
                match self.fetch_repos_page(&url) {
                    Ok(()) => {}
                    Err(err) if err.is_fatal() => return Some(Err(self.abort(err))),
                    Err(err) => self.skip(err),
                }
                continue;
            }

            self.done = true;
            return None;
        }
    }
}

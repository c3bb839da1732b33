//! Aggregation of extracted identities into the run's result.

use crate::error::FetchError;
use crate::extractor::IdentityExtractor;
use crate::fetcher::{FetchSettings, PatchFetcher};
use crate::github::Transport;
use crate::governor::{Clock, Governor, RetryPolicy};
use crate::models::{
    Config, IdentitySet, PatchRecord, RunConfig, ScanMode, ScanReport, ScanResult, TargetMatch,
};
use thiserror::Error;
use tracing::{debug, info, warn};

/// A run cut short by a fatal error, with whatever had been gathered so far
#[derive(Debug, Error)]
#[error("{cause}")]
pub struct ScanAborted {
    pub partial: ScanResult,
    #[source]
    pub cause: FetchError,
}

enum Accumulator {
    Enumerate(IdentitySet),
    Target {
        email: String,
        matches: Vec<TargetMatch>,
    },
}

/// Folds patch records into the result for one [`ScanMode`].
pub struct Aggregator<'a> {
    extractor: &'a IdentityExtractor,
    accumulator: Accumulator,
}

impl<'a> Aggregator<'a> {
    pub fn new(mode: ScanMode, extractor: &'a IdentityExtractor) -> Self {
        let accumulator = match mode {
            ScanMode::EnumerateAll => Accumulator::Enumerate(IdentitySet::new()),
            ScanMode::FindTarget(email) => Accumulator::Target {
                email,
                matches: Vec::new(),
            },
        };

        Self {
            extractor,
            accumulator,
        }
    }

    /// Take in one record. The patch text is dropped afterwards.
    pub fn fold(&mut self, record: PatchRecord) {
        let found = self.extractor.extract(&record.raw_text);
        if found.is_empty() {
            debug!(commit = %record.commit_reference, "no identity in patch header");
            return;
        }

        match self.accumulator {
            Accumulator::Enumerate(ref mut identities) => {
                for extracted in found {
                    if !identities.contains(&extracted.identity) {
                        debug!(identity = %extracted.identity, role = ?extracted.role, "new identity");
                        identities.insert(extracted.identity);
                    }
                }
            }
            Accumulator::Target {
                ref email,
                ref mut matches,
            } => {
                let first_new = matches.len();
                for extracted in found {
                    if extracted.identity.email != *email {
                        continue;
                    }

                    // author and committer can be the same person
                    if matches[first_new..]
                        .iter()
                        .any(|m| m.name == extracted.identity.name)
                    {
                        continue;
                    }

                    info!(
                        repository = %record.repository,
                        commit = %record.commit_reference,
                        role = ?extracted.role,
                        "target email found"
                    );
                    matches.push(TargetMatch {
                        repository: record.repository.clone(),
                        commit_reference: record.commit_reference.clone(),
                        name: extracted.identity.name,
                    });
                }
            }
        }
    }

    pub fn finish(self) -> ScanResult {
        match self.accumulator {
            Accumulator::Enumerate(identities) => ScanResult::Identities(identities),
            Accumulator::Target { matches, .. } => ScanResult::Matches(matches),
        }
    }
}

/// Drain `records` into the aggregator until the sequence ends or a fatal
/// error arrives.
pub fn scan<I>(mut aggregator: Aggregator<'_>, records: I) -> Result<ScanResult, ScanAborted>
where
    I: Iterator<Item = Result<PatchRecord, FetchError>>,
{
    for item in records {
        match item {
            Ok(record) => aggregator.fold(record),
            Err(cause) if cause.is_fatal() => {
                return Err(ScanAborted {
                    partial: aggregator.finish(),
                    cause,
                });
            }
            Err(cause) => warn!(error = %cause, "skipping record"),
        }
    }

    Ok(aggregator.finish())
}

/// Everything needed to run a scan, built once from the settings file.
pub struct Scanner {
    extractor: IdentityExtractor,
    settings: FetchSettings,
    policy: RetryPolicy,
}

impl Scanner {
    pub fn new(config: &Config) -> Result<Self, regex::Error> {
        Ok(Self {
            extractor: IdentityExtractor::new()?,
            settings: FetchSettings::from(config),
            policy: RetryPolicy::from_config(config),
        })
    }

    /// Traverse the account and aggregate according to the run's mode.
    pub fn run<T: Transport, C: Clock>(
        &self,
        run: &RunConfig,
        transport: T,
        clock: C,
    ) -> Result<ScanReport, ScanAborted> {
        let mode = run.mode();
        info!(account = run.account(), ?mode, "starting scan");

        let governor = Governor::new(transport, clock, self.policy);
        let mut fetcher = PatchFetcher::new(governor, run.account(), self.settings.clone());
        let aggregator = Aggregator::new(mode, &self.extractor);

        let result = scan(aggregator, fetcher.by_ref())?;

        info!(
            repositories = fetcher.repositories(),
            patches = fetcher.patches(),
            warnings = fetcher.warnings().len(),
            found = result.len(),
            "scan complete"
        );

        Ok(ScanReport {
            account: run.account().to_string(),
            target_email: run.target_email().map(str::to_string),
            result,
            repositories: fetcher.repositories(),
            patches: fetcher.patches(),
            warnings: fetcher.warnings().len(),
        })
    }
}

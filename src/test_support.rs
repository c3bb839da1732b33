//! In-memory GitHub and clock used by the unit tests.

use crate::github::{HttpResponse, MediaType, Transport, TransportError};
use crate::governor::Clock;
use chrono::{DateTime, Utc};
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;

pub const START_EPOCH: i64 = 1_700_000_000;

type Reply = Result<HttpResponse, TransportError>;

/// Replies are queued per URL. The last reply for a URL repeats forever;
/// unknown URLs answer 404.
#[derive(Default)]
pub struct ScriptedTransport {
    replies: RefCell<HashMap<String, VecDeque<Reply>>>,
    calls: RefCell<Vec<(String, MediaType)>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, url: &str, reply: Reply) {
        self.replies
            .borrow_mut()
            .entry(url.to_string())
            .or_default()
            .push_back(reply);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().iter().map(|(url, _)| url.clone()).collect()
    }

    pub fn media_types(&self) -> Vec<MediaType> {
        self.calls.borrow().iter().map(|(_, media)| *media).collect()
    }
}

impl Transport for ScriptedTransport {
    fn get(&self, url: &str, media: MediaType) -> Result<HttpResponse, TransportError> {
        self.calls.borrow_mut().push((url.to_string(), media));

        let mut replies = self.replies.borrow_mut();
        match replies.get_mut(url) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap(),
            Some(queue) => queue.front().cloned().unwrap(),
            None => Ok(HttpResponse::new(404, "Not Found")),
        }
    }
}

/// Starts at [`START_EPOCH`]; sleeping advances time instead of blocking.
pub struct FakeClock {
    elapsed: RefCell<Duration>,
    sleeps: RefCell<Vec<Duration>>,
}

impl FakeClock {
    pub fn new() -> Self {
        Self {
            elapsed: RefCell::new(Duration::ZERO),
            sleeps: RefCell::new(Vec::new()),
        }
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.borrow().clone()
    }
}

impl Clock for FakeClock {
    fn now(&self) -> DateTime<Utc> {
        let start = DateTime::from_timestamp(START_EPOCH, 0).unwrap();
        start + *self.elapsed.borrow()
    }

    fn sleep(&self, duration: Duration) {
        *self.elapsed.borrow_mut() += duration;
        self.sleeps.borrow_mut().push(duration);
    }
}

/// A `git format-patch` document as served by the patch media type
pub fn patch_text(author: &str, subject: &str) -> String {
    format!(
        "From 8f2c1e0a5b0d4c7e9f1a2b3c4d5e6f708192a3b4 Mon Sep 17 00:00:00 2001\n\
         From: {author}\n\
         Date: Tue, 3 Oct 2023 14:12:09 +0200\n\
         Subject: [PATCH] {subject}\n\
         \n\
         ---\n \
         README.md | 1 +\n \
         1 file changed, 1 insertion(+)\n"
    )
}

pub fn repos_json(full_names: &[&str]) -> String {
    let repos: Vec<_> = full_names
        .iter()
        .map(|full_name| {
            let name = full_name.rsplit('/').next().unwrap_or(*full_name);
            serde_json::json!({ "name": name, "full_name": full_name, "fork": false })
        })
        .collect();
    serde_json::Value::Array(repos).to_string()
}

pub fn commit_api_url(full_name: &str, sha: &str) -> String {
    format!("https://api.github.com/repos/{full_name}/commits/{sha}")
}

pub fn commit_html_url(full_name: &str, sha: &str) -> String {
    format!("https://github.com/{full_name}/commit/{sha}")
}

pub fn commits_json(full_name: &str, shas: &[&str]) -> String {
    let commits: Vec<_> = shas
        .iter()
        .map(|sha| {
            serde_json::json!({
                "sha": sha,
                "url": commit_api_url(full_name, sha),
                "html_url": commit_html_url(full_name, sha),
            })
        })
        .collect();
    serde_json::Value::Array(commits).to_string()
}

/// Script a full account listing: one page of repositories, one page of
/// commits per repository, and one patch per commit.
pub fn script_account(
    transport: &ScriptedTransport,
    account: &str,
    repos: &[(&str, &[(&str, &str)])],
) {
    let names: Vec<&str> = repos.iter().map(|(name, _)| *name).collect();
    transport.push(
        &crate::github::repos_url("https://api.github.com", account, 100),
        Ok(HttpResponse::new(200, repos_json(&names))),
    );

    for (full_name, commits) in repos {
        let shas: Vec<&str> = commits.iter().map(|(sha, _)| *sha).collect();
        transport.push(
            &crate::github::commits_url("https://api.github.com", full_name, 100),
            Ok(HttpResponse::new(200, commits_json(full_name, &shas))),
        );
        for (sha, author) in commits.iter() {
            transport.push(
                &commit_api_url(full_name, sha),
                Ok(HttpResponse::new(200, patch_text(author, "Update README"))),
            );
        }
    }
}

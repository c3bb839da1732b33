//! GitHub REST API boundary.
//!
//! The core only ever talks to GitHub through [`Transport`], which performs a
//! single authenticated GET and hands back status, headers and body. The
//! governor decides what a response means; this module just moves bytes.

use anyhow::{Context, Result};
use regex::Regex;
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::LazyLock;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Representation requested from the API
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaType {
    /// `application/vnd.github+json`
    Json,
    /// `application/vnd.github.patch`
    Patch,
}

impl MediaType {
    fn accept(self) -> &'static str {
        match self {
            MediaType::Json => "application/vnd.github+json",
            MediaType::Patch => "application/vnd.github.patch",
        }
    }
}

/// A request that never produced an HTTP response (timeout, connection reset, ...)
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("transport error: {0}")]
pub struct TransportError(pub String);

/// An HTTP response reduced to what the governor and fetcher look at.
#[derive(Debug, Clone, Default)]
pub struct HttpResponse {
    pub status: u16,
    /// Header names are lowercase
    pub headers: HashMap<String, String>,
    pub body: String,
}

/// Quota metadata attached to every GitHub API response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimit {
    pub remaining: u64,
    /// Epoch seconds at which the quota window resets
    pub reset: i64,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body: body.into(),
        }
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// `x-ratelimit-remaining` / `x-ratelimit-reset`, when both are present
    pub fn rate_limit(&self) -> Option<RateLimit> {
        let remaining = self.header("x-ratelimit-remaining")?.trim().parse().ok()?;
        let reset = self.header("x-ratelimit-reset")?.trim().parse().ok()?;
        Some(RateLimit { remaining, reset })
    }

    /// `retry-after` in seconds (secondary rate limits)
    pub fn retry_after(&self) -> Option<Duration> {
        self.header("retry-after")?
            .trim()
            .parse()
            .ok()
            .map(Duration::from_secs)
    }

    /// Continuation URL from the `Link` header
    pub fn next_page(&self) -> Option<String> {
        parse_next_link(self.header("link")?)
    }
}

static NEXT_LINK: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r#"<([^>]+)>\s*;\s*rel="next""#).ok());

/// Extract the `rel="next"` target from a `Link` header
pub fn parse_next_link(link: &str) -> Option<String> {
    let pattern = NEXT_LINK.as_ref()?;

    link.split(',')
        .find_map(|part| pattern.captures(part.trim()))
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str().to_string())
}

/// The capability the core consumes: one authenticated GET.
pub trait Transport {
    fn get(&self, url: &str, media: MediaType) -> Result<HttpResponse, TransportError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn get(&self, url: &str, media: MediaType) -> Result<HttpResponse, TransportError> {
        (**self).get(url, media)
    }
}

/// Blocking reqwest client for the GitHub REST API.
pub struct GitHubTransport {
    client: Client,
}

impl GitHubTransport {
    pub fn new(credential: &str, timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", credential))
            .context("API token is not a valid header value")?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
        headers.insert(USER_AGENT, HeaderValue::from_static("patchfinder"));
        headers.insert(
            "X-GitHub-Api-Version",
            HeaderValue::from_static("2022-11-28"),
        );

        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self { client })
    }
}

impl Transport for GitHubTransport {
    fn get(&self, url: &str, media: MediaType) -> Result<HttpResponse, TransportError> {
        debug!(url, ?media, "GET");
        let response = self
            .client
            .get(url)
            .header(ACCEPT, media.accept())
            .send()
            .map_err(|e| TransportError(e.to_string()))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response
            .text()
            .map_err(|e| TransportError(e.to_string()))?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

/// Entry of `GET /users/{account}/repos`
#[derive(Debug, Clone, Deserialize)]
pub struct RepoSummary {
    pub name: String,
    pub full_name: String,
    #[serde(default)]
    pub fork: bool,
}

/// Entry of `GET /repos/{owner}/{repo}/commits`
#[derive(Debug, Clone, Deserialize)]
pub struct CommitSummary {
    pub sha: String,
    /// API URL of the commit; fetched with the patch media type
    pub url: String,
    #[serde(default)]
    pub html_url: Option<String>,
}

impl CommitSummary {
    /// What users see for this commit
    pub fn reference(&self) -> String {
        self.html_url.clone().unwrap_or_else(|| self.sha.clone())
    }
}

pub fn repos_url(api_url: &str, account: &str, per_page: u32) -> String {
    format!(
        "{}/users/{}/repos?per_page={}",
        api_url.trim_end_matches('/'),
        account,
        per_page
    )
}

pub fn commits_url(api_url: &str, full_name: &str, per_page: u32) -> String {
    format!(
        "{}/repos/{}/commits?per_page={}",
        api_url.trim_end_matches('/'),
        full_name,
        per_page
    )
}

use crate::error::{ManagerError, Result};
use crate::fetcher::Transport;
use crate::types::Branch;

use chrono::DateTime;
use log::{debug, info, warn};
use reqwest::blocking::Client;
use serde::Deserialize;
use std::time::Duration;

pub const GITHUB_API_BASE: &str = "https://api.github.com";
pub const GITHUB_REPO: &str = "CoreyCorza/scripting_nodes";

const USER_AGENT: &str = "SerpensDevManager/1.0";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// GitHub branches API response subset.
#[derive(Debug, Deserialize)]
struct GitHubBranch {
    name: String,
    commit: GitHubCommitRef,
}

#[derive(Debug, Deserialize)]
struct GitHubCommitRef {
    url: String,
}

/// GitHub commit detail response subset.
#[derive(Debug, Deserialize)]
struct GitHubCommitDetail {
    commit: GitHubCommitBody,
}

#[derive(Debug, Deserialize)]
struct GitHubCommitBody {
    committer: GitHubSignature,
}

#[derive(Debug, Deserialize)]
struct GitHubSignature {
    date: String,
}

/// Blocking reqwest client with the manager's user agent and timeout.
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self> {
        Self::with_user_agent(USER_AGENT)
    }

    /// Builds the client with `user_agent`; a rejected client setup is a `Fetch` error.
    pub fn with_user_agent(user_agent: &str) -> Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ManagerError::Fetch(format!("could not build HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    fn get(&self, url: &str) -> Result<String> {
        debug!("GET {}", url);
        let resp = self
            .client
            .get(url)
            .send()
            .map_err(|e| ManagerError::Network(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(ManagerError::Network(format!(
                "{} returned status {}",
                url,
                resp.status()
            )));
        }

        resp.text().map_err(|e| ManagerError::Fetch(e.to_string()))
    }
}

/// Lists the branches of the addon repository on GitHub.
pub struct GitHubBranches<T> {
    transport: T,
    api_base: String,
    repo: String,
}

impl<T: Transport> GitHubBranches<T> {
    pub fn new(transport: T) -> Self {
        Self::with_repo(transport, GITHUB_API_BASE, GITHUB_REPO)
    }

    pub fn with_repo(transport: T, api_base: &str, repo: &str) -> Self {
        Self {
            transport,
            api_base: api_base.trim_end_matches('/').to_string(),
            repo: repo.to_string(),
        }
    }

    fn branches_url(&self) -> String {
        format!("{}/repos/{}/branches", self.api_base, self.repo)
    }

    /// Returns every remote branch in API order, each with its head commit date.
    ///
    /// A failed commit lookup leaves that branch's date empty and does not
    /// affect the others.
    pub fn list(&self) -> Result<Vec<Branch>> {
        let url = self.branches_url();
        info!("GitHubBranches: querying {}", url);

        let body = self.transport.get(&url)?;
        let remote: Vec<GitHubBranch> =
            serde_json::from_str(&body).map_err(|e| ManagerError::Fetch(e.to_string()))?;

        info!("GitHubBranches: {} branch(es) found", remote.len());

        Ok(remote
            .into_iter()
            .map(|branch| {
                let last_commit = self.commit_date(&branch.commit.url);
                Branch {
                    name: branch.name,
                    last_commit,
                }
            })
            .collect())
    }

    fn commit_date(&self, commit_url: &str) -> Option<String> {
        let lookup = || -> Result<String> {
            let body = self.transport.get(commit_url)?;
            let detail: GitHubCommitDetail =
                serde_json::from_str(&body).map_err(|e| ManagerError::Fetch(e.to_string()))?;
            format_commit_date(&detail.commit.committer.date)
                .ok_or_else(|| ManagerError::Fetch(format!("unparseable date {}", detail.commit.committer.date)))
        };

        match lookup() {
            Ok(date) => Some(date),
            Err(e) => {
                warn!("GitHubBranches: commit lookup for {} failed: {}", commit_url, e);
                None
            }
        }
    }
}

/// Turns an ISO-8601 timestamp into a plain `YYYY-MM-DD` date.
fn format_commit_date(iso: &str) -> Option<String> {
    let normalized = match iso.strip_suffix('Z') {
        Some(rest) => format!("{}+00:00", rest),
        None => iso.to_string(),
    };
    DateTime::parse_from_rfc3339(&normalized)
        .ok()
        .map(|dt| dt.format("%Y-%m-%d").to_string())
}

//! GitHub REST API access with client-side rate limiting (§6
//! "external collaborators... GitHub API access and rate limiting").
//!
//! `RateLimit` is a collaborator concern the analysis core never sees
//! (§7): this module throttles proactively via `governor` and
//! surfaces a [`crate::error::Error::GitHub`] only on a hard failure.

use governor::{Quota, RateLimiter};
use reqwest::Client;
use serde::Deserialize;
use std::num::NonZeroU32;
use std::sync::Arc;

use crate::error::{Error, Result};

type DirectRateLimiter = RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

#[derive(Debug, Deserialize)]
pub struct ReactionCounts {
    #[serde(rename = "+1")]
    pub thumbs_up: u64,
    #[serde(rename = "-1")]
    pub thumbs_down: u64,
    pub confused: u64,
}

pub struct GitHubClient {
    http: Client,
    token: String,
    limiter: Arc<DirectRateLimiter>,
}

impl GitHubClient {
    /// `requests_per_hour` matches the token's actual quota (5000/hr for
    /// an authenticated user, lower for unauthenticated or secondary
    /// limits); the caller passes it in from configuration.
    pub fn new(token: String, requests_per_hour: NonZeroU32) -> Self {
        let quota = Quota::per_hour(requests_per_hour);
        Self {
            http: Client::new(),
            token,
            limiter: Arc::new(RateLimiter::direct(quota)),
        }
    }

    pub fn with_default_quota(token: String) -> Self {
        Self::new(token, NonZeroU32::new(5000).expect("5000 is nonzero"))
    }

    async fn throttle(&self) {
        self.limiter.until_ready().await;
    }

    pub async fn file_issue(&self, owner: &str, repo: &str, title: &str, body: &str) -> Result<u64> {
        self.throttle().await;
        let url = format!("https://api.github.com/repos/{owner}/{repo}/issues");
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.token)
            .header("User-Agent", "vet-bot")
            .json(&serde_json::json!({ "title": title, "body": body }))
            .send()
            .await
            .map_err(|e| Error::GitHub(e.to_string()))?;

        check_rate_limited(&response)?;
        if !response.status().is_success() {
            return Err(Error::GitHub(format!("filing issue: HTTP {}", response.status())));
        }
        #[derive(Deserialize)]
        struct CreatedIssue {
            number: u64,
        }
        let created: CreatedIssue = response.json().await.map_err(|e| Error::GitHub(e.to_string()))?;
        Ok(created.number)
    }

    pub async fn reactions(&self, owner: &str, repo: &str, issue_number: u64) -> Result<ReactionCounts> {
        self.throttle().await;
        let url = format!("https://api.github.com/repos/{owner}/{repo}/issues/{issue_number}");
        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.token)
            .header("User-Agent", "vet-bot")
            .send()
            .await
            .map_err(|e| Error::GitHub(e.to_string()))?;

        check_rate_limited(&response)?;
        #[derive(Deserialize)]
        struct IssueResponse {
            reactions: ReactionCounts,
        }
        let parsed: IssueResponse = response.json().await.map_err(|e| Error::GitHub(e.to_string()))?;
        Ok(parsed.reactions)
    }

    /// Bodies of every comment on an issue, oldest first, used to look for
    /// maintainer comments matching the label vocabulary
    /// (`confirmed`/`false-positive`/`wontfix`).
    pub async fn list_comments(&self, owner: &str, repo: &str, issue_number: u64) -> Result<Vec<String>> {
        self.throttle().await;
        let url = format!("https://api.github.com/repos/{owner}/{repo}/issues/{issue_number}/comments");
        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.token)
            .header("User-Agent", "vet-bot")
            .send()
            .await
            .map_err(|e| Error::GitHub(e.to_string()))?;

        check_rate_limited(&response)?;
        #[derive(Deserialize)]
        struct Comment {
            body: String,
        }
        let comments: Vec<Comment> = response.json().await.map_err(|e| Error::GitHub(e.to_string()))?;
        Ok(comments.into_iter().map(|c| c.body).collect())
    }

    pub async fn add_label(&self, owner: &str, repo: &str, issue_number: u64, label: &str) -> Result<()> {
        self.throttle().await;
        let url = format!("https://api.github.com/repos/{owner}/{repo}/issues/{issue_number}/labels");
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.token)
            .header("User-Agent", "vet-bot")
            .json(&serde_json::json!({ "labels": [label] }))
            .send()
            .await
            .map_err(|e| Error::GitHub(e.to_string()))?;
        check_rate_limited(&response)?;
        Ok(())
    }

    pub async fn close_issue(&self, owner: &str, repo: &str, issue_number: u64) -> Result<()> {
        self.throttle().await;
        let url = format!("https://api.github.com/repos/{owner}/{repo}/issues/{issue_number}");
        let response = self
            .http
            .patch(&url)
            .bearer_auth(&self.token)
            .header("User-Agent", "vet-bot")
            .json(&serde_json::json!({ "state": "closed" }))
            .send()
            .await
            .map_err(|e| Error::GitHub(e.to_string()))?;
        check_rate_limited(&response)?;
        Ok(())
    }
}

fn check_rate_limited(response: &reqwest::Response) -> Result<()> {
    let remaining = response
        .headers()
        .get("x-ratelimit-remaining")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok());
    if response.status() == reqwest::StatusCode::FORBIDDEN && remaining == Some(0) {
        return Err(Error::GitHub("GitHub rate limit exhausted".to_string()));
    }
    Ok(())
}

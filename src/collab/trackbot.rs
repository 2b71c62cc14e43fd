//! Reaction-tallying loop for the `track-bot` binary: periodically re-checks
//! every filed issue's reactions and maintainer comments, then labels or
//! closes it once the community or a maintainer has weighed in.

use std::time::Duration;

use crate::collab::github::GitHubClient;
use crate::error::Result;

/// Net thumbs-up minus thumbs-down at or above this confirms the finding;
/// at or below its negation marks it a false positive and closes it.
pub const CONFIRM_THRESHOLD: i64 = 3;
pub const FALSE_POSITIVE_THRESHOLD: i64 = -2;

/// Maintainer-comment label vocabulary: a comment whose body contains one
/// of these (case-insensitively) overrides the reaction tally. `Wontfix`
/// takes precedence, matching a maintainer's final word on a finding.
const LABEL_WONTFIX: &str = "wontfix";
const LABEL_FALSE_POSITIVE: &str = "false-positive";
const LABEL_CONFIRMED: &str = "confirmed";

/// Scans comments newest-first for the label vocabulary, so a later
/// maintainer comment overrides an earlier one.
fn maintainer_label(comments: &[String]) -> Option<&'static str> {
    comments.iter().rev().find_map(|body| {
        let lower = body.to_lowercase();
        if lower.contains(LABEL_WONTFIX) {
            Some(LABEL_WONTFIX)
        } else if lower.contains(LABEL_FALSE_POSITIVE) {
            Some(LABEL_FALSE_POSITIVE)
        } else if lower.contains(LABEL_CONFIRMED) {
            Some(LABEL_CONFIRMED)
        } else {
            None
        }
    })
}

pub struct TrackBotConfig {
    pub poll_interval: Duration,
}

impl Default for TrackBotConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(3600),
        }
    }
}

/// Re-tally every open issue once and apply the resulting label/close
/// action. A maintainer comment matching the label vocabulary overrides the
/// reaction tally; otherwise the reaction thresholds decide. Returns the
/// number of issues acted on.
pub async fn sweep_once(github: &GitHubClient, issues: &[(String, String, i64)]) -> Result<usize> {
    let mut acted = 0;
    for (owner, repo, issue_number) in issues {
        let issue_number = *issue_number as u64;
        let reactions = match github.reactions(owner, repo, issue_number).await {
            Ok(r) => r,
            Err(e) => {
                #[cfg(feature = "telemetry")]
                tracing::warn!(%owner, %repo, issue_number, error = %e, "failed to fetch reactions");
                #[cfg(not(feature = "telemetry"))]
                let _ = &e;
                continue;
            }
        };
        let comments = match github.list_comments(owner, repo, issue_number).await {
            Ok(c) => c,
            Err(e) => {
                #[cfg(feature = "telemetry")]
                tracing::warn!(%owner, %repo, issue_number, error = %e, "failed to fetch comments");
                #[cfg(not(feature = "telemetry"))]
                let _ = &e;
                Vec::new()
            }
        };
        let net = reactions.thumbs_up as i64 - reactions.thumbs_down as i64 - reactions.confused as i64;

        match maintainer_label(&comments) {
            Some(LABEL_WONTFIX) => {
                github.add_label(owner, repo, issue_number, LABEL_WONTFIX).await?;
                github.close_issue(owner, repo, issue_number).await?;
                acted += 1;
            }
            Some(LABEL_FALSE_POSITIVE) => {
                github.add_label(owner, repo, issue_number, LABEL_FALSE_POSITIVE).await?;
                github.close_issue(owner, repo, issue_number).await?;
                acted += 1;
            }
            Some(LABEL_CONFIRMED) => {
                github.add_label(owner, repo, issue_number, LABEL_CONFIRMED).await?;
                acted += 1;
            }
            Some(_) | None if net >= CONFIRM_THRESHOLD => {
                github.add_label(owner, repo, issue_number, LABEL_CONFIRMED).await?;
                acted += 1;
            }
            Some(_) | None if net <= FALSE_POSITIVE_THRESHOLD => {
                github.add_label(owner, repo, issue_number, LABEL_FALSE_POSITIVE).await?;
                github.close_issue(owner, repo, issue_number).await?;
                acted += 1;
            }
            Some(_) | None => {}
        }
    }
    Ok(acted)
}

/// Poll forever at `config.poll_interval`, sweeping every tracked issue each
/// tick. Intended to run as the body of the `track-bot` binary's main loop.
pub async fn run(store: &crate::collab::store::Store, github: &GitHubClient, config: TrackBotConfig) -> Result<()> {
    let mut ticker = tokio::time::interval(config.poll_interval);
    loop {
        ticker.tick().await;
        let issues = store.all_open_issues()?;
        let result = crate::telemetry::instrument_tick(issues.len(), sweep_once(github, &issues)).await;
        if let Err(e) = result {
            #[cfg(feature = "telemetry")]
            tracing::warn!(error = %e, "reaction sweep failed");
            #[cfg(not(feature = "telemetry"))]
            let _ = &e;
        }
    }
}

//! Repository tarball fetch and extraction (§6 "external
//! collaborators... repository sampling and tarball fetch").
//!
//! Scoped acquisition per §9: the extracted tree lives under a
//! `tempfile::TempDir` whose `Drop` guarantees cleanup on every exit path.

use flate2::read::GzDecoder;
use reqwest::Client;
use tar::Archive;
use tempfile::TempDir;

use crate::error::{Error, Result};

pub struct FetchedRepo {
    pub root: TempDir,
    pub root_commit: String,
}

/// Download and unpack the GitHub codeload tarball for `owner/repo`'s
/// default branch.
pub async fn fetch_tarball(client: &Client, owner: &str, repo: &str, token: &str) -> Result<FetchedRepo> {
    let url = format!("https://api.github.com/repos/{owner}/{repo}/tarball");
    let response = client
        .get(&url)
        .bearer_auth(token)
        .header("User-Agent", "vet-bot")
        .send()
        .await
        .map_err(|e| Error::fetch(owner, repo, e.to_string()))?;

    if !response.status().is_success() {
        return Err(Error::fetch(owner, repo, format!("HTTP {}", response.status())));
    }

    let root_commit = commit_from_content_disposition(
        response
            .headers()
            .get(reqwest::header::CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok()),
    )
    .unwrap_or_else(|| "unknown".to_string());

    let bytes = response
        .bytes()
        .await
        .map_err(|e| Error::fetch(owner, repo, format!("reading body: {e}")))?;

    let dir = TempDir::new()?;
    let decoder = GzDecoder::new(&bytes[..]);
    let mut archive = Archive::new(decoder);
    archive
        .unpack(dir.path())
        .map_err(|e| Error::fetch(owner, repo, format!("unpacking tarball: {e}")))?;

    Ok(FetchedRepo { root: dir, root_commit })
}

/// GitHub's tarball `Content-Disposition` names the file
/// `<owner>-<repo>-<short-sha>.tar.gz`; extract the short SHA.
fn commit_from_content_disposition(header: Option<&str>) -> Option<String> {
    let header = header?;
    let filename = header.split("filename=").nth(1)?.trim_matches('"');
    let stem = filename.strip_suffix(".tar.gz")?;
    stem.rsplit('-').next().map(str::to_string)
}

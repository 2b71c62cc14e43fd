//! Non-secret configuration file plus accept-list loading.
//!
//! Search-up `find_config_file`/`load_config_file` pattern, analogous to
//! `move-clippy.toml`, renamed here to `vetbot.toml` and carrying the
//! settings a complete pipeline needs beyond the accept-list: worker pool
//! size and the default output format.

use crate::analysis::acceptlist::AcceptList;
use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE_NAME: &str = "vetbot.toml";

#[derive(Debug, Default, Deserialize)]
pub struct VetbotConfig {
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Deserialize)]
pub struct PipelineConfig {
    /// Bounded worker pool size for per-package parallelism (§5
    /// "Parallelism lives at the package granularity").
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
        }
    }
}

fn default_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

pub fn find_config_file(start_dir: &Path) -> Option<PathBuf> {
    let mut cur = Some(start_dir);
    while let Some(dir) = cur {
        let candidate = dir.join(DEFAULT_CONFIG_FILE_NAME);
        if candidate.is_file() {
            return Some(candidate);
        }
        cur = dir.parent();
    }
    None
}

pub fn load_config_file(path: &Path) -> Result<VetbotConfig> {
    let raw = std::fs::read_to_string(path)?;
    let cfg: VetbotConfig = toml::from_str(&raw)
        .map_err(|e| Error::config(format!("{}: {e}", path.display())))?;
    Ok(cfg)
}

pub fn load_config(explicit_path: Option<&Path>, start_dir: &Path) -> Result<VetbotConfig> {
    if let Some(p) = explicit_path {
        return load_config_file(p);
    }
    match find_config_file(start_dir) {
        Some(p) => load_config_file(&p),
        None => Ok(VetbotConfig::default()),
    }
}

/// Load the accept-list named by `--accept`. §6 treats the
/// accept-list as required operator input to the range-loop checker; a
/// missing or malformed file is a fatal `ConfigError` (§7).
pub fn load_accept_list(path: &Path) -> Result<AcceptList> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| Error::config(format!("reading accept-list {}: {e}", path.display())))?;
    AcceptList::parse(&raw)
}

/// Resolve the GitHub token from `--token` or the `GITHUB_TOKEN`
/// environment variable. Never logged (§7 ConfigError: "missing
/// required option... fatal at startup").
pub fn resolve_token(flag: Option<&str>) -> Result<String> {
    if let Some(t) = flag {
        return Ok(t.to_string());
    }
    std::env::var("GITHUB_TOKEN")
        .map_err(|_| Error::config("no GitHub token: pass --token or set GITHUB_TOKEN"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn defaults_when_no_config_file_present() {
        let dir = tempdir().unwrap();
        let cfg = load_config(None, dir.path()).unwrap();
        assert!(cfg.pipeline.concurrency >= 1);
    }

    #[test]
    fn loads_explicit_config_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("vetbot.toml");
        std::fs::write(&path, "[pipeline]\nconcurrency = 3\n").unwrap();
        let cfg = load_config(Some(&path), dir.path()).unwrap();
        assert_eq!(cfg.pipeline.concurrency, 3);
    }

    #[test]
    fn token_from_flag_wins_over_env() {
        assert_eq!(resolve_token(Some("abc")).unwrap(), "abc");
    }
}

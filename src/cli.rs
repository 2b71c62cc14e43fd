//! CLI surface for the `vet-bot` binary (§6 "CLI surface of the
//! enclosing program").

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// VetBot CLI options.
#[derive(Debug, Parser)]
#[command(
    name = "vet-bot",
    version,
    about = "Scan Go repositories for range-loop address-of hazards"
)]
pub struct Args {
    /// GitHub API token. Falls back to the `GITHUB_TOKEN` environment
    /// variable when absent.
    #[arg(long)]
    pub token: Option<String>,

    /// Path to the SQLite database tracking repository lifecycle state,
    /// findings, and filed issues.
    #[arg(long, default_value = "vetbot.db")]
    pub db: PathBuf,

    /// Analyze a single `owner/name` repository instead of sampling the
    /// queue.
    #[arg(long, value_name = "owner/name")]
    pub repo: Option<String>,

    /// Analyze a single `owner/name` repository and print diagnostics
    /// without touching persistence or filing issues.
    #[arg(long, value_name = "owner/name")]
    pub read_single: Option<String>,

    /// Path to the accept-list document (§6).
    #[arg(long, value_name = "FILE")]
    pub accept: PathBuf,

    /// Path to a `vetbot.toml` config file. If omitted, vetbot searches
    /// parent directories of the current working directory.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Bounded worker-pool size for per-package parallelism. Overrides the
    /// config file when set.
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Collect and print diagnostics without filing GitHub issues or
    /// writing to the findings store.
    #[arg(long)]
    pub dry_run: bool,

    /// Diagnostic output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Pretty)]
    pub format: OutputFormat,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    Pretty,
    Json,
}

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use vetbot::collab::github::GitHubClient;
use vetbot::collab::store::Store;
use vetbot::collab::trackbot::{run, TrackBotConfig};
use vetbot::config;

/// TrackBot CLI options: it shares the findings/issues store with `vet-bot`
/// but owns no analysis configuration of its own.
#[derive(Debug, Parser)]
#[command(name = "track-bot", version, about = "Tally reactions on filed vet-bot issues and label/close accordingly")]
struct Args {
    #[arg(long)]
    token: Option<String>,

    #[arg(long, default_value = "vetbot.db")]
    db: PathBuf,

    /// Seconds between reaction sweeps.
    #[arg(long, default_value_t = 3600)]
    poll_seconds: u64,
}

fn main() -> ExitCode {
    vetbot::telemetry::init_tracing();
    match run_main() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{err:#}");
            ExitCode::from(2)
        }
    }
}

fn run_main() -> anyhow::Result<ExitCode> {
    let args = Args::parse();
    let token = config::resolve_token(args.token.as_deref())?;
    let store = Store::open(&args.db)?;
    let github = GitHubClient::with_default_quota(token);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()?;

    runtime.block_on(run(
        &store,
        &github,
        TrackBotConfig {
            poll_interval: Duration::from_secs(args.poll_seconds),
        },
    ))?;

    Ok(ExitCode::SUCCESS)
}

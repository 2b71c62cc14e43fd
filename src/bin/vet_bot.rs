use std::fs;
use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use vetbot::analysis::pipeline::SourceFile;
use vetbot::cli::{Args, OutputFormat};
use vetbot::collab::fetch::fetch_tarball;
use vetbot::collab::github::GitHubClient;
use vetbot::collab::reporter::report_package;
use vetbot::collab::store::Store;
use vetbot::config;
use vetbot::Pipeline;

fn main() -> ExitCode {
    vetbot::telemetry::init_tracing();
    match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{err:#}");
            ExitCode::from(2)
        }
    }
}

fn run() -> anyhow::Result<ExitCode> {
    let args = Args::parse();
    let token = config::resolve_token(args.token.as_deref())?;
    let accept = config::load_accept_list(&args.accept)?;
    let cfg = config::load_config(args.config.as_deref(), &std::env::current_dir()?)?;
    let concurrency = args.concurrency.unwrap_or(cfg.pipeline.concurrency);

    let pipeline = Pipeline::builder().accept_list(accept).build();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(concurrency.max(1))
        .enable_all()
        .build()?;

    if let Some(target) = args.read_single.as_deref() {
        return runtime.block_on(read_single(&pipeline, &token, target, args.format));
    }

    let store = Store::open(&args.db)?;
    let targets = match args.repo.as_deref() {
        Some(single) => vec![single.to_string()],
        None => pending_repos(&store)?,
    };

    runtime.block_on(sample_queue(&pipeline, &store, &token, &targets, args.dry_run))
}

async fn read_single(
    pipeline: &Pipeline,
    token: &str,
    target: &str,
    format: OutputFormat,
) -> anyhow::Result<ExitCode> {
    let (owner, repo) = split_owner_repo(target)?;
    let client = reqwest::Client::new();
    let fetched = fetch_tarball(&client, owner, repo, token).await?;
    let files = go_source_files(fetched.root.path())?;
    let diagnostics = pipeline.analyze_package(&files)?;

    match format {
        OutputFormat::Pretty => {
            for diag in &diagnostics {
                println!(
                    "{}:{} range over `{}`: {} related site(s)",
                    diag.file.as_deref().unwrap_or("<unknown>"),
                    diag.range_span.start.row,
                    diag.loop_var,
                    diag.related.len()
                );
            }
        }
        OutputFormat::Json => {
            let rows: Vec<_> = diagnostics
                .iter()
                .map(|d| {
                    serde_json::json!({
                        "file": d.file,
                        "line": d.range_span.start.row,
                        "loop_var": d.loop_var,
                        "related": d.related.len(),
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }
    }
    Ok(ExitCode::SUCCESS)
}

async fn sample_queue(
    pipeline: &Pipeline,
    store: &Store,
    token: &str,
    targets: &[String],
    dry_run: bool,
) -> anyhow::Result<ExitCode> {
    let client = reqwest::Client::new();
    let github = GitHubClient::with_default_quota(token.to_string());

    for target in targets {
        let (owner, repo) = split_owner_repo(target)?;
        let outcome = vetbot::telemetry::instrument_repo(
            owner,
            repo,
            visit_one(pipeline, store, &client, &github, token, owner, repo, dry_run),
        )
        .await;
        match outcome {
            Ok(()) => {
                store.mark_visit_succeeded(owner, repo)?;
            }
            Err(e) => {
                #[cfg(feature = "telemetry")]
                tracing::warn!(%owner, %repo, error = %e, "repository visit failed");
                #[cfg(not(feature = "telemetry"))]
                let _ = &e;
                store.mark_visit_failed(owner, repo)?;
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

async fn visit_one(
    pipeline: &Pipeline,
    store: &Store,
    client: &reqwest::Client,
    github: &GitHubClient,
    token: &str,
    owner: &str,
    repo: &str,
    dry_run: bool,
) -> anyhow::Result<()> {
    let fetched = fetch_tarball(client, owner, repo, token).await?;
    let files = go_source_files(fetched.root.path())?;
    let diagnostics = pipeline.analyze_package(&files)?;

    if dry_run {
        for diag in &diagnostics {
            println!("{owner}/{repo}: {} ({} sites)", diag.loop_var, diag.related.len());
        }
        return Ok(());
    }

    let sources = files
        .into_iter()
        .map(|f| (f.name, f.source))
        .collect::<std::collections::HashMap<_, _>>();

    report_package(store, github, owner, repo, &fetched.root_commit, &sources, &diagnostics).await?;
    Ok(())
}

/// Repositories due for a visit: those in `Fresh` state. A repository that
/// failed once is left `Fresh` for a single retry before it is `Errored`.
fn pending_repos(store: &Store) -> anyhow::Result<Vec<String>> {
    Ok(store
        .fresh_repos()?
        .into_iter()
        .map(|(owner, repo)| format!("{owner}/{repo}"))
        .collect())
}

fn split_owner_repo(spec: &str) -> anyhow::Result<(&str, &str)> {
    spec.split_once('/')
        .ok_or_else(|| anyhow::anyhow!("expected owner/name, got `{spec}`"))
}

fn go_source_files(root: &Path) -> anyhow::Result<Vec<SourceFile>> {
    let mut files = Vec::new();
    for entry in walkdir::WalkDir::new(root).into_iter().filter_map(Result::ok) {
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == "go") && !path.to_string_lossy().ends_with("_test.go") {
            let source = fs::read_to_string(path)?;
            let name = path
                .strip_prefix(root)
                .unwrap_or(path)
                .to_string_lossy()
                .into_owned();
            files.push(SourceFile { name, source });
        }
    }
    Ok(files)
}

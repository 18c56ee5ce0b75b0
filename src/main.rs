use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use forksync::{
    config, report, resolve_token, run_bulk_operation, BulkOperation, GitHubClient, SessionStore,
    SyncPlanner, SyncRunner,
};

#[derive(Parser)]
#[command(name = "forksync")]
#[command(about = "Create pull requests to sync forks with their upstream repositories")]
#[command(version)]
struct Cli {
    /// The file with the repositories information
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// GitHub token with `public_repo` access, or a path to a file containing it
    #[arg(short, long)]
    token: Option<String>,

    /// The maximum count of repositories to process per run (0 = unlimited)
    #[arg(short = 'm', long, default_value_t = 0)]
    maximum_repositories: usize,

    /// Stop gracefully on Ctrl-C, after the in-flight repository completes
    #[arg(short = 'c', long)]
    cancel_operation: bool,

    /// Compute and report decisions without opening pull requests
    #[arg(short = 'd', long)]
    dry_run: bool,

    /// Report which repositories currently have an open sync pull request
    #[arg(short = 's', long)]
    synced_repositories: bool,

    /// Enable the issue tracker on all of your repositories
    #[arg(long)]
    enable_issues: bool,

    /// Star all of your repositories
    #[arg(long)]
    add_stars: bool,

    /// Watch all of your repositories
    #[arg(long)]
    watch_all: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose)?;
    info!("Starting forksync v{}", env!("CARGO_PKG_VERSION"));

    let bulk_operations = requested_bulk_operations(&cli);
    if !bulk_operations.is_empty() {
        return cmd_bulk(&cli, &bulk_operations).await;
    }

    let entries = load_entries(&cli)?;

    if cli.synced_repositories {
        cmd_synced_report(&cli, &entries).await
    } else {
        cmd_sync(&cli, &entries).await
    }
}

/// Initialize logging based on verbosity level
fn init_logging(verbose: bool) -> Result<()> {
    let filter = if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    Ok(())
}

fn requested_bulk_operations(cli: &Cli) -> Vec<BulkOperation> {
    let mut operations = Vec::new();
    if cli.enable_issues {
        operations.push(BulkOperation::EnableIssues);
    }
    if cli.add_stars {
        operations.push(BulkOperation::AddStars);
    }
    if cli.watch_all {
        operations.push(BulkOperation::WatchAll);
    }
    operations
}

/// Load and validate the repository list named by `-f/--file`
fn load_entries(cli: &Cli) -> Result<Vec<forksync::RepositoryEntry>> {
    let Some(file) = &cli.file else {
        bail!("Missing required command line argument `-f/--file`");
    };

    let expanded = shellexpand::full(&file.to_string_lossy())
        .context("Failed to expand repositories file path")?
        .into_owned();

    let entries = config::load_entries(&PathBuf::from(expanded))?;
    info!("Loaded {} repository entries", entries.len());
    Ok(entries)
}

async fn authenticate(cli: &Cli) -> Result<GitHubClient> {
    let token = resolve_token(cli.token.as_deref())?;
    let client = GitHubClient::new(token).await?;
    Ok(client)
}

/// Synchronize the configured forks by opening pull requests
async fn cmd_sync(cli: &Cli, entries: &[forksync::RepositoryEntry]) -> Result<()> {
    let client = Arc::new(authenticate(cli).await?);

    let cancel_flag = Arc::new(AtomicBool::new(false));
    if cli.cancel_operation {
        let flag = cancel_flag.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Interrupt received, finishing the in-flight repository");
                flag.store(true, Ordering::SeqCst);
            }
        });
    }

    if cli.dry_run {
        println!("🔍 Dry run mode: no pull request will be opened");
    }

    let planner = SyncPlanner::new(client, cli.dry_run);
    let session = SessionStore::open_default()?;
    let runner = SyncRunner::new(planner, session, cli.maximum_repositories, cancel_flag);

    let summary = runner.run(entries).await?;

    summary.report.print();

    println!("\n🎉 Synchronization complete!");
    println!("   📊 Repositories processed: {}", summary.entries_processed);
    println!("   ✅ Pull requests created: {}", summary.report.created_count());
    println!(
        "   🔁 Already open: {}",
        summary.report.already_open_count()
    );
    println!("   💤 Up to date: {}", summary.report.up_to_date_count());
    if cli.dry_run {
        println!(
            "   🔍 Would create: {}",
            summary.report.would_create_count()
        );
    }
    println!("   ❌ Errors: {}", summary.report.error_count());

    if summary.cancelled {
        println!("\n🛑 Stopped on cancel request; rerun to resume where this run left off");
    }

    Ok(())
}

/// Report which repositories currently have an open sync pull request
async fn cmd_synced_report(cli: &Cli, entries: &[forksync::RepositoryEntry]) -> Result<()> {
    // This walk must see every repository, so stale partial progress from an
    // interrupted sync run is discarded first.
    SessionStore::open_default()?.reset()?;

    let client = authenticate(cli).await?;

    println!("🔍 Checking repositories for {}...", client.username());
    let statuses = report::synced_repositories(&client, entries).await?;

    println!("\nRepositories ({}):", statuses.len());
    for status in &statuses {
        if !status.tracked {
            println!("  📁 {} (not tracked)", status.full_name);
        } else if status.open_prs.is_empty() {
            println!("  ✅ {}: no open sync pull request", status.full_name);
        } else {
            for pr in &status.open_prs {
                println!(
                    "  🔄 {}: PR #{} ({} -> {})",
                    status.full_name, pr.number, pr.upstream_branch, pr.fork_branch
                );
            }
        }
    }

    Ok(())
}

/// Apply the requested bulk operations across all of the user's repositories
async fn cmd_bulk(cli: &Cli, operations: &[BulkOperation]) -> Result<()> {
    let client = authenticate(cli).await?;

    for operation in operations {
        let summary = run_bulk_operation(&client, *operation).await?;

        let icon = match operation {
            BulkOperation::EnableIssues => "🐛",
            BulkOperation::AddStars => "⭐",
            BulkOperation::WatchAll => "👀",
        };
        println!(
            "{} Applied `{:?}` to {} repositories ({} failed)",
            icon, operation, summary.applied, summary.failed
        );
    }

    Ok(())
}

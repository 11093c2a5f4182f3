//! reportcard - grade Python repositories
//!
//! Without a subcommand the current directory (or `--directory`) is graded
//! in place. `remote` grades a hosted repository and caches the report by
//! the remote head revision.
//!
//! ## Commands
//!
//! - `remote`: Grade a remote repository through the cache
//! - `cache show`: Print the stored report for a repository
//! - `cache evict`: Drop the stored report for a repository

mod format;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use reportcard_core::{CachedReport, Report};
use reportcard_pipeline::{open_store, AnalysisPipeline, ReportCard, Settings, StoreBackend};
use std::path::{Path, PathBuf};
use tracing::{debug, Level};

use crate::format::{format_record, format_report};

#[derive(Parser)]
#[command(name = "reportcard")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Grade Python repositories and cache the results", long_about = None)]
struct Cli {
    /// Show per-file findings and info-level logs
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    /// Output format for reports
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// TOML configuration file (default: $REPORTCARD_CONFIG)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(flatten)]
    overrides: Overrides,

    #[command(flatten)]
    batch: BatchArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

/// Settings overrides applied after the file and environment layers.
#[derive(Args, Debug, Default)]
struct Overrides {
    /// Report store backend (memory, fs, surreal)
    #[arg(long, global = true)]
    store: Option<StoreBackend>,

    /// Directory of the filesystem store
    #[arg(long, global = true)]
    store_path: Option<PathBuf>,

    /// Directory under which clones are created
    #[arg(long, global = true)]
    workspace_root: Option<PathBuf>,

    /// Clone timeout in seconds
    #[arg(long, global = true)]
    clone_timeout_secs: Option<u64>,

    /// Base URL replacing `<scheme>://<host>` for clones and revision lookups
    #[arg(long, global = true)]
    mirror_base: Option<String>,
}

impl Overrides {
    fn apply(self, settings: &mut Settings) {
        if let Some(backend) = self.store {
            settings.store.backend = backend;
        }
        if let Some(path) = self.store_path {
            settings.store.path = path;
        }
        if let Some(root) = self.workspace_root {
            settings.workspace.root = root;
        }
        if let Some(secs) = self.clone_timeout_secs {
            settings.workspace.clone_timeout_secs = secs;
        }
        if let Some(base) = self.mirror_base {
            settings.remote.mirror_base = Some(base);
        }
    }
}

#[derive(Args, Debug)]
struct BatchArgs {
    /// Directory to grade when no subcommand is given
    #[arg(short, long, default_value = ".")]
    directory: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Grade a remote repository, reusing the cached report when the head
    /// revision is unchanged
    Remote {
        /// Repository reference, e.g. github.com/owner/name
        reference: String,

        /// Re-grade even if the cached report is current
        #[arg(long)]
        refresh: bool,
    },

    /// Inspect or maintain the report cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// Print the stored report without contacting the remote
    Show {
        /// Repository reference
        reference: String,
    },
    /// Remove the stored report
    Evict {
        /// Repository reference
        reference: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::INFO } else { Level::WARN };
    reportcard_core::init_tracing(cli.json, level);

    let mut settings =
        Settings::load(cli.config.as_deref()).context("Failed to load configuration")?;
    cli.overrides.apply(&mut settings);
    debug!(
        backend = ?settings.store.backend,
        workspace_root = %settings.workspace.root.display(),
        "resolved settings"
    );

    let verbose = cli.verbose;
    let format = cli.format;
    match cli.command {
        None => cmd_batch(&settings, &cli.batch.directory, format, verbose).await,
        Some(Commands::Remote { reference, refresh }) => {
            cmd_remote(&settings, &reference, refresh, format, verbose).await
        }
        Some(Commands::Cache { action }) => match action {
            CacheAction::Show { reference } => {
                cmd_cache_show(&settings, &reference, format, verbose).await
            }
            CacheAction::Evict { reference } => cmd_cache_evict(&settings, &reference).await,
        },
    }
}

async fn service(settings: &Settings) -> Result<ReportCard> {
    let store = open_store(&settings.store)
        .await
        .context("Failed to open report store")?;
    Ok(ReportCard::from_settings(settings, store))
}

fn print_report(report: &Report, format: OutputFormat, verbose: bool) -> Result<()> {
    match format {
        OutputFormat::Text => println!("{}", format_report(report, verbose)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(report)?),
    }
    Ok(())
}

fn print_record(
    record: &CachedReport,
    report: &Report,
    cache_hit: bool,
    format: OutputFormat,
    verbose: bool,
) -> Result<()> {
    match format {
        OutputFormat::Text => println!("{}", format_record(record, report, cache_hit, verbose)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(record)?),
    }
    Ok(())
}

async fn cmd_batch(
    settings: &Settings,
    directory: &Path,
    format: OutputFormat,
    verbose: bool,
) -> Result<()> {
    if !directory.is_dir() {
        bail!("{} is not a directory", directory.display());
    }
    let pipeline = AnalysisPipeline::new(settings.analysis.clone());
    let analysis = pipeline
        .analyze_path(directory)
        .await
        .with_context(|| format!("Failed to analyze {}", directory.display()))?;
    print_report(&analysis.report, format, verbose)
}

async fn cmd_remote(
    settings: &Settings,
    reference: &str,
    refresh: bool,
    format: OutputFormat,
    verbose: bool,
) -> Result<()> {
    let card = service(settings).await?;
    let outcome = if refresh {
        card.refresh(reference).await
    } else {
        card.grade(reference).await
    };
    let outcome = match outcome {
        Ok(outcome) => outcome,
        Err(err) if err.is_inaccessible() => {
            bail!("Repository {reference} is not accessible: {err}")
        }
        Err(err) => return Err(err).with_context(|| format!("Failed to grade {reference}")),
    };
    print_record(
        &outcome.record,
        &outcome.report,
        outcome.cache_hit,
        format,
        verbose,
    )
}

async fn cmd_cache_show(
    settings: &Settings,
    reference: &str,
    format: OutputFormat,
    verbose: bool,
) -> Result<()> {
    let card = service(settings).await?;
    let Some(record) = card
        .cached(reference)
        .await
        .with_context(|| format!("Failed to read cache for {reference}"))?
    else {
        bail!("No cached report for {reference}");
    };
    let report = reportcard_core::CacheGateway::decode(&record)
        .with_context(|| format!("Cached report for {reference} is malformed"))?;
    print_record(&record, &report, true, format, verbose)
}

async fn cmd_cache_evict(settings: &Settings, reference: &str) -> Result<()> {
    let card = service(settings).await?;
    card.evict(reference)
        .await
        .with_context(|| format!("Failed to evict {reference}"))?;
    println!("Evicted {reference}");
    Ok(())
}

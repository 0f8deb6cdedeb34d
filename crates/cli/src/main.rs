use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use chunkdex_sync::{SyncConfig, SyncWatcher, Synchronizer};
use log::info;

mod jsonl;

use jsonl::JsonlSink;

#[derive(Parser)]
#[command(name = "chunkdex")]
#[command(about = "Incremental chunk indexing for embedding pipelines", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one full rescan of a directory tree
    Sync {
        /// Root directory to index
        root: PathBuf,

        #[command(flatten)]
        options: SyncOptions,
    },
    /// Watch a directory tree and sync on changes until interrupted
    Watch {
        /// Root directory to watch
        root: PathBuf,

        #[command(flatten)]
        options: SyncOptions,
    },
}

#[derive(Args)]
struct SyncOptions {
    /// Target chunk size in tokens
    #[arg(long, default_value_t = 500)]
    target_tokens: usize,

    /// Minimum tokens before a boundary cut is considered
    #[arg(long, default_value_t = 400)]
    min_tokens: usize,

    /// Hard upper bound on chunk tokens, overlap included
    #[arg(long, default_value_t = 600)]
    max_tokens: usize,

    /// Minimum overlap tokens between adjacent chunks
    #[arg(long, default_value_t = 25)]
    min_overlap: usize,

    /// Maximum overlap tokens per chunk
    #[arg(long, default_value_t = 100)]
    max_overlap: usize,

    /// Quiet window after the last change before a batch runs (ms)
    #[arg(long, default_value_t = 2_000)]
    debounce_ms: u64,

    /// Longest a trickle of changes can defer a batch (ms)
    #[arg(long, default_value_t = 10_000)]
    max_batch_wait_ms: u64,

    /// Glob of files to include (repeatable; default all)
    #[arg(long = "include")]
    include_patterns: Vec<String>,

    /// Glob of files to exclude (repeatable)
    #[arg(long = "exclude")]
    exclude_patterns: Vec<String>,

    /// Skip files larger than this many bytes
    #[arg(long, default_value_t = 1024 * 1024)]
    max_file_size: u64,

    /// Write document batches as JSON lines here instead of stdout
    #[arg(long, short)]
    output: Option<PathBuf>,
}

impl SyncOptions {
    fn into_config(self, root: PathBuf) -> SyncConfig {
        let mut config = SyncConfig::new(root);
        config.chunker.target_tokens = self.target_tokens;
        config.chunker.min_tokens = self.min_tokens;
        config.chunker.max_tokens = self.max_tokens;
        config.chunker.min_overlap = self.min_overlap;
        config.chunker.max_overlap = self.max_overlap;
        config.debounce_window_ms = self.debounce_ms;
        config.max_batch_wait_ms = self.max_batch_wait_ms;
        config.include_patterns = self.include_patterns;
        config.exclude_patterns = self.exclude_patterns;
        config.max_file_size_bytes = self.max_file_size;
        config
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp_secs()
        .init();

    match cli.command {
        Commands::Sync { root, options } => run_sync(root, options).await,
        Commands::Watch { root, options } => run_watch(root, options).await,
    }
}

async fn run_sync(root: PathBuf, options: SyncOptions) -> Result<()> {
    let output = options.output.clone();
    let config = options.into_config(root);
    let sink = Arc::new(JsonlSink::open(output.as_deref())?);
    let mut synchronizer =
        Synchronizer::new(config, sink).context("failed to initialize synchronizer")?;

    let stats = synchronizer
        .full_rescan()
        .await
        .context("full rescan failed")?;

    info!(
        "synced {} files, {} chunks, {} documents ({} removed, {} errors) in {} ms",
        stats.files,
        stats.chunks,
        stats.documents,
        stats.removed_documents,
        stats.errors,
        stats.time_ms
    );
    eprintln!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}

async fn run_watch(root: PathBuf, options: SyncOptions) -> Result<()> {
    let output = options.output.clone();
    let config = options.into_config(root);
    let sink = Arc::new(JsonlSink::open(output.as_deref())?);
    let synchronizer =
        Synchronizer::new(config, sink).context("failed to initialize synchronizer")?;

    let watcher = SyncWatcher::start(synchronizer).context("failed to start watcher")?;
    let mut updates = watcher.subscribe_updates();

    // Catch up before settling into event-driven mode.
    watcher.trigger("startup").await?;

    loop {
        tokio::select! {
            update = updates.recv() => {
                match update {
                    Ok(update) if update.success => {
                        if let Some(stats) = update.stats {
                            info!(
                                "cycle ({}) ok: {} files, {} documents, {} removed in {} ms",
                                update.reason,
                                stats.files,
                                stats.documents,
                                stats.removed_documents,
                                update.duration_ms
                            );
                        }
                    }
                    Ok(update) => {
                        log::warn!("cycle ({}) failed after {} ms", update.reason, update.duration_ms);
                    }
                    Err(_) => break,
                }
            }
            result = tokio::signal::ctrl_c() => {
                result.context("failed to listen for ctrl-c")?;
                info!("shutting down");
                watcher.shutdown().await;
                break;
            }
        }
    }
    Ok(())
}

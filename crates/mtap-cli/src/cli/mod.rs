//! CLI for the mtap media capture cache.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use mtap_core::config::{self, CaptureConfig};
use mtap_core::persist::FileStorage;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use commands::{run_clear, run_ingest, run_list, run_reconcile, run_stats, run_sweep};

/// Top-level CLI for mtap.
#[derive(Debug, Parser)]
#[command(name = "mtap")]
#[command(about = "mtap: capture media resources from recorded sessions into a per-tab cache", long_about = None)]
pub struct Cli {
    /// Directory holding the cache file (default: XDG runtime dir, else state dir).
    #[arg(long, global = true, value_name = "DIR")]
    pub store_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Replay a HAR file through the capture filter into the cache.
    Ingest {
        /// Path to the HAR file.
        har: String,

        /// Context that unattributed requests are filed under (default: first page).
        #[arg(long, value_name = "ID")]
        active: Option<i64>,

        /// Keep repeated URLs instead of dropping them.
        #[arg(long)]
        no_dedup: bool,
    },

    /// List cached resources.
    List {
        /// Only this context.
        #[arg(long, value_name = "ID")]
        context: Option<i64>,

        /// Print records as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show cache counters.
    Stats,

    /// Clear one context, or every context but one.
    Clear {
        /// Context to clear.
        #[arg(conflicts_with = "others")]
        context: Option<i64>,

        /// Clear every context except this one.
        #[arg(long, value_name = "KEEP")]
        others: Option<i64>,
    },

    /// Drop every context not in the given live set.
    Reconcile {
        /// Context ids that are still open.
        live: Vec<i64>,
    },

    /// Drop records older than the configured maximum age.
    Sweep {
        /// Override `cache.max_age_hours`.
        #[arg(long, value_name = "HOURS")]
        max_age_hours: Option<u64>,
    },
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);
        let storage = open_storage(cli.store_dir.as_deref())?;

        match cli.command {
            CliCommand::Ingest {
                har,
                active,
                no_dedup,
            } => run_ingest(cfg, storage, Path::new(&har), active, no_dedup).await?,
            CliCommand::List { context, json } => run_list(cfg, storage, context, json).await?,
            CliCommand::Stats => run_stats(cfg, storage).await?,
            CliCommand::Clear { context, others } => {
                run_clear(cfg, storage, context, others).await?
            }
            CliCommand::Reconcile { live } => run_reconcile(cfg, storage, &live).await?,
            CliCommand::Sweep { max_age_hours } => {
                run_sweep(cfg, storage, max_age_hours).await?
            }
        }

        Ok(())
    }
}

fn open_storage(dir: Option<&Path>) -> Result<Arc<FileStorage>> {
    let storage = match dir {
        Some(dir) => FileStorage::new(dir),
        None => FileStorage::open_default()?,
    };
    tracing::debug!("cache dir: {}", storage.dir().display());
    Ok(Arc::new(storage))
}

/// Service over `storage` with the stored cache loaded. The gate stays closed
/// until a command sets an active context.
async fn restored_service(
    cfg: CaptureConfig,
    storage: Arc<FileStorage>,
) -> mtap_core::CaptureService {
    let svc = mtap_core::CaptureService::builder(cfg.clone())
        .storage(storage)
        .build();
    svc.restore().await;
    svc.complete_sync_load(cfg);
    svc
}

#[cfg(test)]
mod tests;

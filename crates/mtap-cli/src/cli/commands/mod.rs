//! CLI command handlers, one file per command.

mod clear;
mod ingest;
mod list;
mod reconcile;
mod stats;
mod sweep;

pub use clear::run_clear;
pub use ingest::run_ingest;
pub use list::run_list;
pub use reconcile::run_reconcile;
pub use stats::run_stats;
pub use sweep::run_sweep;

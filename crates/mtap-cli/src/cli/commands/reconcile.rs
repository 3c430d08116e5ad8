//! `mtap reconcile [live ids...]`: evict contexts that are no longer open.

use anyhow::Result;
use mtap_core::config::CaptureConfig;
use mtap_core::persist::FileStorage;
use mtap_core::record::ContextId;
use std::collections::HashSet;
use std::sync::Arc;

use super::super::restored_service;

pub async fn run_reconcile(cfg: CaptureConfig, storage: Arc<FileStorage>, live: &[i64]) -> Result<()> {
    let svc = restored_service(cfg, storage).await;
    let live: HashSet<ContextId> = live.iter().copied().map(ContextId).collect();
    let removed = svc.reconcile(&live).await?;
    println!("Removed {removed} closed contexts.");
    Ok(())
}

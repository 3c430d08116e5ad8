//! `mtap sweep`: drop expired records.

use anyhow::Result;
use mtap_core::config::CaptureConfig;
use mtap_core::persist::FileStorage;
use std::sync::Arc;
use std::time::Duration;

use super::super::restored_service;

pub async fn run_sweep(
    cfg: CaptureConfig,
    storage: Arc<FileStorage>,
    max_age_hours: Option<u64>,
) -> Result<()> {
    let max_age = max_age_hours
        .map(|h| Duration::from_secs(h.saturating_mul(3600)))
        .unwrap_or_else(|| cfg.cache.max_age());
    let svc = restored_service(cfg, storage).await;
    let removed = svc.sweep_expired(max_age).await?;
    println!("Removed {removed} records older than {}h.", max_age.as_secs() / 3600);
    Ok(())
}

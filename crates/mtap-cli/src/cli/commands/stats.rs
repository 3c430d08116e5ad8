//! `mtap stats`: cache counters.

use anyhow::Result;
use mtap_core::config::CaptureConfig;
use mtap_core::persist::FileStorage;
use std::sync::Arc;

use super::super::restored_service;

pub async fn run_stats(cfg: CaptureConfig, storage: Arc<FileStorage>) -> Result<()> {
    let svc = restored_service(cfg, storage.clone()).await;
    let stats = svc.get_stats();
    println!("Cache file:   {}", storage.path_for(&svc.config().persist.storage_key).display());
    println!("Resources:    {}", stats.total_count);
    println!("Contexts:     {}", stats.context_count);
    println!("Dedup sets:   {}", stats.dedup_set_size);
    println!("Fingerprints: {}", stats.fingerprint_count);
    Ok(())
}

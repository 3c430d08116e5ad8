//! `mtap ingest <har>`: replay a HAR capture into the cache.

use anyhow::Result;
use mtap_core::config::CaptureConfig;
use mtap_core::har;
use mtap_core::persist::FileStorage;
use mtap_core::record::ContextId;
use mtap_core::CaptureService;
use std::path::Path;
use std::sync::Arc;

pub async fn run_ingest(
    mut cfg: CaptureConfig,
    storage: Arc<FileStorage>,
    path: &Path,
    active: Option<i64>,
    no_dedup: bool,
) -> Result<()> {
    if no_dedup {
        cfg.cache.check_duplicates = false;
    }
    let capture = har::load_har(path)?;
    let host = Arc::new(capture.host);
    let active = active
        .map(ContextId)
        .or_else(|| host.contexts().first().copied())
        .unwrap_or(ContextId(1));

    let svc = CaptureService::builder(cfg.clone())
        .storage(storage)
        .tabs(host.clone())
        .live_contexts(host.clone())
        .build();
    svc.restore().await;
    svc.complete_sync_load(cfg);
    svc.set_active_context(active);
    for context in host.contexts() {
        if let Some(url) = host.page(context).and_then(|page| page.url.as_deref()) {
            svc.context_navigated(context, url).await;
        }
    }

    let total = capture.observations.len();
    let mut admitted = 0usize;
    for obs in capture.observations {
        if svc.observe(obs).await {
            admitted += 1;
        }
    }
    // Pending debounce timers do not outlive the process.
    svc.flush().await?;

    println!("Observed {total} requests, captured {admitted} media resources.");
    for (context, records) in svc.get_all() {
        println!("  context {context}: {} resources", records.len());
    }
    Ok(())
}

//! Integration tests: admission, persistence scheduling and lifecycle through
//! the public `CaptureService` API.

mod common;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use mtap_core::config::CaptureConfig;
use mtap_core::persist::{FileStorage, MemoryStorage};
use mtap_core::record::ContextId;
use mtap_core::CaptureService;
use serde_json::json;
use tempfile::tempdir;

use common::{ready_service, video};

#[tokio::test(start_paused = true)]
async fn overflow_resets_the_context() {
    let mut cfg = CaptureConfig::default();
    cfg.cache.max_length = 5;
    cfg.cache.check_duplicates = false;
    let storage = Arc::new(MemoryStorage::new());
    let svc = ready_service(cfg, storage.clone(), ContextId(7)).await;

    for n in 0..5 {
        assert!(svc.admit(video(&format!("https://cdn/{n}.mp4"), 7)).await);
    }
    let urls: Vec<String> = svc
        .get_context(ContextId(7))
        .into_iter()
        .map(|r| r.url)
        .collect();
    assert_eq!(
        urls,
        (0..5).map(|n| format!("https://cdn/{n}.mp4")).collect::<Vec<_>>()
    );

    let writes = storage.write_count();
    assert!(!svc.admit(video("https://cdn/5.mp4", 7)).await);
    assert!(svc.get_context(ContextId(7)).is_empty());
    // The reset is persisted straight away.
    assert_eq!(storage.write_count(), writes + 1);
    assert_eq!(storage.peek("MediaData").unwrap()["contexts"]["7"], json!([]));
}

#[tokio::test(start_paused = true)]
async fn duplicate_urls_are_admitted_once() {
    let svc = ready_service(
        CaptureConfig::default(),
        Arc::new(MemoryStorage::new()),
        ContextId(1),
    )
    .await;
    assert!(svc.admit(video("https://cdn/a.mp4", 1)).await);
    assert!(!svc.admit(video("https://cdn/a.mp4", 1)).await);
    assert!(!svc.admit(video("https://cdn/a.mp4", 1)).await);
    assert_eq!(svc.get_context(ContextId(1)).len(), 1);
    // Same URL in another context is not a duplicate.
    assert!(svc.admit(video("https://cdn/a.mp4", 2)).await);
}

#[tokio::test(start_paused = true)]
async fn fingerprint_rollover_readmits() {
    let mut cfg = CaptureConfig::default();
    cfg.cache.cleanup_threshold = 3;
    let svc = ready_service(cfg, Arc::new(MemoryStorage::new()), ContextId(1)).await;
    for url in ["https://c/a.mp4", "https://c/b.mp4", "https://c/c.mp4"] {
        assert!(svc.admit(video(url, 1)).await);
    }
    // The set reached its cap and was cleared: "a" is accepted again.
    assert_eq!(svc.get_stats().fingerprint_count, 0);
    assert!(svc.admit(video("https://c/a.mp4", 1)).await);
}

#[tokio::test(start_paused = true)]
async fn admissions_wait_for_the_gate() {
    let svc = CaptureService::builder(CaptureConfig::default()).build();
    let mut waiting = Vec::new();
    for n in 0..3 {
        let svc = svc.clone();
        waiting.push(tokio::spawn(async move {
            svc.admit(video(&format!("https://cdn/{n}.mp4"), -1)).await
        }));
    }
    tokio::task::yield_now().await;
    assert_eq!(svc.get_stats().pending_admissions, 3);
    assert!(!svc.get_stats().ready);

    svc.restore().await;
    svc.complete_sync_load(CaptureConfig::default());
    assert_eq!(svc.get_stats().pending_admissions, 3);
    svc.set_active_context(ContextId(9));

    for handle in waiting {
        assert!(handle.await.unwrap());
    }
    let stats = svc.get_stats();
    assert!(stats.ready);
    assert_eq!(stats.pending_admissions, 0);
    let urls: Vec<String> = svc
        .get_context(ContextId(9))
        .into_iter()
        .map(|r| r.url)
        .collect();
    assert_eq!(urls, ["https://cdn/0.mp4", "https://cdn/1.mp4", "https://cdn/2.mp4"]);
}

#[tokio::test(start_paused = true)]
async fn saves_inside_hot_window_coalesce() {
    let storage = Arc::new(MemoryStorage::new());
    let svc = ready_service(CaptureConfig::default(), storage.clone(), ContextId(1)).await;
    svc.flush().await.unwrap();
    assert_eq!(storage.write_count(), 1);

    for ctx in 1..=50 {
        svc.request_save(ContextId(ctx)).await;
    }
    assert_eq!(storage.write_count(), 1);
    tokio::time::sleep(Duration::from_secs(3)).await;
    assert_eq!(storage.write_count(), 2);
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(storage.write_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn reconcile_drops_closed_contexts_and_persists_once() {
    let storage = Arc::new(MemoryStorage::new());
    let svc = ready_service(CaptureConfig::default(), storage.clone(), ContextId(1)).await;
    for ctx in [1, 2, 3] {
        svc.admit(video("https://cdn/v.mp4", ctx)).await;
    }
    svc.flush().await.unwrap();
    let writes = storage.write_count();

    let live: HashSet<ContextId> = [ContextId(1), ContextId(3)].into_iter().collect();
    assert_eq!(svc.reconcile(&live).await.unwrap(), 1);
    assert_eq!(storage.write_count(), writes + 1);
    assert_eq!(
        svc.get_all().keys().copied().collect::<Vec<_>>(),
        vec![ContextId(1), ContextId(3)]
    );
    assert_eq!(svc.get_context(ContextId(1)).len(), 1);
    assert_eq!(svc.get_context(ContextId(3)).len(), 1);

    // Nothing left to evict: no write.
    assert_eq!(svc.reconcile(&live).await.unwrap(), 0);
    assert_eq!(storage.write_count(), writes + 1);
}

#[tokio::test]
async fn cache_survives_restart_through_file_storage() {
    let dir = tempdir().unwrap();
    {
        let storage = Arc::new(FileStorage::new(dir.path()));
        let svc = ready_service(CaptureConfig::default(), storage, ContextId(3)).await;
        assert!(svc.admit(video("https://cdn/keep.mp4", 3)).await);
        svc.flush().await.unwrap();
    }

    let storage = Arc::new(FileStorage::new(dir.path()));
    let svc = CaptureService::builder(CaptureConfig::default())
        .storage(storage)
        .build();
    svc.restore().await;
    let records = svc.get_context(ContextId(3));
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].url, "https://cdn/keep.mp4");
    assert_eq!(records[0].extension.as_deref(), Some("mp4"));
}

#[tokio::test]
async fn unrestored_flush_writes_placeholder() {
    let storage = Arc::new(MemoryStorage::new());
    let svc = CaptureService::builder(CaptureConfig::default())
        .storage(storage.clone())
        .build();
    svc.flush().await.unwrap();
    assert_eq!(storage.peek("MediaData"), Some(json!({ "init": true })));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn gate_opened_from_a_plain_thread_drains_the_queue() {
    let storage = Arc::new(MemoryStorage::new());
    let svc = CaptureService::builder(CaptureConfig::default())
        .storage(storage.clone())
        .build();
    svc.restore().await;
    svc.complete_sync_load(CaptureConfig::default());

    let waiting = {
        let svc = svc.clone();
        tokio::spawn(async move { svc.admit(video("https://cdn/late.mp4", -1)).await })
    };
    while svc.get_stats().pending_admissions == 0 {
        tokio::task::yield_now().await;
    }

    // A host thread with no runtime of its own reports focus.
    let opener = svc.clone();
    std::thread::spawn(move || opener.set_active_context(ContextId(3)))
        .join()
        .unwrap();

    assert!(waiting.await.unwrap());
    let records = svc.get_context(ContextId(3));
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].url, "https://cdn/late.mp4");
    assert_eq!(storage.write_count(), 1);
}

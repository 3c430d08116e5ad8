//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::io::Write;
use std::sync::Arc;

use mtap_core::config::CaptureConfig;
use mtap_core::persist::Storage;
use mtap_core::record::{ContextId, ResourceRecord};
use mtap_core::CaptureService;
use tempfile::NamedTempFile;

/// Service over `storage`, restored and opened with `active` as the focused context.
pub async fn ready_service(
    cfg: CaptureConfig,
    storage: Arc<dyn Storage>,
    active: ContextId,
) -> CaptureService {
    let svc = CaptureService::builder(cfg).storage(storage).build();
    svc.restore().await;
    svc.complete_sync_load(svc.config());
    svc.set_active_context(active);
    svc
}

pub fn video(url: &str, ctx: i64) -> ResourceRecord {
    ResourceRecord::new(url, ContextId(ctx)).with_extension("mp4")
}

pub fn write_har(json: &str) -> NamedTempFile {
    let mut f = NamedTempFile::new().expect("temp file");
    f.write_all(json.as_bytes()).expect("write HAR");
    f.flush().expect("flush HAR");
    f
}

/// Two pages, a manifest, a segment list, a poster image and an orphan clip.
pub const SESSION_HAR: &str = r#"{
    "log": {
        "version": "1.2",
        "creator": { "name": "fixture", "version": "1" },
        "pages": [
            { "id": "page_1", "title": "Conference talk" },
            { "id": "page_2", "title": "Podcast" }
        ],
        "entries": [
            {
                "pageref": "page_1",
                "_resourceType": "document",
                "request": { "url": "https://talks.example.com/watch/42", "headers": [] },
                "response": { "status": 200, "headers": [ { "name": "Content-Type", "value": "text/html; charset=utf-8" } ] }
            },
            {
                "pageref": "page_1",
                "_resourceType": "xhr",
                "request": {
                    "url": "https://cdn.example.com/talk42/master.m3u8",
                    "headers": [
                        { "name": "Referer", "value": "https://talks.example.com/watch/42" },
                        { "name": "Cookie", "value": "sid=abc" }
                    ]
                },
                "response": {
                    "status": 200,
                    "headers": [ { "name": "Content-Type", "value": "application/vnd.apple.mpegurl" } ]
                }
            },
            {
                "pageref": "page_1",
                "_resourceType": "xhr",
                "request": { "url": "https://cdn.example.com/talk42/master.m3u8", "headers": [] },
                "response": { "status": 200, "headers": [] }
            },
            {
                "pageref": "page_1",
                "_resourceType": "image",
                "request": { "url": "https://cdn.example.com/talk42/poster.jpg", "headers": [] },
                "response": { "status": 200, "headers": [ { "name": "Content-Type", "value": "image/jpeg" } ] }
            },
            {
                "pageref": "page_2",
                "_resourceType": "media",
                "request": { "url": "https://audio.example.com/ep7", "headers": [] },
                "response": {
                    "status": 206,
                    "headers": [
                        { "name": "Content-Type", "value": "audio/mpeg" },
                        { "name": "Content-Range", "value": "bytes 0-1023/5242880" }
                    ]
                }
            },
            {
                "request": { "url": "https://cdn.example.com/loose/clip.mp4", "headers": [] },
                "response": { "status": 200, "headers": [ { "name": "Content-Length", "value": "2048" } ] }
            }
        ]
    }
}"#;

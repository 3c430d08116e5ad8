//! `mtap list`: print cached resources.

use anyhow::Result;
use mtap_core::config::CaptureConfig;
use mtap_core::host::badge_text;
use mtap_core::persist::FileStorage;
use mtap_core::record::{ContextId, ResourceRecord};
use std::collections::BTreeMap;
use std::sync::Arc;

use super::super::restored_service;

pub async fn run_list(
    cfg: CaptureConfig,
    storage: Arc<FileStorage>,
    context: Option<i64>,
    json: bool,
) -> Result<()> {
    let svc = restored_service(cfg, storage).await;
    let contexts: BTreeMap<ContextId, Vec<ResourceRecord>> = match context {
        Some(id) => {
            let id = ContextId(id);
            BTreeMap::from([(id, svc.get_context(id))])
        }
        None => svc.get_all(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&contexts)?);
        return Ok(());
    }
    if contexts.values().all(Vec::is_empty) {
        println!("No cached resources.");
        return Ok(());
    }
    for (id, records) in &contexts {
        println!("context {id} [{}]", badge_text(records.len()));
        for r in records {
            println!(
                "  {:<6} {:>10}  {}",
                r.extension.as_deref().unwrap_or("-"),
                format_size(r.size_bytes),
                r.url
            );
        }
    }
    Ok(())
}

fn format_size(size: Option<u64>) -> String {
    match size {
        None => "?".to_string(),
        Some(b) if b < 1024 => format!("{b} B"),
        Some(b) if b < 1024 * 1024 => format!("{:.1} KiB", b as f64 / 1024.0),
        Some(b) => format!("{:.1} MiB", b as f64 / (1024.0 * 1024.0)),
    }
}

#[cfg(test)]
mod tests {
    use super::format_size;

    #[test]
    fn sizes_are_humanized() {
        assert_eq!(format_size(None), "?");
        assert_eq!(format_size(Some(512)), "512 B");
        assert_eq!(format_size(Some(2048)), "2.0 KiB");
        assert_eq!(format_size(Some(5 * 1024 * 1024)), "5.0 MiB");
    }
}

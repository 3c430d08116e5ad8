//! `mtap clear <id>` / `mtap clear --others <keep>`.

use anyhow::{bail, Result};
use mtap_core::config::CaptureConfig;
use mtap_core::persist::FileStorage;
use mtap_core::record::ContextId;
use std::sync::Arc;

use super::super::restored_service;

pub async fn run_clear(
    cfg: CaptureConfig,
    storage: Arc<FileStorage>,
    context: Option<i64>,
    others: Option<i64>,
) -> Result<()> {
    let svc = restored_service(cfg, storage).await;
    match (context, others) {
        (Some(id), None) => {
            svc.clear_context(ContextId(id)).await?;
            println!("Cleared context {id}.");
        }
        (None, Some(keep)) => {
            let removed = svc.clear_others(ContextId(keep)).await?;
            println!("Cleared {removed} contexts, kept {keep}.");
        }
        _ => bail!("give a context id or --others <KEEP>"),
    }
    Ok(())
}

//! Per-context page block list.
//!
//! A context is flagged when it navigates to a page URL matching one of the
//! configured patterns. In [`BlockMode::Block`] flagged contexts capture
//! nothing; in [`BlockMode::Allow`] only flagged contexts capture.

use std::collections::HashSet;

use regex::Regex;

use crate::config::{BlockMode, FilterConfig};
use crate::record::ContextId;

#[derive(Debug, Clone, Default)]
pub struct BlockList {
    patterns: Vec<Regex>,
    mode: BlockMode,
    flagged: HashSet<ContextId>,
}

impl BlockList {
    pub fn new(cfg: &FilterConfig) -> Self {
        let mut list = Self::default();
        list.reconfigure(cfg);
        list
    }

    /// Recompile patterns. Flags already set stay until the context navigates.
    pub fn reconfigure(&mut self, cfg: &FilterConfig) {
        self.mode = cfg.block_mode;
        self.patterns = cfg
            .block_urls
            .iter()
            .filter(|rule| rule.enabled)
            .filter_map(|rule| match Regex::new(&rule.pattern) {
                Ok(re) => Some(re),
                Err(e) => {
                    tracing::warn!(pattern = %rule.pattern, "ignoring invalid block pattern: {}", e);
                    None
                }
            })
            .collect();
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn matches(&self, url: &str) -> bool {
        self.patterns.iter().any(|re| re.is_match(url))
    }

    /// Re-evaluate `context` against its new page URL.
    pub fn navigated(&mut self, context: ContextId, url: &str) {
        if self.is_empty() || context.is_unknown() {
            return;
        }
        self.flagged.remove(&context);
        if self.matches(url) {
            tracing::debug!(context = %context, url, mode = ?self.mode, "page matched block list");
            self.flagged.insert(context);
        }
    }

    /// Whether records for `context` may be admitted. An empty list allows all.
    pub fn allows(&self, context: ContextId) -> bool {
        if self.is_empty() {
            return true;
        }
        let flagged = self.flagged.contains(&context);
        match self.mode {
            BlockMode::Block => !flagged,
            BlockMode::Allow => flagged,
        }
    }

    pub fn retain<F: FnMut(ContextId) -> bool>(&mut self, mut keep: F) {
        self.flagged.retain(|context| keep(*context));
    }

    pub fn flagged_count(&self) -> usize {
        self.flagged.len()
    }
}

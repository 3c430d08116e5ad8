//! Lookup tables built from the `[filter]` config section.

use std::collections::HashMap;

use crate::config::FilterConfig;

/// Opinion of a single rule table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleVerdict {
    Allow,
    Block,
    /// The table has no entry for this key.
    Unlisted,
}

#[derive(Debug, Clone, Copy)]
struct Rule {
    min_size_bytes: u64,
    enabled: bool,
}

impl Rule {
    fn judge(self, size: Option<u64>) -> RuleVerdict {
        if !self.enabled {
            return RuleVerdict::Block;
        }
        match size {
            Some(s) if self.min_size_bytes != 0 && s <= self.min_size_bytes => RuleVerdict::Block,
            _ => RuleVerdict::Allow,
        }
    }
}

/// Extension and MIME rule tables keyed by lowercase name.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    extensions: HashMap<String, Rule>,
    types: HashMap<String, Rule>,
}

impl RuleSet {
    pub fn from_config(cfg: &FilterConfig) -> Self {
        let extensions = cfg
            .extensions
            .iter()
            .map(|r| {
                (
                    r.ext.to_ascii_lowercase(),
                    Rule {
                        min_size_bytes: r.min_size_kib.saturating_mul(1024),
                        enabled: r.enabled,
                    },
                )
            })
            .collect();
        let types = cfg
            .types
            .iter()
            .map(|r| {
                (
                    r.mime.to_ascii_lowercase(),
                    Rule {
                        min_size_bytes: r.min_size_kib.saturating_mul(1024),
                        enabled: r.enabled,
                    },
                )
            })
            .collect();
        Self { extensions, types }
    }

    pub fn check_extension(&self, ext: &str, size: Option<u64>) -> RuleVerdict {
        self.extensions
            .get(&ext.to_ascii_lowercase())
            .map_or(RuleVerdict::Unlisted, |r| r.judge(size))
    }

    /// `major/*` wins over the exact type when both are listed.
    pub fn check_type(&self, mime: &str, size: Option<u64>) -> RuleVerdict {
        let mime = mime.to_ascii_lowercase();
        let wildcard = mime
            .split_once('/')
            .map(|(major, _)| format!("{major}/*"));
        wildcard
            .and_then(|w| self.types.get(&w))
            .or_else(|| self.types.get(&mime))
            .map_or(RuleVerdict::Unlisted, |r| r.judge(size))
    }
}

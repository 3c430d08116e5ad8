//! Admission filter: extension / MIME / size rules.
//!
//! The filter only answers "should this observation become a record". Rules are
//! checked in a fixed order and the first rule that has an opinion wins:
//!
//! 1. extension of the URL path
//! 2. response MIME type (`major/*` wildcard before the exact type)
//! 3. extension of the `Content-Disposition` attachment name
//! 4. a `media` resource-type hint from the tap
//!
//! A matching rule that is disabled, or whose minimum size the resource does
//! not reach, is a hard [`Verdict::Reject`]: later rules are not consulted.

mod block;
mod rules;

use crate::config::FilterConfig;
use crate::record::shape::{file_name_from_url, split_file_name};
use crate::record::{Observation, ResponseSummary};

pub use block::BlockList;
pub use rules::{RuleSet, RuleVerdict};

/// Outcome of running an observation through the filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Accept,
    /// A rule matched and explicitly blocks the resource.
    Reject,
    /// No rule matched (soft reject).
    NoMatch,
}

impl Verdict {
    pub fn is_accept(self) -> bool {
        self == Verdict::Accept
    }
}

/// Only page-loadable schemes carry capturable media.
pub fn is_special_url(url: &str) -> bool {
    !(url.starts_with("http://") || url.starts_with("https://") || url.starts_with("blob:"))
}

#[derive(Debug, Clone)]
pub struct AdmissionFilter {
    rules: RuleSet,
}

impl AdmissionFilter {
    pub fn new(cfg: &FilterConfig) -> Self {
        Self {
            rules: RuleSet::from_config(cfg),
        }
    }

    pub fn evaluate(&self, obs: &Observation, summary: &ResponseSummary) -> Verdict {
        if obs.url.is_empty() || is_special_url(&obs.url) {
            return Verdict::Reject;
        }
        if obs
            .initiator
            .as_deref()
            .is_some_and(|i| i != "null" && is_special_url(i))
        {
            return Verdict::Reject;
        }

        // Heuristic hits already carry their own type hint.
        if obs.is_heuristic && (obs.extra_extension.is_some() || obs.mime_type.is_some()) {
            return Verdict::Accept;
        }

        let (_, ext) = file_name_from_url(&obs.url);
        if let Some(ext) = ext.as_deref() {
            match self.rules.check_extension(ext, summary.size) {
                RuleVerdict::Block => return Verdict::Reject,
                RuleVerdict::Allow => return Verdict::Accept,
                RuleVerdict::Unlisted => {}
            }
        }

        let mime = obs.mime_type.as_deref().or(summary.mime_type.as_deref());
        if let Some(mime) = mime {
            match self.rules.check_type(mime, summary.size) {
                RuleVerdict::Block => return Verdict::Reject,
                RuleVerdict::Allow => return Verdict::Accept,
                RuleVerdict::Unlisted => {}
            }
        }

        if let Some(attached) = summary.attachment_filename() {
            if let (_, Some(ext)) = split_file_name(&attached) {
                // Attachment names are trusted without the size floor.
                match self.rules.check_extension(&ext, None) {
                    RuleVerdict::Block => return Verdict::Reject,
                    RuleVerdict::Allow => return Verdict::Accept,
                    RuleVerdict::Unlisted => {}
                }
            }
        }

        if obs.resource_type.as_deref() == Some("media") {
            return Verdict::Accept;
        }

        Verdict::NoMatch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ExtRule, FilterConfig};

    fn filter() -> AdmissionFilter {
        AdmissionFilter::new(&FilterConfig::default())
    }

    fn eval(obs: &Observation) -> Verdict {
        let summary = ResponseSummary::from_headers(&obs.response_headers);
        filter().evaluate(obs, &summary)
    }

    #[test]
    fn accepts_listed_extension() {
        assert_eq!(eval(&Observation::new("https://cdn.test/v/clip.mp4")), Verdict::Accept);
        assert_eq!(eval(&Observation::new("https://cdn.test/live/index.M3U8")), Verdict::Accept);
    }

    #[test]
    fn disabled_extension_blocks_before_type() {
        let obs = Observation::new("https://cdn.test/seg/001.ts")
            .with_response_header("Content-Type", "video/mp2t");
        assert_eq!(eval(&obs), Verdict::Reject);
    }

    #[test]
    fn falls_through_to_mime_type() {
        let obs = Observation::new("https://cdn.test/play?id=1")
            .with_response_header("Content-Type", "audio/mpeg");
        assert_eq!(eval(&obs), Verdict::Accept);
        let obs = Observation::new("https://cdn.test/api")
            .with_response_header("Content-Type", "application/json");
        assert_eq!(eval(&obs), Verdict::NoMatch);
        let obs = Observation::new("https://cdn.test/blob")
            .with_response_header("Content-Type", "application/octet-stream");
        assert_eq!(eval(&obs), Verdict::Reject);
    }

    #[test]
    fn attachment_and_media_hint() {
        let obs = Observation::new("https://cdn.test/get?id=3")
            .with_response_header("Content-Disposition", "attachment; filename=\"a.flv\"");
        assert_eq!(eval(&obs), Verdict::Accept);

        let mut obs = Observation::new("https://cdn.test/stream");
        obs.resource_type = Some("media".into());
        assert_eq!(eval(&obs), Verdict::Accept);
    }

    #[test]
    fn size_floor_blocks_small_known_sizes_only() {
        let cfg = FilterConfig {
            extensions: vec![ExtRule {
                ext: "mp4".into(),
                min_size_kib: 1,
                enabled: true,
            }],
            types: vec![],
            ..Default::default()
        };
        let f = AdmissionFilter::new(&cfg);
        let small = Observation::new("https://cdn.test/a.mp4").with_response_header("Content-Length", "1024");
        let big = Observation::new("https://cdn.test/a.mp4").with_response_header("Content-Length", "1025");
        let unknown = Observation::new("https://cdn.test/a.mp4");
        let s = |o: &Observation| ResponseSummary::from_headers(&o.response_headers);
        assert_eq!(f.evaluate(&small, &s(&small)), Verdict::Reject);
        assert_eq!(f.evaluate(&big, &s(&big)), Verdict::Accept);
        assert_eq!(f.evaluate(&unknown, &s(&unknown)), Verdict::Accept);
    }

    #[test]
    fn special_pages_are_rejected() {
        assert!(is_special_url("chrome://settings"));
        assert!(is_special_url("about:blank"));
        assert!(!is_special_url("blob:https://site.test/1"));
        assert_eq!(eval(&Observation::new("chrome-extension://x/a.mp4")), Verdict::Reject);

        let mut obs = Observation::new("https://cdn.test/a.mp4");
        obs.initiator = Some("chrome-extension://abc".into());
        assert_eq!(eval(&obs), Verdict::Reject);
        obs.initiator = Some("null".into());
        assert_eq!(eval(&obs), Verdict::Accept);
    }

    #[test]
    fn heuristic_with_hint_is_accepted() {
        let mut obs = Observation::new("https://cdn.test/api/manifest");
        obs.is_heuristic = true;
        obs.extra_extension = Some("m3u8".into());
        assert_eq!(eval(&obs), Verdict::Accept);
    }
}

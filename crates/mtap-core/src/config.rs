use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Per-context cache limits and dedup behaviour (`[cache]` in config.toml).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Records per context before the context is reset.
    pub max_length: usize,
    /// Fingerprint-set cap; also the context length above which dedup is skipped.
    pub cleanup_threshold: usize,
    /// Suppress repeated URLs within a context.
    pub check_duplicates: bool,
    /// When to drop a context's records on its own.
    pub auto_clear: AutoClear,
    /// Age after which `sweep` drops records, in hours.
    pub max_age_hours: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_length: 9999,
            cleanup_threshold: 500,
            check_duplicates: true,
            auto_clear: AutoClear::Never,
            max_age_hours: 24,
        }
    }
}

impl CacheConfig {
    pub fn max_age(&self) -> Duration {
        Duration::from_secs(self.max_age_hours.saturating_mul(3600))
    }
}

/// Automatic per-context clearing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AutoClear {
    #[default]
    Never,
    /// Drop the context's records when it starts loading a new page.
    Navigate,
}

/// Save debouncing (`[persist]` in config.toml). Delays in milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistConfig {
    /// Context length at which saves go to the long-delay tier.
    pub heavy_load_threshold: usize,
    /// Long-delay escalations allowed between two flushes.
    pub heavy_retry_limit: u32,
    pub long_delay_ms: u64,
    /// A save requested sooner than this after a flush is deferred.
    pub hot_interval_ms: u64,
    pub short_delay_ms: u64,
    /// Key the whole cache is stored under.
    pub storage_key: String,
}

impl Default for PersistConfig {
    fn default() -> Self {
        Self {
            heavy_load_threshold: 100,
            heavy_retry_limit: 10,
            long_delay_ms: 5000,
            hot_interval_ms: 500,
            short_delay_ms: 2000,
            storage_key: "MediaData".to_string(),
        }
    }
}

impl PersistConfig {
    pub fn long_delay(&self) -> Duration {
        Duration::from_millis(self.long_delay_ms)
    }

    pub fn hot_interval(&self) -> Duration {
        Duration::from_millis(self.hot_interval_ms)
    }

    pub fn short_delay(&self) -> Duration {
        Duration::from_millis(self.short_delay_ms)
    }
}

/// Readiness gate monitoring (`[gate]`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// Warn when this many admissions are waiting for the gate.
    pub pending_warn_threshold: usize,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            pending_warn_threshold: 1000,
        }
    }
}

/// One extension rule: `{ ext = "mp4", min_size_kib = 0, enabled = true }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtRule {
    pub ext: String,
    #[serde(default)]
    pub min_size_kib: u64,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

/// One MIME rule; `video/*` style wildcards match the major type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeRule {
    #[serde(rename = "type")]
    pub mime: String,
    #[serde(default)]
    pub min_size_kib: u64,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

fn enabled_by_default() -> bool {
    true
}

/// One page-URL pattern (a regular expression) for the block list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockRule {
    pub pattern: String,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

/// How the block list is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockMode {
    /// Contexts on a matching page capture nothing.
    #[default]
    Block,
    /// Only contexts on a matching page capture anything.
    Allow,
}

/// Admission rules (`[filter]`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    pub block_mode: BlockMode,
    /// Page URLs checked when a context navigates. Empty disables the list.
    pub block_urls: Vec<BlockRule>,
    pub extensions: Vec<ExtRule>,
    pub types: Vec<TypeRule>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        let ext = |e: &str, enabled: bool| ExtRule {
            ext: e.to_string(),
            min_size_kib: 0,
            enabled,
        };
        let ty = |t: &str, enabled: bool| TypeRule {
            mime: t.to_string(),
            min_size_kib: 0,
            enabled,
        };
        let mut extensions: Vec<ExtRule> = [
            "flv", "hlv", "f4v", "mp4", "mp3", "wma", "wav", "m4a", "webm", "ogg", "ogv", "acc",
            "mov", "mkv", "m4s", "aac", "3gp", "avi", "wmv", "asf", "rm", "rmvb", "m3u8", "m3u",
            "mpd",
        ]
        .iter()
        .map(|e| ext(e, true))
        .collect();
        // Transport-stream segments are too noisy to list by default.
        extensions.push(ext("ts", false));
        Self {
            block_mode: BlockMode::Block,
            block_urls: Vec::new(),
            extensions,
            types: vec![
                ty("video/*", true),
                ty("audio/*", true),
                ty("application/vnd.apple.mpegurl", true),
                ty("application/x-mpegurl", true),
                ty("application/dash+xml", true),
                ty("application/octet-stream", false),
            ],
        }
    }
}

/// Global configuration loaded from `~/.config/mtap/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// Master switch; when off nothing is admitted.
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub persist: PersistConfig,
    #[serde(default)]
    pub gate: GateConfig,
    #[serde(default)]
    pub filter: FilterConfig,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            cache: CacheConfig::default(),
            persist: PersistConfig::default(),
            gate: GateConfig::default(),
            filter: FilterConfig::default(),
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("mtap")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<CaptureConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = CaptureConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }
    load_from_path(&path)
}

/// Load configuration from an explicit file.
pub fn load_from_path(path: &Path) -> Result<CaptureConfig> {
    let data =
        fs::read_to_string(path).with_context(|| format!("read config: {}", path.display()))?;
    let cfg: CaptureConfig =
        toml::from_str(&data).with_context(|| format!("parse config: {}", path.display()))?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let cfg = CaptureConfig::default();
        assert!(cfg.enabled);
        assert_eq!(cfg.cache.max_length, 9999);
        assert_eq!(cfg.cache.cleanup_threshold, 500);
        assert!(cfg.cache.check_duplicates);
        assert_eq!(cfg.persist.heavy_load_threshold, 100);
        assert_eq!(cfg.persist.heavy_retry_limit, 10);
        assert_eq!(cfg.persist.long_delay(), Duration::from_millis(5000));
        assert_eq!(cfg.persist.hot_interval(), Duration::from_millis(500));
        assert_eq!(cfg.persist.short_delay(), Duration::from_millis(2000));
        assert_eq!(cfg.persist.storage_key, "MediaData");
    }

    #[test]
    fn config_toml_roundtrip() {
        let cfg = CaptureConfig::default();
        let toml = toml::to_string_pretty(&cfg).unwrap();
        let parsed: CaptureConfig = toml::from_str(&toml).unwrap();
        assert_eq!(parsed, cfg);
    }

    #[test]
    fn config_toml_partial_sections_use_defaults() {
        let toml = r#"
            [cache]
            max_length = 50
            auto_clear = "navigate"

            [persist]
            short_delay_ms = 100
        "#;
        let cfg: CaptureConfig = toml::from_str(toml).unwrap();
        assert!(cfg.enabled);
        assert_eq!(cfg.cache.max_length, 50);
        assert_eq!(cfg.cache.cleanup_threshold, 500);
        assert_eq!(cfg.cache.auto_clear, AutoClear::Navigate);
        assert_eq!(cfg.persist.short_delay_ms, 100);
        assert_eq!(cfg.persist.long_delay_ms, 5000);
        assert_eq!(cfg.filter, FilterConfig::default());
    }

    #[test]
    fn config_toml_filter_rules() {
        let toml = r#"
            enabled = false

            [[filter.extensions]]
            ext = "mp4"
            min_size_kib = 1024

            [[filter.types]]
            type = "video/*"
            enabled = false
        "#;
        let cfg: CaptureConfig = toml::from_str(toml).unwrap();
        assert!(!cfg.enabled);
        assert_eq!(cfg.filter.extensions.len(), 1);
        assert_eq!(cfg.filter.extensions[0].min_size_kib, 1024);
        assert!(cfg.filter.extensions[0].enabled);
        assert_eq!(cfg.filter.types[0].mime, "video/*");
        assert!(!cfg.filter.types[0].enabled);
    }

    #[test]
    fn config_toml_block_list() {
        let toml = r#"
            [filter]
            block_mode = "allow"

            [[filter.block_urls]]
            pattern = "^https://video\\.example\\.com/"

            [[filter.block_urls]]
            pattern = "ads"
            enabled = false
        "#;
        let cfg: CaptureConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.filter.block_mode, BlockMode::Allow);
        assert_eq!(cfg.filter.block_urls.len(), 2);
        assert_eq!(cfg.filter.block_urls[0].pattern, r"^https://video\.example\.com/");
        assert!(cfg.filter.block_urls[0].enabled);
        assert!(!cfg.filter.block_urls[1].enabled);
        // Rule tables left out keep their defaults.
        assert_eq!(cfg.filter.extensions, FilterConfig::default().extensions);
    }

    #[test]
    fn load_from_path_reports_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "enabled = \"yes\"").unwrap();
        let err = load_from_path(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("config.toml"));
    }
}

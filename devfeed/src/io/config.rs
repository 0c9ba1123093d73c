//! Client configuration stored in `devfeed.toml`.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::core::controller::ControllerOptions;
use crate::core::types::{DEFAULT_PREFETCH_THRESHOLD, PAGE_SIZE};

/// Default config file name, resolved against the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "devfeed.toml";

/// Client configuration (TOML).
///
/// Intended to be edited by humans. Missing fields fall back to defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct FeedConfig {
    pub api: ApiConfig,
    pub session: SessionConfig,
    pub feed: FeedTuning,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL of the backend, without a trailing slash.
    pub base_url: String,

    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:7777".to_string(),
            timeout_secs: 10,
        }
    }
}

/// Credentials of the signed-in user. Never written back by the client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct SessionConfig {
    /// Value of the backend's `token` cookie. `DEVFEED_TOKEN` overrides it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct FeedTuning {
    /// Pause between a successful decision and eviction, in milliseconds.
    pub settle_delay_ms: u64,

    /// Prefetch once the queue holds this many profiles or fewer.
    pub prefetch_threshold: usize,
}

impl Default for FeedTuning {
    fn default() -> Self {
        Self {
            settle_delay_ms: 400,
            prefetch_threshold: DEFAULT_PREFETCH_THRESHOLD,
        }
    }
}

impl FeedConfig {
    pub fn validate(&self) -> Result<()> {
        if self.api.base_url.trim().is_empty() {
            return Err(anyhow!("api.base_url must be non-empty"));
        }
        if self.api.timeout_secs == 0 {
            return Err(anyhow!("api.timeout_secs must be > 0"));
        }
        if self.feed.prefetch_threshold >= PAGE_SIZE {
            return Err(anyhow!(
                "feed.prefetch_threshold must be < {} (the page size)",
                PAGE_SIZE
            ));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.api.timeout_secs)
    }

    pub fn controller_options(&self) -> ControllerOptions {
        ControllerOptions {
            settle_delay: Duration::from_millis(self.feed.settle_delay_ms),
            prefetch_threshold: self.feed.prefetch_threshold,
        }
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `FeedConfig::default()`.
pub fn load_config(path: &Path) -> Result<FeedConfig> {
    if !path.exists() {
        let cfg = FeedConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: FeedConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &FeedConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("create directory {}", parent.display()))?;
    }
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_missing_returns_default() {
        let temp = tempfile::tempdir().expect("tempdir");
        let cfg = load_config(&temp.path().join("missing.toml")).expect("load");
        assert_eq!(cfg, FeedConfig::default());
    }

    #[test]
    fn write_then_load_round_trips() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("nested").join("devfeed.toml");
        let mut cfg = FeedConfig::default();
        cfg.api.base_url = "https://api.example.dev".to_string();
        cfg.feed.settle_delay_ms = 250;
        write_config(&path, &cfg).expect("write");
        let loaded = load_config(&path).expect("load");
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("devfeed.toml");
        fs::write(&path, "[session]\ntoken = \"abc\"\n").expect("write");

        let cfg = load_config(&path).expect("load");
        assert_eq!(cfg.session.token.as_deref(), Some("abc"));
        assert_eq!(cfg.api, ApiConfig::default());
        assert_eq!(
            cfg.controller_options().settle_delay,
            Duration::from_millis(400)
        );
    }

    #[test]
    fn rejects_threshold_at_page_size() {
        let mut cfg = FeedConfig::default();
        cfg.feed.prefetch_threshold = PAGE_SIZE;
        let err = cfg.validate().expect_err("invalid");
        assert!(err.to_string().contains("prefetch_threshold"));
    }

    #[test]
    fn rejects_zero_timeout() {
        let mut cfg = FeedConfig::default();
        cfg.api.timeout_secs = 0;
        assert!(cfg.validate().is_err());
    }
}

// src/config.rs
//! TOML configuration for the monitor. Loaded once at process start; a
//! missing file or a malformed rule pattern is fatal (the process must not
//! start half-configured).

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub monitor: MonitorConfig,
    #[serde(default)]
    pub filter: FilterConfig,
    #[serde(default, rename = "rules")]
    pub tag_rules: Vec<RuleConfig>,
    #[serde(default)]
    pub notify: NotifyConfig,
    #[serde(default)]
    pub sources: SourcesConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Bootstrap the ledger from the first fetch instead of delivering,
    /// so a cold start does not flood the webhook with history.
    pub init_history_on_first_run: bool,
    /// 0 = run forever.
    pub max_cycles: u64,
    pub interval_secs: u64,
    pub jitter_secs: u64,
    /// Items requested per source per cycle.
    pub fetch_limit: usize,
    /// Spacing between successive webhook pushes within one cycle.
    pub notify_delay_ms: u64,
    pub history_file: String,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            init_history_on_first_run: true,
            max_cycles: 0,
            interval_secs: 600,
            jitter_secs: 50,
            fetch_limit: 10,
            notify_delay_ms: 1_000,
            history_file: "sent_history.txt".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct FilterConfig {
    pub allowed_tags: Vec<String>,
    pub allow_untagged: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RuleConfig {
    pub tag: String,
    #[serde(default)]
    pub case_sensitive: bool,
    pub patterns: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NotifyConfig {
    /// Falls back to $FEISHU_WEBHOOK_URL when absent.
    pub webhook_url: Option<String>,
    pub timeout_secs: u64,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    pub enabled: Vec<String>,
    pub timeout_secs: u64,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            enabled: vec![
                "binance".to_string(),
                "okx".to_string(),
                "bybit".to_string(),
                "huobi".to_string(),
            ],
            timeout_secs: 10,
        }
    }
}

impl AppConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        let cfg: AppConfig = toml::from_str(&content)
            .with_context(|| format!("parsing config {}", path.display()))?;
        Ok(cfg)
    }
}

// src/sources/mod.rs
//! Exchange announcement feeds. One adapter per exchange, all behind
//! [`AnnouncementSource`]; adapters hold nothing but their endpoint
//! configuration and an HTTP client.

pub mod binance;
pub mod bybit;
pub mod huobi;
pub mod okx;

use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;

use crate::config::SourcesConfig;
use crate::model::RawAnnouncement;

#[async_trait]
pub trait AnnouncementSource: Send + Sync {
    fn exchange(&self) -> &'static str;

    /// Fetch up to `limit` recent announcements per monitored category,
    /// newest first. Never returns partially-constructed items; entries that
    /// fail field mapping are skipped.
    async fn fetch_latest(&self, limit: usize) -> Result<Vec<RawAnnouncement>>;
}

const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

pub(crate) fn http_client(timeout_secs: u64) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .user_agent(USER_AGENT)
        .build()
        .context("building http client")
}

/// Instantiate the adapters named in config, preserving config order so the
/// merged fetch output is deterministic.
pub fn build_sources(cfg: &SourcesConfig) -> Result<Vec<Box<dyn AnnouncementSource>>> {
    let mut sources: Vec<Box<dyn AnnouncementSource>> = Vec::with_capacity(cfg.enabled.len());
    for name in &cfg.enabled {
        match name.to_ascii_lowercase().as_str() {
            "binance" => sources.push(Box::new(binance::BinanceSource::new(cfg.timeout_secs)?)),
            "okx" => sources.push(Box::new(okx::OkxSource::new(cfg.timeout_secs)?)),
            "bybit" => sources.push(Box::new(bybit::BybitSource::new(cfg.timeout_secs)?)),
            "huobi" | "htx" => sources.push(Box::new(huobi::HuobiSource::new(cfg.timeout_secs)?)),
            other => bail!("unknown announcement source {other:?} in config"),
        }
    }
    Ok(sources)
}

/// Newest-first order shared by every adapter's merged output.
pub(crate) fn sort_newest_first(items: &mut [RawAnnouncement]) {
    items.sort_by(|a, b| b.published_at.cmp(&a.published_at));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_sources_rejects_unknown_names() {
        let cfg = SourcesConfig {
            enabled: vec!["binance".into(), "kraken".into()],
            timeout_secs: 5,
        };
        let err = match build_sources(&cfg) {
            Ok(_) => panic!("expected build_sources to fail"),
            Err(e) => e,
        };
        assert!(err.to_string().contains("kraken"));
    }

    #[test]
    fn build_sources_preserves_config_order() {
        let cfg = SourcesConfig {
            enabled: vec!["bybit".into(), "binance".into()],
            timeout_secs: 5,
        };
        let sources = build_sources(&cfg).unwrap();
        let names: Vec<&str> = sources.iter().map(|s| s.exchange()).collect();
        assert_eq!(names, vec!["Bybit", "Binance"]);
    }
}

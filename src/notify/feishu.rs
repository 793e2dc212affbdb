// src/notify/feishu.rs
//! Feishu bot webhook. Plain `msg_type: "text"` messages; the webhook wraps
//! errors in a JSON envelope where `code != 0` means failure even on 2xx.

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use super::Notifier;
use crate::model::Announcement;

const ENV_WEBHOOK_URL: &str = "FEISHU_WEBHOOK_URL";

pub struct FeishuNotifier {
    webhook_url: String,
    client: Client,
    timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct FeishuResponse {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    msg: String,
}

impl FeishuNotifier {
    pub fn new(webhook_url: String, timeout_secs: u64) -> Self {
        Self {
            webhook_url,
            client: Client::new(),
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    /// Webhook URL from config, falling back to $FEISHU_WEBHOOK_URL. Neither
    /// set is a startup error.
    pub fn from_config(configured: Option<&str>, timeout_secs: u64) -> Result<Self> {
        let url = match configured {
            Some(u) if !u.is_empty() => u.to_string(),
            _ => std::env::var(ENV_WEBHOOK_URL)
                .map_err(|_| anyhow!("no webhook url: set [notify].webhook_url or {ENV_WEBHOOK_URL}"))?,
        };
        Ok(Self::new(url, timeout_secs))
    }

    fn build_text(ann: &Announcement) -> String {
        let time_str = ann.published_at_local().format("%Y-%m-%d %H:%M:%S");
        let tag_display = ann
            .tag
            .as_deref()
            .map(|t| format!("[{t}] "))
            .unwrap_or_default();
        format!(
            "🔔 {} 交易所公告\n\n{}{}\n\n发布时间: {}\n详情链接: {}",
            ann.exchange, tag_display, ann.title, time_str, ann.url
        )
    }
}

#[async_trait]
impl Notifier for FeishuNotifier {
    async fn send(&self, ann: &Announcement) -> Result<()> {
        let body = serde_json::json!({
            "msg_type": "text",
            "content": { "text": Self::build_text(ann) },
        });

        let resp: FeishuResponse = self
            .client
            .post(&self.webhook_url)
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .context("feishu post")?
            .error_for_status()
            .context("feishu non-2xx")?
            .json()
            .await
            .context("feishu response json")?;

        if resp.code != 0 {
            return Err(anyhow!("feishu api error {}: {}", resp.code, resp.msg));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn message_text_carries_tag_title_and_url() {
        let ann = Announcement {
            exchange: "Binance".into(),
            title: "Binance Will List ABC".into(),
            published_at: Utc.with_ymd_and_hms(2024, 11, 23, 10, 0, 0).unwrap(),
            url: "https://www.binance.com/test".into(),
            tag: Some("listing".into()),
        };
        let text = FeishuNotifier::build_text(&ann);
        assert!(text.contains("[listing] Binance Will List ABC"));
        assert!(text.contains("https://www.binance.com/test"));
        assert!(text.contains("Binance 交易所公告"));
    }

    #[test]
    fn untagged_message_has_no_bracket_prefix() {
        let ann = Announcement {
            exchange: "OKX".into(),
            title: "系统维护公告".into(),
            published_at: Utc.with_ymd_and_hms(2024, 11, 23, 10, 0, 0).unwrap(),
            url: "https://www.okx.com/x".into(),
            tag: None,
        };
        let text = FeishuNotifier::build_text(&ann);
        assert!(text.contains("\n系统维护公告\n"));
        assert!(!text.contains('['));
    }
}

// src/sources/okx.rs
//! OKX help-center announcements. No public JSON endpoint; the section page
//! embeds an `appState` JSON blob that carries the article list.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use once_cell::sync::OnceCell;
use regex::Regex;
use serde_json::Value;
use tracing::warn;

use crate::model::RawAnnouncement;
use crate::sources::{http_client, sort_newest_first, AnnouncementSource};

const LANG: &str = "zh-hans";

const SECTION_PATHS: &[&str] = &["announcements-latest-announcements"];

fn app_state_re() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?is)<script[^>]*id="appState"[^>]*>(.*?)</script>"#).unwrap()
    })
}

pub struct OkxSource {
    client: reqwest::Client,
}

impl OkxSource {
    pub fn new(timeout_secs: u64) -> Result<Self> {
        Ok(Self {
            client: http_client(timeout_secs)?,
        })
    }

    async fn fetch_section(&self, section_path: &str, limit: usize) -> Result<Vec<RawAnnouncement>> {
        let url = format!("https://www.okx.com/{LANG}/help/section/{section_path}");
        let html = self
            .client
            .get(&url)
            .send()
            .await
            .context("okx section request")?
            .error_for_status()
            .context("okx section non-2xx")?
            .text()
            .await
            .context("okx section body")?;

        let items = extract_items(&html)?;
        Ok(items.iter().take(limit).filter_map(parse_item).collect())
    }
}

fn extract_items(html: &str) -> Result<Vec<Value>> {
    let captured = app_state_re()
        .captures(html)
        .and_then(|c| c.get(1))
        .ok_or_else(|| anyhow!("appState blob not found in okx page"))?;
    let state: Value =
        serde_json::from_str(captured.as_str()).context("parsing okx appState json")?;

    let items = state
        .pointer("/appContext/initialProps/sectionData/articleList/items")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    if items.is_empty() {
        return Err(anyhow!("no announcements in okx appState"));
    }
    Ok(items)
}

fn parse_item(item: &Value) -> Option<RawAnnouncement> {
    let publish_time = item.get("publishTime").and_then(Value::as_str)?;
    let published_at = DateTime::parse_from_rfc3339(publish_time)
        .ok()?
        .with_timezone(&Utc);
    let slug = item.get("slug").and_then(Value::as_str)?;
    if slug.is_empty() {
        return None;
    }
    let title = item
        .get("title")
        .and_then(Value::as_str)
        .map(|t| html_escape::decode_html_entities(t).trim().to_string())?;
    if title.is_empty() {
        return None;
    }

    Some(RawAnnouncement {
        exchange: "OKX".to_string(),
        title,
        published_at,
        url: format!("https://www.okx.com/{LANG}/help/{slug}"),
    })
}

#[async_trait]
impl AnnouncementSource for OkxSource {
    fn exchange(&self) -> &'static str {
        "OKX"
    }

    async fn fetch_latest(&self, limit: usize) -> Result<Vec<RawAnnouncement>> {
        let mut all = Vec::new();
        for section in SECTION_PATHS {
            match self.fetch_section(section, limit).await {
                Ok(mut items) => all.append(&mut items),
                Err(e) => {
                    warn!(error = ?e, section, "okx section fetch failed");
                }
            }
        }
        sort_newest_first(&mut all);
        Ok(all)
    }
}

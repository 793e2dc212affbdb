// src/sources/bybit.rs
//! Bybit announcement portal. Listing pages embed a `__NEXT_DATA__` JSON
//! blob with the article list under `props.pageProps.articleInitEntity`.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use once_cell::sync::OnceCell;
use regex::Regex;
use serde_json::Value;
use tracing::warn;

use crate::model::RawAnnouncement;
use crate::sources::{http_client, sort_newest_first, AnnouncementSource};

const BASE_URL: &str = "https://announcements.bybit.com";
const LANG: &str = "en-US";

const CATEGORIES: &[&str] = &["delistings", "maintenance_updates"];

fn next_data_re() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?is)<script[^>]*id="__NEXT_DATA__"[^>]*>(.*?)</script>"#).unwrap()
    })
}

pub struct BybitSource {
    client: reqwest::Client,
}

impl BybitSource {
    pub fn new(timeout_secs: u64) -> Result<Self> {
        Ok(Self {
            client: http_client(timeout_secs)?,
        })
    }

    async fn fetch_category(&self, category: &str, limit: usize) -> Result<Vec<RawAnnouncement>> {
        let url = format!("{BASE_URL}/{LANG}/?category={category}");
        let html = self
            .client
            .get(&url)
            .send()
            .await
            .context("bybit listing request")?
            .error_for_status()
            .context("bybit listing non-2xx")?
            .text()
            .await
            .context("bybit listing body")?;

        let items = extract_items(&html)?;
        Ok(items
            .iter()
            .take(limit)
            .filter_map(|item| parse_item(item, category))
            .collect())
    }
}

fn extract_items(html: &str) -> Result<Vec<Value>> {
    let captured = next_data_re()
        .captures(html)
        .and_then(|c| c.get(1))
        .ok_or_else(|| anyhow!("__NEXT_DATA__ blob not found in bybit page"))?;
    let data: Value =
        serde_json::from_str(captured.as_str()).context("parsing bybit __NEXT_DATA__ json")?;

    let items = data
        .pointer("/props/pageProps/articleInitEntity/list")
        .and_then(Value::as_array)
        .cloned()
        .ok_or_else(|| anyhow!("article list missing from bybit __NEXT_DATA__"))?;
    if items.is_empty() {
        return Err(anyhow!("no announcements in bybit __NEXT_DATA__"));
    }
    Ok(items)
}

fn parse_item(item: &Value, category: &str) -> Option<RawAnnouncement> {
    let secs = item
        .get("publish_time")
        .or_else(|| item.get("date_timestamp"))
        .and_then(epoch_seconds)?;
    let published_at = DateTime::<Utc>::from_timestamp(secs, 0)?;

    let title = item.get("title").and_then(Value::as_str)?.trim();
    if title.is_empty() {
        return None;
    }
    let path = item.get("url").and_then(Value::as_str)?.trim();
    if path.is_empty() {
        return None;
    }

    Some(RawAnnouncement {
        exchange: "Bybit".to_string(),
        title: html_escape::decode_html_entities(title).to_string(),
        published_at,
        url: article_url(path, category),
    })
}

fn epoch_seconds(v: &Value) -> Option<i64> {
    match v {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn article_url(path: &str, category: &str) -> String {
    if path.starts_with("http") {
        return path.to_string();
    }
    let path = if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    };
    format!("{BASE_URL}/{LANG}{path}?category={category}")
}

#[async_trait]
impl AnnouncementSource for BybitSource {
    fn exchange(&self) -> &'static str {
        "Bybit"
    }

    async fn fetch_latest(&self, limit: usize) -> Result<Vec<RawAnnouncement>> {
        let mut all = Vec::new();
        for category in CATEGORIES {
            match self.fetch_category(category, limit).await {
                Ok(mut items) => all.append(&mut items),
                Err(e) => {
                    warn!(error = ?e, category, "bybit category fetch failed");
                }
            }
        }
        sort_newest_first(&mut all);
        Ok(all)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const PAGE: &str = r#"<html><body>
        <script id="__NEXT_DATA__" type="application/json">{"props":{"pageProps":{"articleInitEntity":{"list":[
            {"title":"Delisting of XYZ","url":"/article/delist-xyz","publish_time":1700000000},
            {"title":"Maintenance","url":"/article/maint-1","date_timestamp":"1699990000"},
            {"title":"","url":"/article/empty"}
        ]}}}}</script>
        </body></html>"#;

    #[test]
    fn extracts_and_parses_next_data_items() {
        let items = extract_items(PAGE).unwrap();
        let parsed: Vec<RawAnnouncement> = items
            .iter()
            .filter_map(|i| parse_item(i, "delistings"))
            .collect();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].title, "Delisting of XYZ");
        assert_eq!(
            parsed[0].url,
            "https://announcements.bybit.com/en-US/article/delist-xyz?category=delistings"
        );
        assert_eq!(parsed[0].published_at.timestamp(), 1_700_000_000);
    }

    #[test]
    fn absolute_urls_are_kept_as_is() {
        let item = json!({
            "title": "t",
            "url": "https://elsewhere.example/x",
            "publish_time": 1700000000,
        });
        let ann = parse_item(&item, "delistings").unwrap();
        assert_eq!(ann.url, "https://elsewhere.example/x");
    }
}

// src/sources/huobi.rs
//! HTX (Huobi) support-center list API. Categories are (oneLevelId,
//! twoLevelId) pairs; the API caps a single call at 50 items.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::warn;

use crate::model::RawAnnouncement;
use crate::sources::{http_client, sort_newest_first, AnnouncementSource};

const LIST_API: &str = "https://www.htx.com/-/x/support/public/getList/v2";
const LANG: &str = "zh-cn";
const MAX_LIMIT: usize = 50;

// (oneLevelId, twoLevelId): futures, important, spot.
const CATEGORY_PAIRS: &[(&str, &str)] = &[
    ("360000032161", "360000061481"),
    ("360000031902", "360000039481"),
    ("115000389432", "900000741690"),
];

#[derive(Debug, Deserialize)]
struct ApiResponse {
    code: i64,
    data: Option<ApiData>,
}

#[derive(Debug, Deserialize)]
struct ApiData {
    #[serde(default)]
    list: Vec<Item>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Item {
    id: Option<i64>,
    title: Option<String>,
    show_time: Option<i64>,
}

pub struct HuobiSource {
    client: reqwest::Client,
}

impl HuobiSource {
    pub fn new(timeout_secs: u64) -> Result<Self> {
        Ok(Self {
            client: http_client(timeout_secs)?,
        })
    }

    async fn fetch_category(
        &self,
        one_level_id: &str,
        two_level_id: &str,
        limit: usize,
    ) -> Result<Vec<RawAnnouncement>> {
        let resp: ApiResponse = self
            .client
            .get(LIST_API)
            .query(&[
                ("language", LANG.to_string()),
                ("page", "1".to_string()),
                ("limit", limit.min(MAX_LIMIT).to_string()),
                ("oneLevelId", one_level_id.to_string()),
                ("twoLevelId", two_level_id.to_string()),
            ])
            .send()
            .await
            .context("htx list request")?
            .error_for_status()
            .context("htx list non-2xx")?
            .json()
            .await
            .context("htx list json")?;

        if resp.code != 200 {
            return Err(anyhow!("htx api error code: {}", resp.code));
        }
        let items = resp.data.map(|d| d.list).unwrap_or_default();
        if items.is_empty() {
            return Err(anyhow!("htx api returned no announcements"));
        }

        Ok(items
            .into_iter()
            .take(limit)
            .filter_map(parse_item)
            .collect())
    }
}

fn parse_item(item: Item) -> Option<RawAnnouncement> {
    let id = item.id?;
    let title = item.title.as_deref().map(str::trim).unwrap_or_default();
    if title.is_empty() {
        return None;
    }
    let published_at = DateTime::<Utc>::from_timestamp_millis(item.show_time?)?;

    Some(RawAnnouncement {
        exchange: "HTX".to_string(),
        title: title.to_string(),
        published_at,
        url: format!("https://www.htx.com/{LANG}/support/{id}"),
    })
}

#[async_trait]
impl AnnouncementSource for HuobiSource {
    fn exchange(&self) -> &'static str {
        "HTX"
    }

    async fn fetch_latest(&self, limit: usize) -> Result<Vec<RawAnnouncement>> {
        let mut all = Vec::new();
        let mut seen_urls = std::collections::HashSet::new();

        for (one, two) in CATEGORY_PAIRS {
            match self.fetch_category(one, two, limit).await {
                Ok(items) => {
                    // Categories overlap; keep the first occurrence of each article.
                    for ann in items {
                        if seen_urls.insert(ann.url.clone()) {
                            all.push(ann);
                        }
                    }
                }
                Err(e) => {
                    warn!(error = ?e, one_level_id = one, two_level_id = two, "htx category fetch failed");
                }
            }
        }
        sort_newest_first(&mut all);
        Ok(all)
    }
}

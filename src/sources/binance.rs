// src/sources/binance.rs
//! Binance CMS announcement API. Monitored catalogs: latest news (49),
//! delistings (161), wallet maintenance (157). The list endpoint returns all
//! catalogs per page; we page until `limit` items per catalog.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::warn;

use crate::model::RawAnnouncement;
use crate::sources::{http_client, sort_newest_first, AnnouncementSource};

const LIST_API: &str =
    "https://www.binance.com/bapi/composite/v1/public/cms/article/list/query";
const MAX_PAGE_SIZE: usize = 20;

const CATALOG_IDS: &[i64] = &[49, 161, 157];

#[derive(Debug, Deserialize)]
struct ApiResponse {
    code: String,
    data: Option<ApiData>,
}

#[derive(Debug, Deserialize)]
struct ApiData {
    #[serde(default)]
    catalogs: Vec<Catalog>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Catalog {
    catalog_id: i64,
    #[serde(default)]
    articles: Vec<Article>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Article {
    title: Option<String>,
    code: Option<String>,
    release_date: Option<i64>,
}

pub struct BinanceSource {
    client: reqwest::Client,
    catalog_ids: Vec<i64>,
}

impl BinanceSource {
    pub fn new(timeout_secs: u64) -> Result<Self> {
        Ok(Self {
            client: http_client(timeout_secs)?,
            catalog_ids: CATALOG_IDS.to_vec(),
        })
    }

    async fn fetch_page(&self, page_no: usize, page_size: usize) -> Result<Vec<Catalog>> {
        let resp: ApiResponse = self
            .client
            .get(LIST_API)
            .query(&[
                ("type", "1".to_string()),
                ("pageNo", page_no.to_string()),
                ("pageSize", page_size.min(MAX_PAGE_SIZE).to_string()),
            ])
            .send()
            .await
            .context("binance list request")?
            .error_for_status()
            .context("binance list non-2xx")?
            .json()
            .await
            .context("binance list json")?;

        if resp.code != "000000" {
            return Err(anyhow!("binance api error code: {}", resp.code));
        }
        let data = resp.data.ok_or_else(|| anyhow!("binance api returned no data"))?;
        if data.catalogs.is_empty() {
            return Err(anyhow!("binance api returned no catalogs"));
        }
        Ok(data.catalogs)
    }

    async fn fetch_catalog(&self, catalog_id: i64, limit: usize) -> Result<Vec<RawAnnouncement>> {
        let mut articles: Vec<Article> = Vec::new();
        let pages = limit.div_ceil(MAX_PAGE_SIZE);

        for page_no in 1..=pages {
            let remaining = limit - articles.len();
            if remaining == 0 {
                break;
            }
            let page = match self.fetch_page(page_no, remaining).await {
                Ok(catalogs) => catalogs,
                // Keep what we already have once the first page is in.
                Err(e) if page_no > 1 => {
                    warn!(error = ?e, page_no, "binance paging stopped early");
                    break;
                }
                Err(e) => return Err(e),
            };
            let Some(catalog) = page.into_iter().find(|c| c.catalog_id == catalog_id) else {
                return Err(anyhow!("catalog {catalog_id} missing from binance response"));
            };
            let got = catalog.articles.len();
            articles.extend(catalog.articles);
            if got < remaining.min(MAX_PAGE_SIZE) {
                break;
            }
        }

        articles.truncate(limit);
        Ok(articles.into_iter().filter_map(parse_article).collect())
    }
}

fn parse_article(article: Article) -> Option<RawAnnouncement> {
    let title = article.title.as_deref().map(str::trim).unwrap_or_default();
    if title.is_empty() {
        warn!("binance article without title skipped");
        return None;
    }
    let published_at = article
        .release_date
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .unwrap_or_else(Utc::now);
    let code = article.code.unwrap_or_default();

    Some(RawAnnouncement {
        exchange: "Binance".to_string(),
        title: title.to_string(),
        published_at,
        url: format!("https://www.binance.com/zh-CN/support/announcement/{code}"),
    })
}

#[async_trait]
impl AnnouncementSource for BinanceSource {
    fn exchange(&self) -> &'static str {
        "Binance"
    }

    async fn fetch_latest(&self, limit: usize) -> Result<Vec<RawAnnouncement>> {
        let mut all = Vec::new();
        for &catalog_id in &self.catalog_ids {
            match self.fetch_catalog(catalog_id, limit).await {
                Ok(mut items) => all.append(&mut items),
                Err(e) => {
                    warn!(error = ?e, catalog_id, "binance catalog fetch failed");
                }
            }
        }
        sort_newest_first(&mut all);
        Ok(all)
    }
}

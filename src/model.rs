// src/model.rs
use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Announcement as produced by an exchange adapter, before tagging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawAnnouncement {
    pub exchange: String,
    pub title: String,
    pub published_at: DateTime<Utc>,
    pub url: String,
}

/// A raw announcement plus the tag assigned by the rule engine
/// (`None` = no rule matched).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Announcement {
    pub exchange: String,
    pub title: String,
    pub published_at: DateTime<Utc>,
    pub url: String,
    pub tag: Option<String>,
}

impl Announcement {
    pub fn from_raw(raw: RawAnnouncement, tag: Option<String>) -> Self {
        Self {
            exchange: raw.exchange,
            title: raw.title,
            published_at: raw.published_at,
            url: raw.url,
            tag,
        }
    }

    pub fn published_at_local(&self) -> DateTime<Local> {
        self.published_at.with_timezone(&Local)
    }

    /// Identity key: the dedup/ledger fingerprint of this announcement.
    pub fn identity_key(&self) -> String {
        identity_key(&self.exchange, &self.title, self.published_at, &self.url)
    }
}

/// Version of the fingerprint layout below. Bumping it (and the layout)
/// invalidates every key already persisted in a ledger file.
pub const FINGERPRINT_VERSION: u32 = 1;

/// Stable fingerprint of an announcement, used as the ledger key.
///
/// Pure function of the semantically-unique fields: the same
/// exchange/title/time/url always yields the same key, across restarts.
pub fn identity_key(exchange: &str, title: &str, published_at: DateTime<Utc>, url: &str) -> String {
    let unique = format!(
        "{}-{}-{}-{}",
        exchange,
        title,
        published_at.to_rfc3339(),
        url
    );
    let mut hasher = Sha256::new();
    hasher.update(unique.as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(64);
    for b in digest.iter() {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{b:02x}");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 11, 23, 10, 0, 0).unwrap()
    }

    #[test]
    fn identical_fields_yield_identical_keys() {
        let a = identity_key("Binance", "Will List ABC", ts(), "https://x/1");
        let b = identity_key("Binance", "Will List ABC", ts(), "https://x/1");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn any_field_change_changes_the_key() {
        let base = identity_key("Binance", "Will List ABC", ts(), "https://x/1");
        assert_ne!(base, identity_key("OKX", "Will List ABC", ts(), "https://x/1"));
        assert_ne!(base, identity_key("Binance", "Will List XYZ", ts(), "https://x/1"));
        assert_ne!(base, identity_key("Binance", "Will List ABC", ts(), "https://x/2"));
    }

    #[test]
    fn announcement_key_matches_free_function() {
        let ann = Announcement {
            exchange: "Binance".into(),
            title: "币安将上线 TEST/USDT 交易对".into(),
            published_at: ts(),
            url: "https://www.binance.com/test".into(),
            tag: Some("listing".into()),
        };
        // Tag plays no part in identity.
        let mut untagged = ann.clone();
        untagged.tag = None;
        assert_eq!(ann.identity_key(), untagged.identity_key());
    }
}

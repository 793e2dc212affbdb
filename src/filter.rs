// src/filter.rs
//! Interest filter: decides whether a tagged announcement proceeds to
//! delivery. Pure, no I/O.

use std::collections::HashSet;

use crate::model::Announcement;

#[derive(Debug, Clone, Default)]
pub struct InterestFilter {
    allowed_tags: HashSet<String>,
    allow_untagged: bool,
}

impl InterestFilter {
    pub fn new<I, S>(allowed_tags: I, allow_untagged: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed_tags: allowed_tags.into_iter().map(Into::into).collect(),
            allow_untagged,
        }
    }

    /// True iff the tag is present and allowed, or absent and untagged
    /// announcements are allowed.
    pub fn should_deliver(&self, ann: &Announcement) -> bool {
        match &ann.tag {
            Some(tag) => self.allowed_tags.contains(tag),
            None => self.allow_untagged,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn ann(tag: Option<&str>) -> Announcement {
        Announcement {
            exchange: "Binance".into(),
            title: "t".into(),
            published_at: Utc::now(),
            url: "https://x/1".into(),
            tag: tag.map(str::to_owned),
        }
    }

    #[test]
    fn tagged_and_allowed_passes() {
        let f = InterestFilter::new(["delist"], false);
        assert!(f.should_deliver(&ann(Some("delist"))));
    }

    #[test]
    fn tagged_but_not_allowed_is_dropped() {
        let f = InterestFilter::new(["delist"], false);
        assert!(!f.should_deliver(&ann(Some("listing"))));
    }

    #[test]
    fn untagged_with_allow_untagged_passes() {
        let f = InterestFilter::new(["delist"], true);
        assert!(f.should_deliver(&ann(None)));
    }

    #[test]
    fn untagged_without_allow_untagged_is_dropped() {
        let f = InterestFilter::new(["delist"], false);
        assert!(!f.should_deliver(&ann(None)));
    }
}

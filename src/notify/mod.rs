// src/notify/mod.rs
pub mod feishu;

use anyhow::Result;
use async_trait::async_trait;

use crate::model::Announcement;

/// Downstream notification channel. A non-2xx response or a vendor-level
/// error code is an `Err`, so the caller can leave the item unrecorded and
/// retry it on the next cycle.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, ann: &Announcement) -> Result<()>;
}

pub use feishu::FeishuNotifier;

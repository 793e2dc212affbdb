// src/lib.rs
// Public library surface for integration tests (and potential reuse).

pub mod config;
pub mod filter;
pub mod ledger;
pub mod model;
pub mod monitor;
pub mod tagger;

// External collaborators: exchange feeds & the notification webhook.
pub mod notify;
pub mod sources;

// ---- Re-exports for stable public API ----
pub use crate::config::AppConfig;
pub use crate::filter::InterestFilter;
pub use crate::ledger::SentLedger;
pub use crate::model::{Announcement, RawAnnouncement};
pub use crate::monitor::{CycleStats, Monitor};
pub use crate::notify::Notifier;
pub use crate::sources::AnnouncementSource;

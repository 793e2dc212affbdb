// tests/ledger_restart.rs
// Dedup state must survive a process restart: a monitor rebuilt over the
// same history file skips what the previous instance delivered.

use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use tokio::sync::watch;

use announce_monitor::config::{MonitorConfig, RuleConfig};
use announce_monitor::filter::InterestFilter;
use announce_monitor::ledger::SentLedger;
use announce_monitor::model::{Announcement, RawAnnouncement};
use announce_monitor::monitor::Monitor;
use announce_monitor::notify::Notifier;
use announce_monitor::sources::AnnouncementSource;
use announce_monitor::tagger::compile_rules;

struct OneItemSource;

#[async_trait]
impl AnnouncementSource for OneItemSource {
    fn exchange(&self) -> &'static str {
        "Binance"
    }
    async fn fetch_latest(&self, _limit: usize) -> Result<Vec<RawAnnouncement>> {
        Ok(vec![RawAnnouncement {
            exchange: "Binance".to_string(),
            title: "Notice on Token XYZ Delisting".to_string(),
            published_at: Utc.with_ymd_and_hms(2024, 11, 23, 10, 0, 0).unwrap(),
            url: "https://b/1".to_string(),
        }])
    }
}

struct CountingNotifier(Mutex<usize>);

#[async_trait]
impl Notifier for &'static CountingNotifier {
    async fn send(&self, _ann: &Announcement) -> Result<()> {
        *self.0.lock().unwrap() += 1;
        Ok(())
    }
}

fn build_monitor(history: &std::path::Path, notifier: &'static CountingNotifier) -> Monitor {
    let rules = compile_rules(&[RuleConfig {
        tag: "delist".into(),
        case_sensitive: false,
        patterns: vec!["delist".into()],
    }])
    .unwrap();
    let cfg = MonitorConfig {
        init_history_on_first_run: false,
        max_cycles: 1,
        interval_secs: 0,
        jitter_secs: 0,
        fetch_limit: 10,
        notify_delay_ms: 0,
        history_file: history.to_string_lossy().into_owned(),
    };
    Monitor::new(
        vec![Box::new(OneItemSource)],
        rules,
        InterestFilter::new(["delist"], false),
        SentLedger::open(history).unwrap(),
        Box::new(notifier),
        cfg,
    )
}

#[tokio::test]
async fn restart_does_not_redeliver_recorded_items() {
    let dir = tempfile::tempdir().unwrap();
    let history = dir.path().join("sent_history.txt");
    let notifier: &'static CountingNotifier =
        Box::leak(Box::new(CountingNotifier(Mutex::new(0))));

    let (_tx, rx) = watch::channel(false);

    // First process lifetime: delivers and records.
    let mut first = build_monitor(&history, notifier);
    first.run(rx.clone()).await.unwrap();
    assert_eq!(*notifier.0.lock().unwrap(), 1);
    drop(first);

    // Second lifetime over the same file: key is known, sink never called.
    let mut second = build_monitor(&history, notifier);
    second.run(rx).await.unwrap();
    assert_eq!(*notifier.0.lock().unwrap(), 1);
    assert_eq!(second.ledger().len(), 1);
}

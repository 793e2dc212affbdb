// src/monitor.rs
//! Polling loop: fetch from every source, tag, filter, deliver, sleep with
//! jitter, repeat. Cycles never overlap; the ledger is exclusively owned
//! here, so the delivering phase needs no locking.

use std::time::Duration;

use anyhow::Result;
use metrics::{counter, describe_counter, describe_gauge, gauge};
use once_cell::sync::OnceCell;
use rand::Rng;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::config::MonitorConfig;
use crate::filter::InterestFilter;
use crate::ledger::SentLedger;
use crate::model::RawAnnouncement;
use crate::notify::Notifier;
use crate::sources::AnnouncementSource;
use crate::tagger::{tag_announcement, TagRule};

fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("monitor_fetched_total", "Announcements fetched from all sources.");
        describe_counter!("monitor_source_errors_total", "Per-source fetch failures.");
        describe_counter!("monitor_delivered_total", "Announcements pushed to the sink.");
        describe_counter!("monitor_filtered_total", "Announcements dropped by the interest filter.");
        describe_counter!("monitor_skipped_total", "Announcements skipped as already delivered.");
        describe_counter!("monitor_delivery_errors_total", "Sink failures (retried next cycle).");
        describe_gauge!("monitor_ledger_size", "Keys in the delivery ledger.");
        describe_gauge!("monitor_last_cycle_ts", "Unix ts when the last cycle finished.");
    });
}

/// Per-cycle outcome counts, logged and also exposed for tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleStats {
    pub fetched: usize,
    pub delivered: usize,
    pub filtered: usize,
    pub skipped: usize,
    pub failed: usize,
}

pub struct Monitor {
    sources: Vec<Box<dyn AnnouncementSource>>,
    rules: Vec<TagRule>,
    filter: InterestFilter,
    ledger: SentLedger,
    notifier: Box<dyn Notifier>,
    cfg: MonitorConfig,
}

impl Monitor {
    pub fn new(
        sources: Vec<Box<dyn AnnouncementSource>>,
        rules: Vec<TagRule>,
        filter: InterestFilter,
        ledger: SentLedger,
        notifier: Box<dyn Notifier>,
        cfg: MonitorConfig,
    ) -> Self {
        ensure_metrics_described();
        Self {
            sources,
            rules,
            filter,
            ledger,
            notifier,
            cfg,
        }
    }

    pub fn ledger(&self) -> &SentLedger {
        &self.ledger
    }

    /// Fetch from every configured source in config order. A failing source
    /// contributes zero items and never aborts the others.
    async fn fetch_all(&self) -> Vec<RawAnnouncement> {
        let mut all = Vec::new();
        for source in &self.sources {
            match source.fetch_latest(self.cfg.fetch_limit).await {
                Ok(items) => {
                    info!(exchange = source.exchange(), count = items.len(), "fetched announcements");
                    all.extend(items);
                }
                Err(e) => {
                    warn!(exchange = source.exchange(), error = ?e, "source fetch failed");
                    counter!("monitor_source_errors_total").increment(1);
                }
            }
        }
        counter!("monitor_fetched_total").increment(all.len() as u64);
        all
    }

    /// First-run baseline: mark everything currently visible as delivered
    /// without notifying, so a cold start does not replay history. Returns
    /// true when the baseline ran.
    pub async fn bootstrap_if_first_run(&mut self) -> Result<bool> {
        if !self.cfg.init_history_on_first_run || !self.ledger.is_empty() {
            return Ok(false);
        }
        let raw = self.fetch_all().await;
        let keys: Vec<String> = raw
            .into_iter()
            .map(|r| tag_announcement(r, &self.rules).identity_key())
            .collect();
        let added = self.ledger.bootstrap(keys)?;
        info!(added, "first run: ledger baseline initialized, nothing delivered");
        gauge!("monitor_ledger_size").set(self.ledger.len() as f64);
        Ok(true)
    }

    /// One full cycle: fetch → tag → filter → deliver. Sink failures leave
    /// the key unrecorded (retried next cycle); ledger write failures are
    /// fatal, since losing dedup state risks re-notifying all history.
    pub async fn run_cycle(&mut self, shutdown: &watch::Receiver<bool>) -> Result<CycleStats> {
        let raw = self.fetch_all().await;
        let mut stats = CycleStats {
            fetched: raw.len(),
            ..CycleStats::default()
        };

        let delay = Duration::from_millis(self.cfg.notify_delay_ms);
        let mut delivered_before = false;

        for raw_item in raw {
            let ann = tag_announcement(raw_item, &self.rules);

            if !self.filter.should_deliver(&ann) {
                stats.filtered += 1;
                counter!("monitor_filtered_total").increment(1);
                continue;
            }

            let key = ann.identity_key();
            if self.ledger.contains(&key) {
                stats.skipped += 1;
                counter!("monitor_skipped_total").increment(1);
                continue;
            }

            // Rate-limit spacing between successive pushes.
            if delivered_before && !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }

            match self.notifier.send(&ann).await {
                Ok(()) => {
                    self.ledger.record(&key)?;
                    stats.delivered += 1;
                    delivered_before = true;
                    counter!("monitor_delivered_total").increment(1);
                    info!(exchange = %ann.exchange, tag = ?ann.tag, title = %ann.title, "delivered");
                }
                Err(e) => {
                    // Key stays unrecorded: the item is retried next cycle.
                    stats.failed += 1;
                    counter!("monitor_delivery_errors_total").increment(1);
                    warn!(exchange = %ann.exchange, error = ?e, "delivery failed, will retry next cycle");
                }
            }

            // Clean shutdown lets the in-flight item finish, then stops.
            if *shutdown.borrow() {
                info!("shutdown requested, ending cycle at item boundary");
                break;
            }
        }

        gauge!("monitor_ledger_size").set(self.ledger.len() as f64);
        gauge!("monitor_last_cycle_ts").set(chrono::Utc::now().timestamp() as f64);
        info!(
            fetched = stats.fetched,
            delivered = stats.delivered,
            filtered = stats.filtered,
            skipped = stats.skipped,
            failed = stats.failed,
            sent_total = self.ledger.len(),
            "cycle finished"
        );
        Ok(stats)
    }

    fn jittered_wait(&self) -> Duration {
        let jitter = self.cfg.jitter_secs as i64;
        let offset = if jitter > 0 {
            rand::rng().random_range(-jitter..=jitter)
        } else {
            0
        };
        Duration::from_secs((self.cfg.interval_secs as i64 + offset).max(0) as u64)
    }

    /// Main loop. Runs until `max_cycles` is reached (0 = forever) or the
    /// shutdown signal flips; an in-flight sleep is interrupted immediately.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        self.bootstrap_if_first_run().await?;

        let mut cycles: u64 = 0;
        loop {
            if *shutdown.borrow() {
                break;
            }
            self.run_cycle(&shutdown).await?;
            cycles += 1;

            if self.cfg.max_cycles > 0 && cycles >= self.cfg.max_cycles {
                info!(cycles, "max cycle count reached");
                break;
            }

            let wait = self.jittered_wait();
            info!(wait_secs = wait.as_secs(), "sleeping until next cycle");
            tokio::select! {
                _ = tokio::time::sleep(wait) => {}
                _ = shutdown.changed() => {}
            }
            if *shutdown.borrow() {
                break;
            }
        }

        info!(cycles, sent_total = self.ledger.len(), "monitor stopped");
        Ok(())
    }
}

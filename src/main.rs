//! Announcement Monitor — Binary Entrypoint
//! Loads config, wires sources + tagger + filter + ledger + Feishu webhook,
//! and drives the polling loop until Ctrl-C or the configured cycle count.

use anyhow::{Context, Result};
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use announce_monitor::config::AppConfig;
use announce_monitor::filter::InterestFilter;
use announce_monitor::ledger::SentLedger;
use announce_monitor::monitor::Monitor;
use announce_monitor::notify::FeishuNotifier;
use announce_monitor::sources::build_sources;
use announce_monitor::tagger::compile_rules;

const ENV_CONFIG_PATH: &str = "ANNOUNCE_CONFIG";

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("announce_monitor=info,warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

fn config_path() -> String {
    std::env::args()
        .nth(1)
        .or_else(|| std::env::var(ENV_CONFIG_PATH).ok())
        .unwrap_or_else(|| "config.toml".to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present (FEISHU_WEBHOOK_URL etc.); no-op otherwise.
    let _ = dotenvy::dotenv();
    init_tracing();

    let path = config_path();
    let cfg = AppConfig::load(&path).with_context(|| format!("loading config {path}"))?;

    // All of this is fail-fast: a half-configured monitor must not start.
    let rules = compile_rules(&cfg.tag_rules).context("compiling tag rules")?;
    let filter = InterestFilter::new(cfg.filter.allowed_tags.clone(), cfg.filter.allow_untagged);
    let ledger = SentLedger::open(&cfg.monitor.history_file)?;
    let notifier = FeishuNotifier::from_config(
        cfg.notify.webhook_url.as_deref(),
        cfg.notify.timeout_secs,
    )?;
    let sources = build_sources(&cfg.sources)?;

    info!(
        config = %path,
        sources = sources.len(),
        rules = rules.len(),
        allowed_tags = ?cfg.filter.allowed_tags,
        "announcement monitor starting"
    );

    let mut monitor = Monitor::new(
        sources,
        rules,
        filter,
        ledger,
        Box::new(notifier),
        cfg.monitor.clone(),
    );

    // Ctrl-C flips the shutdown flag; the loop finishes its in-flight item
    // and exits at the next boundary.
    let (stop_tx, stop_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, shutting down");
            let _ = stop_tx.send(true);
        }
    });

    monitor.run(stop_rx).await
}

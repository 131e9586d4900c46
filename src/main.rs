//! Market Watcher — Binary Entrypoint
//! One batch run: source fresh articles per keyword, generate styled briefs,
//! deliver archive + email, record delivered URLs for cross-run dedup.

use anyhow::{Context, Result};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use market_watcher::generate::image::build_image_maker;
use market_watcher::generate::build_generator;
use market_watcher::notify::{ArchiveDelivery, Delivery, EmailDelivery, EmailSender};
use market_watcher::source::google_rss::GoogleNewsRss;
use market_watcher::{Orchestrator, WatcherConfig};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("market_watcher=info,warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in local/dev; no-op when variables come from the environment.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = WatcherConfig::load_default().context("loading watcher config")?;
    anyhow::ensure!(!cfg.keywords.is_empty(), "config has no keywords to watch");

    let mock_mode = std::env::var("AI_TEST_MODE")
        .map(|v| v == "mock")
        .unwrap_or(false);
    if !cfg.ai.enabled && !mock_mode {
        tracing::warn!("generation is disabled in config; every keyword will end in a failed state");
    }

    let source = GoogleNewsRss::from_http(cfg.recency_hours).context("building news source")?;
    let generator = build_generator(&cfg);
    let artist = build_image_maker(&cfg);

    let mut deliverers: Vec<Box<dyn Delivery>> = Vec::new();
    if let Some(path) = &cfg.archive_path {
        deliverers.push(Box::new(ArchiveDelivery::new(path)));
    }
    match EmailSender::from_env() {
        Ok(sender) => deliverers.push(Box::new(EmailDelivery::new(sender))),
        Err(e) => tracing::info!(reason = %e, "email delivery not configured"),
    }

    let report = Orchestrator::new(cfg, Box::new(source), generator, artist, deliverers)
        .run()
        .await;

    for item in &report.items {
        tracing::info!(
            keyword = item.keyword,
            status = ?item.status,
            reason = item.reason.as_ref().map(|r| r.to_string()).unwrap_or_default(),
            "result"
        );
    }
    tracing::info!(
        published = report.published_count(),
        skipped = report.skipped_count(),
        failed = report.failed_count(),
        delivery_errors = report.delivery_failures.len(),
        "run complete"
    );

    Ok(())
}

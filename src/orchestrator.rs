//! Run orchestrator: loads the history once, walks the keyword list strictly
//! sequentially, persists the history exactly once after the loop, then hands
//! the report to the delivery collaborators.

use std::time::Duration;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge};
use once_cell::sync::OnceCell;

use crate::config::WatcherConfig;
use crate::generate::image::ImageMaker;
use crate::generate::Generator;
use crate::history::HistoryStore;
use crate::notify::Delivery;
use crate::pipeline::ItemPipeline;
use crate::report::{DeliveryFailure, ItemStatus, RunReport};
use crate::retry::Retrier;
use crate::source::NewsSource;

/// One-time metrics registration.
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("watcher_items_total", "Keywords processed.");
        describe_counter!("watcher_published_total", "Items reaching published.");
        describe_counter!(
            "watcher_skipped_duplicate_total",
            "Items skipped as already delivered."
        );
        describe_counter!("watcher_failed_total", "Items ending in a failed state.");
        describe_counter!("watcher_retry_attempts_total", "Failed generation attempts.");
        describe_counter!("watcher_source_events_total", "Feed items parsed.");
        describe_counter!("watcher_source_errors_total", "Feed fetch/parse errors.");
        describe_counter!("watcher_delivery_errors_total", "Report delivery errors.");
        describe_histogram!("watcher_source_parse_ms", "Feed parse time in milliseconds.");
        describe_gauge!("watcher_last_run_ts", "Unix ts when the last run finished.");
    });
}

pub struct Orchestrator {
    cfg: WatcherConfig,
    source: Box<dyn NewsSource>,
    generator: Box<dyn Generator>,
    artist: Option<Box<dyn ImageMaker>>,
    deliverers: Vec<Box<dyn Delivery>>,
    history: HistoryStore,
}

impl Orchestrator {
    pub fn new(
        cfg: WatcherConfig,
        source: Box<dyn NewsSource>,
        generator: Box<dyn Generator>,
        artist: Option<Box<dyn ImageMaker>>,
        deliverers: Vec<Box<dyn Delivery>>,
    ) -> Self {
        let history = HistoryStore::load(&cfg.history_path);
        Self {
            cfg,
            source,
            generator,
            artist,
            deliverers,
            history,
        }
    }

    pub async fn run(mut self) -> RunReport {
        ensure_metrics_described();
        let mut report = RunReport::new();

        let pipeline = ItemPipeline {
            cfg: &self.cfg,
            source: self.source.as_ref(),
            generator: self.generator.as_ref(),
            artist: self.artist.as_deref(),
            retrier: Retrier::new(
                self.cfg.max_attempts,
                Duration::from_secs(self.cfg.base_delay_secs),
            ),
        };

        for (i, keyword) in self.cfg.keywords.iter().enumerate() {
            let item = pipeline.process(keyword, &mut self.history).await;
            tracing::info!(
                keyword,
                status = ?item.status,
                reason = item.reason.as_ref().map(|r| r.to_string()).unwrap_or_default(),
                "keyword processed"
            );
            report.items.push(item);

            // Cooperative pause between items to be gentle on providers.
            if self.cfg.pause_secs > 0 && i + 1 < self.cfg.keywords.len() {
                tokio::time::sleep(Duration::from_secs(self.cfg.pause_secs)).await;
            }
        }

        gauge!("watcher_last_run_ts").set(chrono::Utc::now().timestamp() as f64);

        // Exactly one persist per run, after all record() calls. A failed
        // persist is logged; delivery still proceeds.
        if let Err(e) = self.history.persist() {
            tracing::error!(error = %e, "history persist failed; items may resurface next run");
        }

        for d in &self.deliverers {
            if let Err(e) = d.deliver(&report).await {
                counter!("watcher_delivery_errors_total").increment(1);
                tracing::warn!(channel = d.name(), error = %e, "delivery failed");
                report.delivery_failures.push(DeliveryFailure {
                    channel: d.name().to_string(),
                    error: e.to_string(),
                });
            }
        }

        debug_assert!(report.items.iter().all(|it| it.status.is_terminal()));
        debug_assert!(report
            .items
            .iter()
            .filter(|it| it.status == ItemStatus::Published)
            .all(|it| it
                .result
                .as_ref()
                .is_some_and(|r| !r.variants.is_empty())));

        report
    }
}

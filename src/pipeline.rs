//! Per-keyword item state machine:
//! `pending -> sourced -> generating -> {published | failed | skipped-duplicate}`.
//!
//! Every outcome is data on the returned `PipelineItem`; nothing here aborts
//! the run. History is mutated only on the published path.

use metrics::counter;

use crate::config::WatcherConfig;
use crate::generate::image::ImageMaker;
use crate::generate::{parser, render_prompt, Generator};
use crate::history::HistoryStore;
use crate::report::{FailReason, GeneratedResult, ItemStatus, PipelineItem};
use crate::retry::Retrier;
use crate::source::{select_most_recent, NewsSource};

pub struct ItemPipeline<'a> {
    pub cfg: &'a WatcherConfig,
    pub source: &'a dyn NewsSource,
    pub generator: &'a dyn Generator,
    pub artist: Option<&'a dyn ImageMaker>,
    pub retrier: Retrier,
}

impl ItemPipeline<'_> {
    /// Drive one keyword to a terminal status.
    pub async fn process(&self, keyword: &str, history: &mut HistoryStore) -> PipelineItem {
        let mut item = PipelineItem::new(keyword);
        counter!("watcher_items_total").increment(1);

        // pending -> sourced: pick the single most recent item. A provider
        // error is downgraded to "no items"; the run must go on.
        let fetched = match self
            .source
            .fetch_latest(keyword, self.cfg.per_keyword_cap)
            .await
        {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(keyword, source = self.source.name(), error = %e, "source error");
                counter!("watcher_source_errors_total").increment(1);
                Vec::new()
            }
        };
        let Some(article) = select_most_recent(fetched) else {
            item.fail(FailReason::SourceNotFound);
            counter!("watcher_failed_total").increment(1);
            return item;
        };
        item.status = ItemStatus::Sourced;
        item.sourced = Some(article.clone());

        // Already delivered in a past run: a distinct terminal state, not a
        // failure, so failure counts stay meaningful.
        if history.contains(&article.url) {
            tracing::info!(keyword, url = %article.url, "duplicate item skipped");
            item.status = ItemStatus::SkippedDuplicate;
            counter!("watcher_skipped_duplicate_total").increment(1);
            return item;
        }

        // Generation, wrapped in the retrier. All styles in one call; the
        // parser preserves partial results.
        item.status = ItemStatus::Generating;
        let prompt = render_prompt(&article, &self.cfg.styles);
        let raw = match self
            .retrier
            .run("generate", || self.generator.generate(&prompt))
            .await
        {
            Ok(raw) => raw,
            Err(exhausted) => {
                item.fail(FailReason::Generation(exhausted.to_string()));
                counter!("watcher_failed_total").increment(1);
                return item;
            }
        };

        let style_names: Vec<String> =
            self.cfg.styles.iter().map(|s| s.name.clone()).collect();
        let variants = match parser::parse_styled_output(&raw, &style_names) {
            Ok(v) => v,
            Err(_) => {
                item.fail(FailReason::Parse);
                counter!("watcher_failed_total").increment(1);
                return item;
            }
        };

        let mut result = GeneratedResult {
            item: article,
            variants,
            image_url: None,
        };

        // Auxiliary artifact is best-effort: its failure never demotes the
        // item from published.
        if let Some(artist) = self.artist {
            if let Some(prompt) = result
                .variants
                .values()
                .find_map(|v| v.image_prompt.clone())
            {
                match artist.create(&prompt).await {
                    Ok(url) => result.image_url = Some(url),
                    Err(e) => {
                        tracing::warn!(keyword, maker = artist.name(), error = %e, "image stage failed; continuing without artifact");
                    }
                }
            }
        }

        history.record(&result.item.url);
        item.result = Some(result);
        item.status = ItemStatus::Published;
        counter!("watcher_published_total").increment(1);
        item
    }
}

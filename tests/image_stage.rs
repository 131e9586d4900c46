// tests/image_stage.rs
// The auxiliary image stage is best-effort: it can attach an artifact but can
// never demote a published item.

use std::sync::atomic::AtomicU32;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use market_watcher::generate::image::ImageMaker;
use market_watcher::generate::Generator;
use market_watcher::report::ItemStatus;
use market_watcher::{NewsSource, Orchestrator, SourcedItem, StyleSpec, WatcherConfig};

struct OneItemSource;

#[async_trait]
impl NewsSource for OneItemSource {
    async fn fetch_latest(&self, keyword: &str, _cap: usize) -> Result<Vec<SourcedItem>> {
        Ok(vec![SourcedItem {
            keyword: keyword.to_string(),
            title: "headline".into(),
            url: "https://n.example/one".into(),
            published_at: 100,
        }])
    }

    fn name(&self) -> &'static str {
        "one-item"
    }
}

struct MarkerGenerator;

#[async_trait]
impl Generator for MarkerGenerator {
    async fn generate(&self, _prompt: &str) -> Result<String> {
        Ok("---FLASH_TEXT---\nBig news.\n---FLASH_PROMPT---\nA lightning bolt.\n".into())
    }

    fn name(&self) -> &'static str {
        "marker"
    }
}

struct FixedImageMaker;

#[async_trait]
impl ImageMaker for FixedImageMaker {
    async fn create(&self, _prompt: &str) -> Result<String> {
        Ok("https://img.example/fixed.png".into())
    }

    fn name(&self) -> &'static str {
        "fixed-images"
    }
}

struct BrokenImageMaker {
    calls: Arc<AtomicU32>,
}

#[async_trait]
impl ImageMaker for BrokenImageMaker {
    async fn create(&self, _prompt: &str) -> Result<String> {
        self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        anyhow::bail!("image endpoint down")
    }

    fn name(&self) -> &'static str {
        "broken-images"
    }
}

fn cfg(history_path: &std::path::Path) -> WatcherConfig {
    WatcherConfig {
        keywords: vec!["A".into()],
        styles: vec![StyleSpec {
            name: "flash".into(),
            guide: "punchy".into(),
        }],
        max_attempts: 1,
        base_delay_secs: 0,
        per_keyword_cap: 5,
        recency_hours: 24,
        pause_secs: 0,
        history_path: history_path.display().to_string(),
        archive_path: None,
        ai: Default::default(),
    }
}

#[tokio::test]
async fn successful_image_attaches_an_artifact_url() {
    let dir = tempfile::tempdir().unwrap();
    let report = Orchestrator::new(
        cfg(&dir.path().join("h.json")),
        Box::new(OneItemSource),
        Box::new(MarkerGenerator),
        Some(Box::new(FixedImageMaker)),
        vec![],
    )
    .run()
    .await;

    let result = report.items[0].result.as_ref().unwrap();
    assert_eq!(result.image_url.as_deref(), Some("https://img.example/fixed.png"));
}

#[tokio::test]
async fn image_failure_never_demotes_a_published_item() {
    let dir = tempfile::tempdir().unwrap();
    let calls = Arc::new(AtomicU32::new(0));
    let report = Orchestrator::new(
        cfg(&dir.path().join("h.json")),
        Box::new(OneItemSource),
        Box::new(MarkerGenerator),
        Some(Box::new(BrokenImageMaker {
            calls: calls.clone(),
        })),
        vec![],
    )
    .run()
    .await;

    let item = &report.items[0];
    assert_eq!(item.status, ItemStatus::Published);
    let result = item.result.as_ref().unwrap();
    assert!(result.image_url.is_none());
    assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 1);
}

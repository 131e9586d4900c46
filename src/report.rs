//! Data model for one run: per-item state, terminal reasons, and the run
//! report handed to delivery. Items are rebuilt fresh every run and never
//! persisted.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::source::SourcedItem;

/// Lifecycle of one keyword's item. `Published`, `Failed`, and
/// `SkippedDuplicate` are terminal; the rest are in-flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ItemStatus {
    Pending,
    Sourced,
    Generating,
    Published,
    Failed,
    SkippedDuplicate,
}

impl ItemStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ItemStatus::Published | ItemStatus::Failed | ItemStatus::SkippedDuplicate
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum FailReason {
    SourceNotFound,
    Generation(String),
    Parse,
}

impl fmt::Display for FailReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailReason::SourceNotFound => write!(f, "no source item found"),
            FailReason::Generation(e) => write!(f, "generation failed: {e}"),
            FailReason::Parse => write!(f, "no usable variants in model output"),
        }
    }
}

/// One stylistic rendering of an item's generated content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Variant {
    pub style: String,
    pub body: String,
    /// Auxiliary prompt for image derivation, when the model supplied one.
    pub image_prompt: Option<String>,
}

/// Exists only when generation produced at least one variant.
#[derive(Debug, Clone, Serialize)]
pub struct GeneratedResult {
    pub item: SourcedItem,
    pub variants: BTreeMap<String, Variant>,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineItem {
    pub keyword: String,
    pub status: ItemStatus,
    pub sourced: Option<SourcedItem>,
    pub result: Option<GeneratedResult>,
    pub reason: Option<FailReason>,
}

impl PipelineItem {
    pub fn new(keyword: &str) -> Self {
        Self {
            keyword: keyword.to_string(),
            status: ItemStatus::Pending,
            sourced: None,
            result: None,
            reason: None,
        }
    }

    pub fn fail(&mut self, reason: FailReason) {
        self.status = ItemStatus::Failed;
        self.reason = Some(reason);
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DeliveryFailure {
    pub channel: String,
    pub error: String,
}

/// Ordered run outcome, one entry per keyword in input order.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub items: Vec<PipelineItem>,
    pub delivery_failures: Vec<DeliveryFailure>,
}

impl RunReport {
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            items: Vec::new(),
            delivery_failures: Vec::new(),
        }
    }

    pub fn published(&self) -> impl Iterator<Item = &PipelineItem> {
        self.items
            .iter()
            .filter(|it| it.status == ItemStatus::Published)
    }

    pub fn published_count(&self) -> usize {
        self.published().count()
    }

    pub fn skipped_count(&self) -> usize {
        self.items
            .iter()
            .filter(|it| it.status == ItemStatus::SkippedDuplicate)
            .count()
    }

    pub fn failed_count(&self) -> usize {
        self.items
            .iter()
            .filter(|it| it.status == ItemStatus::Failed)
            .count()
    }
}

impl Default for RunReport {
    fn default() -> Self {
        Self::new()
    }
}

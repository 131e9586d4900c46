// src/source/mod.rs
pub mod google_rss;

use anyhow::Result;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourcedItem {
    pub keyword: String,
    pub title: String,
    pub url: String,
    /// Unix seconds; 0 when the feed carried no parseable date.
    pub published_at: u64,
}

#[async_trait::async_trait]
pub trait NewsSource: Send + Sync {
    /// Fetch up to `cap` recent items for a keyword. Provider unavailability
    /// should surface as an error here; the pipeline downgrades it to "no
    /// items" rather than aborting the run.
    async fn fetch_latest(&self, keyword: &str, cap: usize) -> Result<Vec<SourcedItem>>;
    fn name(&self) -> &'static str;
}

/// Pick the most recent item by publish timestamp. Ties keep the earlier
/// entry, preserving the source's own ordering.
pub fn select_most_recent(items: Vec<SourcedItem>) -> Option<SourcedItem> {
    let mut best: Option<SourcedItem> = None;
    for it in items {
        match &best {
            Some(b) if it.published_at <= b.published_at => {}
            _ => best = Some(it),
        }
    }
    best
}

/// Normalize feed titles: decode HTML entities, strip tags, collapse
/// whitespace, trim.
pub fn normalize_title(s: &str) -> String {
    let mut out = html_escape::decode_html_entities(s).to_string();

    static RE_TAGS: once_cell::sync::OnceCell<regex::Regex> = once_cell::sync::OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, "").to_string();

    static RE_WS: once_cell::sync::OnceCell<regex::Regex> = once_cell::sync::OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").to_string();

    out.trim().to_string()
}

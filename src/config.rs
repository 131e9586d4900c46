//! Run configuration, loaded once at startup and immutable for the run.
//!
//! Lookup order: `$WATCHER_CONFIG_PATH`, then `config/watcher.toml`, then
//! `config/watcher.json`. Values are sanitized after parse (bounds clamped,
//! keyword list trimmed and deduplicated) so the rest of the crate can trust
//! them.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

pub const ENV_CONFIG_PATH: &str = "WATCHER_CONFIG_PATH";

/// One pre-declared output style: the name identifies the variant and shapes
/// its output markers; the guide is prose handed to the generation prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StyleSpec {
    pub name: String,
    pub guide: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    #[serde(default)]
    pub enabled: bool,
    /// "openai" (case-insensitive); anything else disables generation.
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Best-effort image derivation from a variant's auxiliary prompt.
    #[serde(default)]
    pub image_enabled: bool,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            provider: default_provider(),
            model: default_model(),
            image_enabled: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatcherConfig {
    pub keywords: Vec<String>,
    #[serde(default = "default_styles")]
    pub styles: Vec<StyleSpec>,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_base_delay_secs")]
    pub base_delay_secs: u64,
    #[serde(default = "default_per_keyword_cap")]
    pub per_keyword_cap: usize,
    #[serde(default = "default_recency_hours")]
    pub recency_hours: u64,
    /// Cooperative pause between items, not a correctness requirement.
    #[serde(default = "default_pause_secs")]
    pub pause_secs: u64,
    #[serde(default = "default_history_path")]
    pub history_path: String,
    #[serde(default = "default_archive_path")]
    pub archive_path: Option<String>,
    #[serde(default)]
    pub ai: AiConfig,
}

fn default_provider() -> String {
    "openai".to_string()
}
fn default_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_max_attempts() -> u32 {
    3
}
fn default_base_delay_secs() -> u64 {
    2
}
fn default_per_keyword_cap() -> usize {
    5
}
fn default_recency_hours() -> u64 {
    24
}
fn default_pause_secs() -> u64 {
    1
}
fn default_history_path() -> String {
    "news_history.json".to_string()
}
fn default_archive_path() -> Option<String> {
    Some("NEWS_ARCHIVE.md".to_string())
}

fn default_styles() -> Vec<StyleSpec> {
    vec![
        StyleSpec {
            name: "analysis".into(),
            guide: "A measured analytical take: what happened, why it matters, one risk to watch.".into(),
        },
        StyleSpec {
            name: "story".into(),
            guide: "A short narrative retelling with a clear arc, written for a general reader.".into(),
        },
        StyleSpec {
            name: "flash".into(),
            guide: "Two punchy sentences, headline energy, no hedging.".into(),
        },
    ]
}

impl WatcherConfig {
    /// Load using the env override, then the `config/` fallbacks.
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
            }
            return Self::load_from(&pb);
        }
        let toml_p = PathBuf::from("config/watcher.toml");
        if toml_p.exists() {
            return Self::load_from(&toml_p);
        }
        let json_p = PathBuf::from("config/watcher.json");
        if json_p.exists() {
            return Self::load_from(&json_p);
        }
        Err(anyhow!(
            "no watcher config found; create config/watcher.toml or set {ENV_CONFIG_PATH}"
        ))
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let mut cfg = parse_config(&content, &ext)?;
        cfg.sanitize();
        Ok(cfg)
    }

    fn sanitize(&mut self) {
        self.keywords = clean_keywords(std::mem::take(&mut self.keywords));
        self.styles.retain(|s| {
            !s.name.trim().is_empty() && !s.guide.trim().is_empty()
        });
        if self.styles.is_empty() {
            self.styles = default_styles();
        }
        self.max_attempts = self.max_attempts.max(1);
        self.per_keyword_cap = self.per_keyword_cap.max(1);
        self.ai.provider = self.ai.provider.to_lowercase();
        if let Some(p) = &self.archive_path {
            if p.trim().is_empty() {
                self.archive_path = None;
            }
        }
    }
}

fn parse_config(s: &str, hint_ext: &str) -> Result<WatcherConfig> {
    // Try TOML first if hinted or content looks like toml.
    let try_toml = hint_ext == "toml" || s.contains("keywords =");
    if try_toml {
        if let Ok(v) = toml::from_str(s) {
            return Ok(v);
        }
    }
    if let Ok(v) = serde_json::from_str(s) {
        return Ok(v);
    }
    if !try_toml {
        if let Ok(v) = toml::from_str(s) {
            return Ok(v);
        }
    }
    Err(anyhow!("unsupported config format (expected TOML or JSON)"))
}

/// Trim, drop empties, and deduplicate while preserving input order; keyword
/// order drives processing and report order.
fn clean_keywords(items: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::with_capacity(items.len());
    for it in items {
        let t = it.trim().to_string();
        if !t.is_empty() && seen.insert(t.clone()) {
            out.push(t);
        }
    }
    out
}

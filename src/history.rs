//! Durable URL history: the set of item links already delivered in past runs.
//!
//! Loading is fail-soft (a missing or corrupt file starts an empty set); the
//! whole set is written back exactly once per run, via a temp file + rename so
//! an interrupted write never clobbers the previous run's state.

use std::collections::HashSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct HistoryFile {
    #[serde(default)]
    urls: Vec<String>,
    #[serde(default)]
    last_updated: String,
}

#[derive(Debug)]
pub struct HistoryStore {
    path: PathBuf,
    seen: HashSet<String>,
}

impl HistoryStore {
    /// Load the history from `path`. No file yet, or a file we cannot parse,
    /// yields an empty set; a bad history must not abort the run.
    pub fn load<P: Into<PathBuf>>(path: P) -> Self {
        let path = path.into();
        let seen = match fs::read_to_string(&path) {
            Ok(s) => match serde_json::from_str::<HistoryFile>(&s) {
                Ok(file) => {
                    let set: HashSet<String> = file.urls.into_iter().collect();
                    tracing::info!(path = %path.display(), urls = set.len(), "history loaded");
                    set
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "corrupt history file; starting empty");
                    HashSet::new()
                }
            },
            Err(_) => {
                tracing::info!(path = %path.display(), "no history file; starting empty");
                HashSet::new()
            }
        };
        Self { path, seen }
    }

    pub fn contains(&self, url: &str) -> bool {
        self.seen.contains(url)
    }

    /// Idempotent: recording an already-known URL is a no-op.
    pub fn record(&mut self, url: &str) {
        self.seen.insert(url.to_string());
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    /// Write the full set plus a last-updated timestamp. Call at most once per
    /// run, after all `record` calls.
    pub fn persist(&self) -> Result<()> {
        let mut urls: Vec<String> = self.seen.iter().cloned().collect();
        urls.sort_unstable();
        let file = HistoryFile {
            urls,
            last_updated: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        };
        let json = serde_json::to_string_pretty(&file).context("serializing history")?;
        write_atomic(&self.path, json.as_bytes())
            .with_context(|| format!("writing history to {}", self.path.display()))?;
        tracing::info!(path = %self.path.display(), urls = self.seen.len(), "history persisted");
        Ok(())
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let tmp = path.with_extension("json.tmp");
    let mut f = fs::File::create(&tmp)?;
    f.write_all(bytes)?;
    fs::rename(tmp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let mut h = HistoryStore::load(dir.path().join("history.json"));
        assert!(h.is_empty());
        h.record("https://example.com/a");
        h.record("https://example.com/a");
        assert_eq!(h.len(), 1);
        assert!(h.contains("https://example.com/a"));
        assert!(!h.contains("https://example.com/b"));
    }

    #[test]
    fn persist_then_load_restores_membership() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");
        let mut h = HistoryStore::load(&path);
        h.record("https://example.com/b");
        h.record("https://example.com/a");
        h.persist().unwrap();

        let again = HistoryStore::load(&path);
        assert_eq!(again.len(), 2);
        assert!(again.contains("https://example.com/a"));
        assert!(again.contains("https://example.com/b"));
    }

    #[test]
    fn corrupt_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");
        fs::write(&path, "{not json at all").unwrap();
        let h = HistoryStore::load(&path);
        assert!(h.is_empty());
    }

    #[test]
    fn reads_files_regardless_of_url_ordering() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");
        fs::write(
            &path,
            r#"{"urls": ["https://z.example/1", "https://a.example/2"], "last_updated": "2026-01-01 00:00:00"}"#,
        )
        .unwrap();
        let h = HistoryStore::load(&path);
        assert!(h.contains("https://z.example/1"));
        assert!(h.contains("https://a.example/2"));
    }
}

//! Markdown archive delivery: each run's published briefs are prepended as a
//! dated section directly beneath the file's top heading, newest first.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use super::Delivery;
use crate::render;
use crate::report::RunReport;

const ARCHIVE_HEADER: &str = "# Market Watcher archive\n\n";

pub struct ArchiveWriter {
    path: PathBuf,
}

impl ArchiveWriter {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    pub fn prepend_section(&self, section: &str) -> Result<()> {
        let old = fs::read_to_string(&self.path).unwrap_or_else(|_| ARCHIVE_HEADER.to_string());
        let merged = match old.strip_prefix(ARCHIVE_HEADER) {
            Some(rest) => format!("{ARCHIVE_HEADER}{section}{rest}"),
            None => format!("{ARCHIVE_HEADER}{section}{old}"),
        };
        write_atomic(&self.path, merged.as_bytes())
            .with_context(|| format!("writing archive to {}", self.path.display()))
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let tmp = path.with_extension("md.tmp");
    let mut f = fs::File::create(&tmp)?;
    f.write_all(bytes)?;
    fs::rename(tmp, path)?;
    Ok(())
}

pub struct ArchiveDelivery {
    writer: ArchiveWriter,
}

impl ArchiveDelivery {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            writer: ArchiveWriter::new(path),
        }
    }
}

#[async_trait::async_trait]
impl Delivery for ArchiveDelivery {
    async fn deliver(&self, report: &RunReport) -> Result<()> {
        if report.published_count() == 0 {
            tracing::info!("nothing published; archive left untouched");
            return Ok(());
        }
        self.writer.prepend_section(&render::archive_section(report))
    }

    fn name(&self) -> &'static str {
        "archive"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sections_stack_newest_first_under_the_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ARCHIVE.md");
        let w = ArchiveWriter::new(&path);

        w.prepend_section("## 2026-08-22\n\nolder\n\n---\n\n").unwrap();
        w.prepend_section("## 2026-08-23\n\nnewer\n\n---\n\n").unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with(ARCHIVE_HEADER));
        let newer = content.find("2026-08-23").unwrap();
        let older = content.find("2026-08-22").unwrap();
        assert!(newer < older);
    }

    #[test]
    fn foreign_file_content_is_kept_below_the_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ARCHIVE.md");
        fs::write(&path, "hand-written notes\n").unwrap();

        ArchiveWriter::new(&path)
            .prepend_section("## 2026-08-23\n\n---\n\n")
            .unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with(ARCHIVE_HEADER));
        assert!(content.contains("hand-written notes"));
    }
}

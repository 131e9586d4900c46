// src/lib.rs
// Public library surface for integration tests (and the watcher binary).

pub mod config;
pub mod generate;
pub mod history;
pub mod notify;
pub mod orchestrator;
pub mod pipeline;
pub mod render;
pub mod report;
pub mod retry;
pub mod source;

// ---- Re-exports for stable public API ----
pub use crate::config::{StyleSpec, WatcherConfig};
pub use crate::history::HistoryStore;
pub use crate::orchestrator::Orchestrator;
pub use crate::report::{FailReason, ItemStatus, PipelineItem, RunReport};
pub use crate::retry::Retrier;
pub use crate::source::{NewsSource, SourcedItem};

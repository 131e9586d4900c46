pub mod archive;
pub mod email;

use anyhow::Result;

use crate::report::RunReport;

/// A delivery channel for the run report. Failures are recorded at the run
/// level by the orchestrator; they never unwind item state.
#[async_trait::async_trait]
pub trait Delivery: Send + Sync {
    async fn deliver(&self, report: &RunReport) -> Result<()>;
    fn name(&self) -> &'static str;
}

pub use archive::ArchiveDelivery;
pub use email::{EmailDelivery, EmailSender};

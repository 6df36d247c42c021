//! Per-bucket URL processors. Each turns one classified URL into the
//! consensus records of the commits it leads to.

pub mod commit;
pub mod bitbucket;
pub mod pull;
pub mod issues;
pub mod patch;

use std::time::Instant;

use async_trait::async_trait;
use tracing::info;

use crate::errors::RootCauseError;
use crate::models::ConsensusRecord;
use crate::utils::formatting::format_duration;

pub use bitbucket::BitbucketProcessor;
pub use commit::CommitProcessor;
pub use issues::IssuesProcessor;
pub use patch::PatchProcessor;
pub use pull::PullProcessor;

#[async_trait]
pub trait UrlProcessor: Send + Sync {
    async fn process(&self, url: &str, cve_id: &str, source: &str) -> Result<Vec<ConsensusRecord>, RootCauseError>;

    fn name(&self) -> &'static str;
}

/// Timing entry written after every analyzed URL or commit.
pub(crate) fn log_timing(cve_id: &str, source: &str, url: &str, started: Instant) {
    info!(
        cve_id,
        source,
        url,
        elapsed = %format_duration(started.elapsed().as_millis() as u64),
        "Time profiling for root cause analysis"
    );
}

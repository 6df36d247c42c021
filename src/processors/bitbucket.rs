use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tracing::info;

use crate::agents::CommitAnalyzer;
use crate::errors::RootCauseError;
use crate::models::ConsensusRecord;
use super::{log_timing, UrlProcessor};

/// Bitbucket commit URLs go through the GitHub-style analyzer; every other
/// Bitbucket URL is left alone.
pub struct BitbucketProcessor {
    analyzer: Arc<dyn CommitAnalyzer>,
}

impl BitbucketProcessor {
    pub fn new(analyzer: Arc<dyn CommitAnalyzer>) -> Self {
        Self { analyzer }
    }
}

#[async_trait]
impl UrlProcessor for BitbucketProcessor {
    async fn process(&self, url: &str, cve_id: &str, source: &str) -> Result<Vec<ConsensusRecord>, RootCauseError> {
        if !url.contains("/commits/") {
            info!(url, "Bitbucket URL is not a commit, skipping");
            return Ok(Vec::new());
        }
        let started = Instant::now();
        let result = self.analyzer.analyze(url, cve_id, source).await;
        log_timing(cve_id, source, url, started);
        result
    }

    fn name(&self) -> &'static str {
        "bitbucket"
    }
}

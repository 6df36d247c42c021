use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;

use crate::agents::CommitAnalyzer;
use crate::errors::RootCauseError;
use crate::models::ConsensusRecord;
use super::{log_timing, UrlProcessor};

/// Hands a URL that already names a single commit to its platform analyzer.
/// Serves the commit, gitlab and sourceware buckets.
pub struct CommitProcessor {
    analyzer: Arc<dyn CommitAnalyzer>,
}

impl CommitProcessor {
    pub fn new(analyzer: Arc<dyn CommitAnalyzer>) -> Self {
        Self { analyzer }
    }
}

#[async_trait]
impl UrlProcessor for CommitProcessor {
    async fn process(&self, url: &str, cve_id: &str, source: &str) -> Result<Vec<ConsensusRecord>, RootCauseError> {
        let started = Instant::now();
        let result = self.analyzer.analyze(url, cve_id, source).await;
        log_timing(cve_id, source, url, started);
        result
    }

    fn name(&self) -> &'static str {
        self.analyzer.platform()
    }
}

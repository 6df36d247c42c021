pub mod context;
pub mod github;
pub mod gitlab;
pub mod sourceware;

use async_trait::async_trait;

use crate::errors::RootCauseError;
use crate::models::ConsensusRecord;

pub use context::AnalysisContext;
pub use github::{GitHubAnalyzer, GitHubClient};
pub use gitlab::GitLabAnalyzer;
pub use sourceware::SourcewareAnalyzer;

/// Turns one commit reference into accepted consensus records.
#[async_trait]
pub trait CommitAnalyzer: Send + Sync {
    async fn analyze(&self, url: &str, cve_id: &str, source: &str) -> Result<Vec<ConsensusRecord>, RootCauseError>;

    fn platform(&self) -> &'static str;
}

#[cfg(test)]
pub(crate) fn test_context(
    http: std::sync::Arc<dyn crate::http::HttpFetch>,
    llm: std::sync::Arc<dyn crate::llm::LLMProvider>,
) -> std::sync::Arc<AnalysisContext> {
    use std::sync::Arc;

    let engine = crate::analysis::ConsensusEngine::new(llm.clone(), llm, 2);
    let store = Arc::new(crate::analysis::ConsensusStore::in_memory());
    let nvd = Arc::new(crate::nvd::NvdClient::new(http, None));
    Arc::new(AnalysisContext::new(engine, store, crate::nvd::DescriptionCache::new(nvd)))
}

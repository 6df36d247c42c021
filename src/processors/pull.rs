use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tracing::{error, info, warn};

use crate::agents::{CommitAnalyzer, GitHubClient};
use crate::discovery::links::unique_in_order;
use crate::errors::RootCauseError;
use crate::models::ConsensusRecord;
use super::{log_timing, UrlProcessor};

/// `(owner, repo, number)` of a `github.com/<owner>/<repo>/pull/<n>` URL.
pub fn parse_pull_url(url: &str) -> Option<(String, String, String)> {
    let parts: Vec<&str> = url.trim_matches('/').split('/').collect();
    if parts.len() < 7 || parts[5] != "pull" {
        return None;
    }
    Some((parts[3].to_string(), parts[4].to_string(), parts[6].to_string()))
}

pub fn commit_url(owner: &str, repo: &str, sha: &str) -> String {
    format!("https://github.com/{}/{}/commit/{}", owner, repo, sha)
}

/// Analyzes the first and last commits of a pull request.
pub struct PullProcessor {
    client: Arc<GitHubClient>,
    analyzer: Arc<dyn CommitAnalyzer>,
}

impl PullProcessor {
    pub fn new(client: Arc<GitHubClient>, analyzer: Arc<dyn CommitAnalyzer>) -> Self {
        Self { client, analyzer }
    }

    /// Commit URLs of the PR's first and last commits, deduplicated.
    pub async fn endpoint_commits(&self, url: &str) -> Result<Vec<String>, RootCauseError> {
        let Some((owner, repo, number)) = parse_pull_url(url) else {
            warn!(url, "Invalid pull request URL format");
            return Ok(Vec::new());
        };

        let commits = self.client.pull_commits(&owner, &repo, &number).await?;
        let (Some(first), Some(last)) = (commits.first(), commits.last()) else {
            warn!(url, "No commits found in pull request");
            return Ok(Vec::new());
        };

        Ok(unique_in_order(
            [&first.sha, &last.sha]
                .into_iter()
                .filter(|sha| !sha.is_empty())
                .map(|sha| commit_url(&owner, &repo, sha)),
        ))
    }
}

#[async_trait]
impl UrlProcessor for PullProcessor {
    async fn process(&self, url: &str, cve_id: &str, source: &str) -> Result<Vec<ConsensusRecord>, RootCauseError> {
        let commits = self.endpoint_commits(url).await?;
        info!(url, commits = commits.len(), "Analyzing pull request endpoints");

        let mut results = Vec::new();
        for commit in &commits {
            let started = Instant::now();
            match self.analyzer.analyze(commit, cve_id, source).await {
                Ok(records) => results.extend(records),
                Err(e) => error!(cve_id, url = %commit, error = %e, "Error analyzing pull request commit"),
            }
            log_timing(cve_id, source, commit, started);
        }
        Ok(results)
    }

    fn name(&self) -> &'static str {
        "pull"
    }
}

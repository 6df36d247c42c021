use std::sync::{Arc, LazyLock};
use std::time::Instant;

use async_trait::async_trait;
use regex::Regex;
use tracing::{debug, error, info, warn};

use crate::agents::github::IssueEvent;
use crate::agents::{CommitAnalyzer, GitHubClient};
use crate::analysis::is_valid_source_file;
use crate::discovery::links::unique_in_order;
use crate::errors::RootCauseError;
use crate::models::ConsensusRecord;
use super::{log_timing, UrlProcessor};

/// Issue events that may carry the fixing commit.
pub const EVENT_KEYWORDS: &[&str] = &["closed", "referenced", "pushed", "fixed", "commit"];

static COMMENT_COMMIT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(https://github\.com/[^\s]+/commit/[0-9a-f]+)").unwrap());

/// `(owner, repo, number)` of a `github.com/<owner>/<repo>/issues/<n>` URL.
pub fn parse_issue_url(url: &str) -> Option<(String, String, String)> {
    let parts: Vec<&str> = url.trim_matches('/').split('/').collect();
    if parts.len() < 7 {
        return None;
    }
    Some((parts[3].to_string(), parts[4].to_string(), parts[6].to_string()))
}

/// Web URL for an API commit URL.
pub fn web_commit_url(api_url: &str) -> String {
    api_url
        .replace("api.github.com/repos", "github.com")
        .replace("/commits/", "/commit/")
}

pub fn commits_from_events(events: &[IssueEvent]) -> Vec<String> {
    unique_in_order(events.iter().filter_map(|e| {
        let event = e.event.as_deref()?;
        if !EVENT_KEYWORDS.contains(&event) {
            return None;
        }
        e.commit_url.as_deref().filter(|u| !u.is_empty()).map(web_commit_url)
    }))
}

pub fn commits_from_text(text: &str) -> Vec<String> {
    unique_in_order(COMMENT_COMMIT_RE.find_iter(text).map(|m| m.as_str().to_string()))
}

/// Follows an issue to the commits that reference or close it.
pub struct IssuesProcessor {
    client: Arc<GitHubClient>,
    analyzer: Arc<dyn CommitAnalyzer>,
}

impl IssuesProcessor {
    pub fn new(client: Arc<GitHubClient>, analyzer: Arc<dyn CommitAnalyzer>) -> Self {
        Self { client, analyzer }
    }

    /// Commits named by the event timeline, or by the comments when the
    /// timeline names none.
    pub async fn linked_commits(&self, url: &str) -> Result<Vec<String>, RootCauseError> {
        let Some((owner, repo, number)) = parse_issue_url(url) else {
            warn!(url, "Invalid issue URL format");
            return Ok(Vec::new());
        };

        let commits = match self.client.issue_events(&owner, &repo, &number).await {
            Ok(events) => commits_from_events(&events),
            Err(e) => {
                warn!(url, error = %e, error_type = e.classify().error_type, "Failed to fetch issue events");
                Vec::new()
            }
        };
        if !commits.is_empty() {
            return Ok(commits);
        }

        debug!(url, "No commits in issue events, scanning comments");
        let comments = self.client.issue_comments(&owner, &repo, &number).await?;
        let text: Vec<&str> = comments.iter().filter_map(|c| c.body.as_deref()).collect();
        Ok(commits_from_text(&text.join("\n")))
    }

    async fn log_changed_files(&self, commit_url: &str) {
        match self.client.fetch_commit(commit_url).await {
            Ok(payload) => {
                let files: Vec<&str> = payload
                    .files
                    .iter()
                    .map(|f| f.filename.as_str())
                    .filter(|f| is_valid_source_file(f))
                    .collect();
                info!(commit_url, files = ?files, "Changed source files in linked commit");
            }
            Err(e) => debug!(commit_url, error = %e, "Could not list changed files"),
        }
    }
}

#[async_trait]
impl UrlProcessor for IssuesProcessor {
    async fn process(&self, url: &str, cve_id: &str, source: &str) -> Result<Vec<ConsensusRecord>, RootCauseError> {
        let commits = self.linked_commits(url).await?;
        if commits.is_empty() {
            info!(url, "No commits linked to issue");
            return Ok(Vec::new());
        }

        let mut results = Vec::new();
        for commit in &commits {
            let started = Instant::now();
            match self.analyzer.analyze(commit, cve_id, source).await {
                Ok(records) => results.extend(records),
                Err(e) => error!(cve_id, url = %commit, error = %e, "Error analyzing issue commit"),
            }
            log_timing(cve_id, source, commit, started);
            self.log_changed_files(commit).await;
        }
        Ok(results)
    }

    fn name(&self) -> &'static str {
        "issues"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::testing::StaticFetcher;

    struct Noop;

    #[async_trait]
    impl CommitAnalyzer for Noop {
        async fn analyze(&self, _url: &str, _cve_id: &str, _source: &str) -> Result<Vec<ConsensusRecord>, RootCauseError> {
            Ok(Vec::new())
        }

        fn platform(&self) -> &'static str {
            "noop"
        }
    }

    #[test]
    fn test_web_commit_url() {
        assert_eq!(
            web_commit_url("https://api.github.com/repos/acme/foo/commits/abc"),
            "https://github.com/acme/foo/commit/abc"
        );
    }

    #[test]
    fn test_commits_from_events_filters_keywords() {
        let events: Vec<IssueEvent> = serde_json::from_str(
            r#"[{"event":"labeled","commit_url":"https://api.github.com/repos/a/b/commits/1"},
                {"event":"referenced","commit_url":"https://api.github.com/repos/a/b/commits/2"},
                {"event":"closed","commit_url":null},
                {"event":"closed","commit_url":"https://api.github.com/repos/a/b/commits/2"}]"#,
        )
        .unwrap();
        assert_eq!(commits_from_events(&events), vec!["https://github.com/a/b/commit/2".to_string()]);
    }

    #[test]
    fn test_commits_from_text() {
        let text = "Fixed in https://github.com/a/b/commit/deadbeef and again https://github.com/a/b/commit/deadbeef.";
        assert_eq!(commits_from_text(text), vec!["https://github.com/a/b/commit/deadbeef".to_string()]);
    }

    #[tokio::test]
    async fn test_falls_back_to_comments() {
        let http = Arc::new(
            StaticFetcher::new()
                .route("https://api.github.com/repos/a/b/issues/5/events", 200, r#"[{"event":"labeled"}]"#)
                .route(
                    "https://api.github.com/repos/a/b/issues/5/comments",
                    200,
                    r#"[{"body":"see https://github.com/a/b/commit/cafe01"},{"body":null}]"#,
                ),
        );
        let processor = IssuesProcessor::new(Arc::new(GitHubClient::new(http, None)), Arc::new(Noop));
        let commits = processor.linked_commits("https://github.com/a/b/issues/5").await.unwrap();
        assert_eq!(commits, vec!["https://github.com/a/b/commit/cafe01".to_string()]);
    }

    #[tokio::test]
    async fn test_events_failure_still_scans_comments() {
        let http = Arc::new(
            StaticFetcher::new()
                .route("https://api.github.com/repos/a/b/issues/5/events", 500, "")
                .route(
                    "https://api.github.com/repos/a/b/issues/5/comments",
                    200,
                    r#"[{"body":"fixed in https://github.com/a/b/commit/cafe01"}]"#,
                ),
        );
        let processor = IssuesProcessor::new(Arc::new(GitHubClient::new(http, None)), Arc::new(Noop));
        let commits = processor.linked_commits("https://github.com/a/b/issues/5").await.unwrap();
        assert_eq!(commits, vec!["https://github.com/a/b/commit/cafe01".to_string()]);
    }
}

use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use tracing::{info, warn};

use crate::analysis::DiffUnit;
use crate::errors::RootCauseError;
use crate::http::client::API_TIMEOUT;
use crate::http::{HttpFetch, HttpRequest};
use crate::models::ConsensusRecord;
use super::context::AnalysisContext;
use super::CommitAnalyzer;

pub const GITLAB_API: &str = "https://gitlab.com/api/v4";

static COMMIT_URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^https://gitlab\.com/(.+?)/-/commit/([a-fA-F0-9]+)").unwrap());

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GitLabDiff {
    #[serde(default)]
    pub new_path: String,
    #[serde(default)]
    pub diff: String,
}

/// Project path and commit SHA of a `gitlab.com/<path>/-/commit/<sha>` URL.
pub fn parse_commit_url(url: &str) -> Option<(String, String)> {
    let caps = COMMIT_URL_RE.captures(url)?;
    Some((caps[1].to_string(), caps[2].to_string()))
}

pub fn diff_api_url(project_path: &str, sha: &str) -> String {
    format!(
        "{}/projects/{}/repository/commits/{}/diff",
        GITLAB_API,
        project_path.replace('/', "%2F"),
        sha
    )
}

pub struct GitLabAnalyzer {
    http: Arc<dyn HttpFetch>,
    token: Option<String>,
    ctx: Arc<AnalysisContext>,
}

impl GitLabAnalyzer {
    pub fn new(http: Arc<dyn HttpFetch>, token: Option<String>, ctx: Arc<AnalysisContext>) -> Self {
        Self { http, token: token.filter(|t| !t.trim().is_empty()), ctx }
    }

    async fn fetch_diffs(&self, api_url: &str) -> Result<Vec<GitLabDiff>, RootCauseError> {
        let mut req = HttpRequest::get(api_url).timeout(API_TIMEOUT);
        if let Some(token) = &self.token {
            req = req.header("PRIVATE-TOKEN", token.as_str());
        }
        let resp = self.http.get(&req).await?;
        match resp.status {
            401 | 403 => Err(RootCauseError::Authentication(format!("GitLab refused {}", api_url))),
            429 => Err(RootCauseError::RateLimit(format!("GitLab throttled {}", api_url))),
            _ => resp.ensure_success()?.json(),
        }
    }
}

#[async_trait]
impl CommitAnalyzer for GitLabAnalyzer {
    async fn analyze(&self, url: &str, cve_id: &str, source: &str) -> Result<Vec<ConsensusRecord>, RootCauseError> {
        let Some((project, sha)) = parse_commit_url(url) else {
            warn!(url, "Invalid GitLab commit URL format");
            return Ok(Vec::new());
        };

        let diffs = self.fetch_diffs(&diff_api_url(&project, &sha)).await?;
        let header = format!("Commit: {}", url);
        let units: Vec<DiffUnit> = diffs
            .into_iter()
            .map(|d| DiffUnit::new(d.new_path, d.diff, url).with_header(header.clone()))
            .collect();

        let results = self.ctx.analyze_units(units, cve_id, source).await;
        info!(url, found = results.len(), "Final results for GitLab commit");
        Ok(results)
    }

    fn platform(&self) -> &'static str {
        "gitlab"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::testing::StaticFetcher;
    use crate::llm::testing::FnProvider;

    #[test]
    fn test_parse_commit_url() {
        let (project, sha) = parse_commit_url("https://gitlab.com/group/sub/proj/-/commit/a1B2c3?view=parallel").unwrap();
        assert_eq!(project, "group/sub/proj");
        assert_eq!(sha, "a1B2c3");
        assert!(parse_commit_url("https://gitlab.com/group/proj/commit/abc").is_none());
        assert!(parse_commit_url("https://gitlab.example.org/g/p/-/commit/abc").is_none());
    }

    #[test]
    fn test_diff_api_url_encodes_path() {
        assert_eq!(
            diff_api_url("group/sub/proj", "abc"),
            "https://gitlab.com/api/v4/projects/group%2Fsub%2Fproj/repository/commits/abc/diff"
        );
    }

    #[tokio::test]
    async fn test_analyze_gitlab_commit() {
        let http = Arc::new(StaticFetcher::new().route(
            "https://gitlab.com/api/v4/projects/g%2Fp/repository/commits/abc/diff",
            200,
            r#"[{"new_path":"lib/x.rb","diff":"@@ -1 +1 @@\n-a\n+b"},{"new_path":"README.md","diff":"+doc"}]"#,
        ));
        let llm = Arc::new(FnProvider::fixed(
            "m",
            r#"{"root_cause_functions":[{"function_name":"render","role":"sink"}]}"#,
        ));
        let ctx = crate::agents::test_context(http.clone(), llm);
        let analyzer = GitLabAnalyzer::new(http.clone(), Some("tok".into()), ctx);

        let records = analyzer
            .analyze("https://gitlab.com/g/p/-/commit/abc", "CVE-2024-0002", "OSV")
            .await
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].filename, "lib/x.rb");
        assert_eq!(records[0].commit_url, "https://gitlab.com/g/p/-/commit/abc");

        let first = &http.requests.lock().unwrap()[0];
        assert!(first.headers.contains(&("PRIVATE-TOKEN".to_string(), "tok".to_string())));
    }

    #[tokio::test]
    async fn test_invalid_url_is_noop() {
        let http = Arc::new(StaticFetcher::new());
        let llm = Arc::new(FnProvider::fixed("m", "{}"));
        let ctx = crate::agents::test_context(http.clone(), llm);
        let analyzer = GitLabAnalyzer::new(http.clone(), None, ctx);
        let records = analyzer.analyze("https://gitlab.com/g/p/tree/main", "CVE-1", "NVD").await.unwrap();
        assert!(records.is_empty());
        assert_eq!(http.request_count(), 0);
    }
}

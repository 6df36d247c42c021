use std::sync::{Arc, LazyLock};
use std::time::Instant;

use async_trait::async_trait;
use regex::Regex;
use reqwest::Url;
use tracing::{error, info, warn};

use crate::agents::{CommitAnalyzer, GitHubClient};
use crate::discovery::links::unique_in_order;
use crate::errors::RootCauseError;
use crate::llm::{CompletionOptions, LLMProvider};
use crate::models::ConsensusRecord;
use super::pull::commit_url;
use super::{log_timing, UrlProcessor};

const SYSTEM_PROMPT: &str =
    "You are a helpful assistant that provides up-to-date information to help the user in their research.";

static URL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"https?://[^\s"']+"#).unwrap());

pub fn release_prompt(cve_part: &str) -> String {
    format!(
        "Find the patched version of {} from the GitHub associated website and generate URLs like this: \
         https://github.com/<repo_name>/releases/tag/<version_tag>. Provide only the URLs in JSON format.",
        cve_part
    )
}

/// Distinct URLs in a model reply.
pub fn extract_urls(reply: &str) -> Vec<String> {
    unique_in_order(
        URL_RE
            .find_iter(reply)
            .map(|m| m.as_str().trim_end_matches([',', ')', ']', '}', '.']).to_string()),
    )
}

/// `(owner, repo, tag)` of a `.../<owner>/<repo>/.../tag/<tag>` URL.
pub fn parse_tag_url(url: &str) -> Option<(String, String, String)> {
    let parsed = Url::parse(url).ok()?;
    let parts: Vec<&str> = parsed.path_segments()?.filter(|s| !s.is_empty()).collect();
    let idx = parts.iter().position(|p| *p == "tag")?;
    if parts.len() < 2 || idx + 1 >= parts.len() {
        return None;
    }
    Some((parts[0].to_string(), parts[1].to_string(), parts[idx + 1].to_string()))
}

/// Resolves advisory and tag URLs to the release commit through a grounded
/// search model and the Git refs API.
pub struct PatchProcessor {
    search: Option<Arc<dyn LLMProvider>>,
    client: Arc<GitHubClient>,
    analyzer: Arc<dyn CommitAnalyzer>,
}

impl PatchProcessor {
    pub fn new(search: Option<Arc<dyn LLMProvider>>, client: Arc<GitHubClient>, analyzer: Arc<dyn CommitAnalyzer>) -> Self {
        Self { search, client, analyzer }
    }

    /// Release tag URLs suggested by the search model for this advisory.
    pub async fn release_urls(&self, url: &str) -> Result<Vec<String>, RootCauseError> {
        let Some(search) = &self.search else {
            warn!(url, "Grounded search model not configured, skipping patch URL");
            return Ok(Vec::new());
        };

        let cve_part = url.trim_end_matches('/').rsplit('/').next().unwrap_or(url);
        let options = CompletionOptions { temperature: Some(0.0), ..Default::default() };
        let reply = search.complete(&release_prompt(cve_part), Some(SYSTEM_PROMPT), &options).await?;
        Ok(extract_urls(&reply.content))
    }

    /// Commit URLs behind the suggested release tags.
    pub async fn release_commits(&self, url: &str) -> Result<Vec<String>, RootCauseError> {
        let mut commits = Vec::new();
        for release in self.release_urls(url).await? {
            let Some((owner, repo, tag)) = parse_tag_url(&release) else {
                continue;
            };
            match self.client.resolve_tag(&owner, &repo, &tag).await {
                Ok(Some(sha)) => commits.push(commit_url(&owner, &repo, &sha)),
                Ok(None) => info!(release = %release, "Tag does not point at a commit"),
                Err(e) => warn!(release = %release, error = %e, "Failed to resolve tag"),
            }
        }
        Ok(unique_in_order(commits))
    }
}

#[async_trait]
impl UrlProcessor for PatchProcessor {
    async fn process(&self, url: &str, cve_id: &str, source: &str) -> Result<Vec<ConsensusRecord>, RootCauseError> {
        let commits = self.release_commits(url).await?;
        info!(url, commits = commits.len(), "Resolved release commits");

        let mut results = Vec::new();
        for commit in &commits {
            let started = Instant::now();
            match self.analyzer.analyze(commit, cve_id, source).await {
                Ok(records) => results.extend(records),
                Err(e) => error!(cve_id, url = %commit, error = %e, "Error analyzing release commit"),
            }
            log_timing(cve_id, source, commit, started);
        }
        Ok(results)
    }

    fn name(&self) -> &'static str {
        "patch"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::testing::StaticFetcher;
    use crate::llm::testing::FnProvider;

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
    fn test_extract_urls_from_json_reply() {
        let reply = "```json\n[\"https://github.com/acme/foo/releases/tag/v1.2.3\", \"https://github.com/acme/foo/releases/tag/v1.2.3\"]\n```";
        assert_eq!(extract_urls(reply), vec!["https://github.com/acme/foo/releases/tag/v1.2.3".to_string()]);
    }

    #[test]
    fn test_parse_tag_url() {
        assert_eq!(
            parse_tag_url("https://github.com/acme/foo/releases/tag/v1.2.3"),
            Some(("acme".into(), "foo".into(), "v1.2.3".into()))
        );
        assert!(parse_tag_url("https://github.com/acme/foo/releases/tag/").is_none());
        assert!(parse_tag_url("https://github.com/acme/foo/security/advisories/GHSA-1").is_none());
    }

    #[tokio::test]
    async fn test_release_commits_resolve_tags() {
        let http = Arc::new(StaticFetcher::new().route(
            "https://api.github.com/repos/acme/foo/git/ref/tags/v1.2.3",
            200,
            r#"{"object":{"type":"commit","sha":"c0ffee"}}"#,
        ));
        let search = Arc::new(FnProvider::new("search", |messages| {
            assert!(messages[1].content.contains("GHSA-xxxx-yyyy"));
            Ok(r#"{"urls": ["https://github.com/acme/foo/releases/tag/v1.2.3", "https://github.com/acme/foo/releases/tag/v9"]}"#.to_string())
        }));
        let processor = PatchProcessor::new(Some(search), Arc::new(GitHubClient::new(http, None)), Arc::new(Noop));

        let commits = processor
            .release_commits("https://github.com/acme/foo/security/advisories/GHSA-xxxx-yyyy")
            .await
            .unwrap();
        assert_eq!(commits, vec!["https://github.com/acme/foo/commit/c0ffee".to_string()]);
    }

    #[tokio::test]
    async fn test_without_search_model_is_noop() {
        let http = Arc::new(StaticFetcher::new());
        let processor = PatchProcessor::new(None, Arc::new(GitHubClient::new(http.clone(), None)), Arc::new(Noop));
        let records = processor.process("https://github.com/a/b/releases/tag/v1", "CVE-1", "NVD").await.unwrap();
        assert!(records.is_empty());
        assert_eq!(http.request_count(), 0);
    }
}

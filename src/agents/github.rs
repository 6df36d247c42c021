use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Url;
use serde::Deserialize;
use tracing::{info, warn};

use crate::analysis::DiffUnit;
use crate::errors::RootCauseError;
use crate::http::client::API_TIMEOUT;
use crate::http::{HttpFetch, HttpRequest};
use crate::models::ConsensusRecord;
use super::context::AnalysisContext;
use super::CommitAnalyzer;

pub const GITHUB_API: &str = "https://api.github.com";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommitPayload {
    #[serde(default)]
    pub sha: String,
    pub commit: Option<CommitDetail>,
    #[serde(default)]
    pub files: Vec<CommitFile>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommitDetail {
    pub message: Option<String>,
    pub author: Option<CommitAuthor>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommitAuthor {
    pub name: Option<String>,
    pub date: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommitFile {
    #[serde(default)]
    pub filename: String,
    pub patch: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommitMetadata {
    pub message: String,
    pub author: String,
    pub date: String,
}

impl CommitPayload {
    /// Message, author and date; all three fall back to `Unknown` when the
    /// payload lacks any of them.
    pub fn metadata(&self) -> CommitMetadata {
        let found = self.commit.as_ref().and_then(|c| {
            let author = c.author.as_ref()?;
            Some(CommitMetadata {
                message: c.message.clone()?,
                author: author.name.clone()?,
                date: author.date.clone()?,
            })
        });
        found.unwrap_or_else(|| {
            warn!(sha = %self.sha, "Failed to extract commit metadata");
            CommitMetadata {
                message: "Unknown".into(),
                author: "Unknown".into(),
                date: "Unknown".into(),
            }
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ShaEntry {
    #[serde(default)]
    pub sha: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IssueEvent {
    pub event: Option<String>,
    pub commit_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IssueComment {
    pub body: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GitRef {
    pub object: GitObject,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GitObject {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub sha: String,
}

/// Owner, repository and trailing path segment of a forge URL.
#[derive(Debug, Clone, PartialEq)]
pub struct RepoRef {
    pub owner: String,
    pub repo: String,
    pub tail: String,
}

/// Split `https://host/owner/repo/.../tail`. Query and fragment are dropped
/// and a trailing `.patch` / `.diff` is removed from the tail.
pub fn parse_repo_url(url: &str) -> Result<RepoRef, RootCauseError> {
    let parsed = Url::parse(url).map_err(|e| RootCauseError::InvalidUrl(format!("{}: {}", url, e)))?;
    let segments: Vec<&str> = parsed
        .path_segments()
        .map(|s| s.filter(|seg| !seg.is_empty()).collect())
        .unwrap_or_default();
    if segments.len() < 3 {
        return Err(RootCauseError::InvalidUrl(format!("not an owner/repo/... URL: {}", url)));
    }
    let tail = segments[segments.len() - 1];
    let tail = tail.strip_suffix(".patch").or_else(|| tail.strip_suffix(".diff")).unwrap_or(tail);
    Ok(RepoRef {
        owner: segments[0].to_string(),
        repo: segments[1].to_string(),
        tail: tail.to_string(),
    })
}

/// GitHub REST client for the handful of endpoints the pipeline uses.
pub struct GitHubClient {
    http: Arc<dyn HttpFetch>,
    token: Option<String>,
    api_base: String,
}

impl GitHubClient {
    pub fn new(http: Arc<dyn HttpFetch>, token: Option<String>) -> Self {
        let token = token.filter(|t| !t.trim().is_empty());
        if token.is_none() {
            warn!("GITHUB_TOKEN not set, GitHub API calls are unauthenticated and heavily rate limited");
        }
        Self { http, token, api_base: GITHUB_API.to_string() }
    }

    pub fn with_api_base(mut self, api_base: &str) -> Self {
        self.api_base = api_base.trim_end_matches('/').to_string();
        self
    }

    fn request(&self, path: &str) -> HttpRequest {
        let mut req = HttpRequest::get(format!("{}{}", self.api_base, path))
            .header("Accept", "application/vnd.github.v3+json");
        if let Some(token) = &self.token {
            req = req.header("Authorization", format!("Bearer {}", token));
        }
        req
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, request: HttpRequest) -> Result<T, RootCauseError> {
        let resp = self.http.get(&request).await?;
        match resp.status {
            401 => Err(RootCauseError::Authentication(format!("GitHub rejected token for {}", request.url))),
            403 | 429 => Err(RootCauseError::RateLimit(format!("GitHub refused {}", request.url))),
            _ => resp.ensure_success()?.json(),
        }
    }

    pub fn commit_api_path(url: &str) -> Result<String, RootCauseError> {
        let r = parse_repo_url(url)?;
        Ok(format!("/repos/{}/{}/commits/{}", r.owner, r.repo, r.tail))
    }

    pub async fn fetch_commit(&self, commit_url: &str) -> Result<CommitPayload, RootCauseError> {
        let path = Self::commit_api_path(commit_url)?;
        self.get_json(self.request(&path).timeout(API_TIMEOUT)).await
    }

    pub async fn pull_commits(&self, owner: &str, repo: &str, number: &str) -> Result<Vec<ShaEntry>, RootCauseError> {
        let path = format!("/repos/{}/{}/pulls/{}/commits", owner, repo, number);
        self.get_json(self.request(&path).timeout(API_TIMEOUT)).await
    }

    pub async fn issue_events(&self, owner: &str, repo: &str, number: &str) -> Result<Vec<IssueEvent>, RootCauseError> {
        let path = format!("/repos/{}/{}/issues/{}/events", owner, repo, number);
        self.get_json(self.request(&path)).await
    }

    pub async fn issue_comments(&self, owner: &str, repo: &str, number: &str) -> Result<Vec<IssueComment>, RootCauseError> {
        let path = format!("/repos/{}/{}/issues/{}/comments", owner, repo, number);
        self.get_json(self.request(&path)).await
    }

    /// Commit SHA a tag points at, dereferencing annotated tags.
    pub async fn resolve_tag(&self, owner: &str, repo: &str, tag: &str) -> Result<Option<String>, RootCauseError> {
        let path = format!("/repos/{}/{}/git/ref/tags/{}", owner, repo, tag);
        let git_ref: GitRef = self.get_json(self.request(&path).timeout(API_TIMEOUT)).await?;

        match git_ref.object.kind.as_str() {
            "commit" => Ok(Some(git_ref.object.sha)),
            "tag" => {
                let path = format!("/repos/{}/{}/git/tags/{}", owner, repo, git_ref.object.sha);
                let tag_obj: GitRef = self.get_json(self.request(&path).timeout(API_TIMEOUT)).await?;
                Ok(Some(tag_obj.object.sha).filter(|s| !s.is_empty()))
            }
            _ => Ok(None),
        }
    }
}

/// Analyzes GitHub-style commit URLs through the commits API.
pub struct GitHubAnalyzer {
    client: Arc<GitHubClient>,
    ctx: Arc<AnalysisContext>,
}

impl GitHubAnalyzer {
    pub fn new(client: Arc<GitHubClient>, ctx: Arc<AnalysisContext>) -> Self {
        Self { client, ctx }
    }

    pub fn client(&self) -> &Arc<GitHubClient> {
        &self.client
    }

    /// Diff units for every file of a commit payload, carrying the commit
    /// metadata as their prompt header.
    pub fn diff_units(commit_url: &str, payload: &CommitPayload) -> Vec<DiffUnit> {
        let meta = payload.metadata();
        let header = format!(
            "Commit Message:\n{}\n\nAuthor: {}\nDate: {}",
            meta.message, meta.author, meta.date
        );
        payload
            .files
            .iter()
            .map(|f| {
                DiffUnit::new(&f.filename, f.patch.clone().unwrap_or_default(), commit_url)
                    .with_header(header.clone())
            })
            .collect()
    }
}

#[async_trait]
impl CommitAnalyzer for GitHubAnalyzer {
    async fn analyze(&self, url: &str, cve_id: &str, source: &str) -> Result<Vec<ConsensusRecord>, RootCauseError> {
        let payload = self.client.fetch_commit(url).await?;
        let units = Self::diff_units(url, &payload);
        if units.is_empty() {
            warn!(url, "No files to analyze in commit");
            return Ok(Vec::new());
        }

        let results = self.ctx.analyze_units(units, cve_id, source).await;
        info!(url, found = results.len(), "Final results for commit");
        Ok(results)
    }

    fn platform(&self) -> &'static str {
        "github"
    }
}

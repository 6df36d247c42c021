//! Re-reads the text consensus store and folds it into one entry per commit.

use std::sync::LazyLock;

use regex::Regex;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::models::ConsensusReply;

static BLOCK_SPLIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Root cause exists in the commit URL:\s*").unwrap());

/// Hosts whose commit URLs are kept regardless of repository owner.
pub const ALLOW_ALL_HOSTS: &[&str] = &["sourceware.org", "gitlab.com"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceRef {
    pub name: String,
    pub url: String,
}

/// Root-cause methods gathered for one commit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommitAggregate {
    pub package: String,
    pub version: String,
    pub commit: String,
    pub source: SourceRef,
    pub methods: Vec<String>,
}

/// One parsed block of the text store.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreBlock {
    pub commit_url: String,
    pub source: String,
    pub reference_url: String,
    pub replies: Vec<ConsensusReply>,
}

/// Split store text into blocks. Blocks whose JSON does not parse are
/// logged and dropped.
pub fn parse_blocks(content: &str) -> Vec<StoreBlock> {
    BLOCK_SPLIT
        .split(content)
        .skip(1)
        .filter_map(|block| {
            let mut lines = block.trim().lines();
            let commit_url = lines.next()?.trim().to_string();

            let mut source = String::new();
            let mut reference_url = String::new();
            let mut json_lines = Vec::new();
            for line in lines {
                if let Some(rest) = line.strip_prefix("Source:") {
                    source = rest.trim().to_string();
                } else if let Some(rest) = line.strip_prefix("Reference URL:") {
                    reference_url = rest.trim().to_string();
                } else {
                    json_lines.push(line);
                }
            }

            let json = json_lines.join("\n");
            let replies = if json.trim().is_empty() {
                Vec::new()
            } else {
                match serde_json::from_str::<Vec<ConsensusReply>>(json.trim()) {
                    Ok(replies) => replies,
                    Err(e) => {
                        warn!(commit_url = %commit_url, error = %e, "Skipped malformed JSON block");
                        return None;
                    }
                }
            };

            Some(StoreBlock { commit_url, source, reference_url, replies })
        })
        .collect()
}

/// `scheme://host/owner`, lowercased scheme and host, or `None` when the
/// URL has no owner segment.
pub fn owner_base(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?;
    let owner = parsed.path().trim_start_matches('/').split('/').next().filter(|o| !o.is_empty())?;
    let port = parsed.port().map(|p| format!(":{}", p)).unwrap_or_default();
    Some(format!("{}://{}{}/{}", parsed.scheme(), host, port, owner))
}

/// Keeps commits that live under the task repository's owner.
#[derive(Debug, Clone)]
pub struct RepoFilter {
    repo_url: String,
    repo_base: Option<String>,
}

impl RepoFilter {
    pub fn new(repo_url: &str) -> Self {
        let repo_url = repo_url.trim().to_string();
        let repo_base = owner_base(&repo_url);
        Self { repo_url, repo_base }
    }

    pub fn allows(&self, commit_url: &str) -> bool {
        if self.repo_url.is_empty() {
            return true;
        }
        let host = Url::parse(commit_url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_lowercase))
            .unwrap_or_default();
        if ALLOW_ALL_HOSTS.iter().any(|h| host.contains(h)) {
            return true;
        }
        let commit_base = owner_base(commit_url);
        commit_base.is_some() && commit_base == self.repo_base
    }
}

/// Merge blocks per commit URL in first-seen order. Package, version and
/// source come from the first block that names any method; methods are
/// deduplicated by exact name.
pub fn aggregate(blocks: Vec<StoreBlock>, filter: &RepoFilter) -> Vec<CommitAggregate> {
    let mut commits: Vec<CommitAggregate> = Vec::new();

    for block in blocks {
        if !filter.allows(&block.commit_url) {
            debug!(commit_url = %block.commit_url, "Commit does not belong to target repository");
            continue;
        }

        let mut package = String::new();
        let mut version = String::new();
        let mut methods: Vec<String> = Vec::new();
        for function in block.replies.iter().flat_map(|r| &r.root_cause_functions) {
            methods.extend(function.method_names());
            if package.is_empty() {
                package = function.package.clone();
            }
            if version.is_empty() {
                version = function.version.clone();
            }
        }
        if methods.is_empty() {
            continue;
        }

        let index = match commits.iter().position(|c| c.commit == block.commit_url) {
            Some(i) => i,
            None => {
                commits.push(CommitAggregate {
                    package,
                    version,
                    commit: block.commit_url.clone(),
                    source: SourceRef { name: block.source.clone(), url: block.reference_url.clone() },
                    methods: Vec::new(),
                });
                commits.len() - 1
            }
        };

        let entry = &mut commits[index];
        for method in methods {
            if !entry.methods.contains(&method) {
                entry.methods.push(method);
            }
        }
    }

    commits
}

pub fn aggregate_store_text(content: &str, repo_url: &str) -> Vec<CommitAggregate> {
    aggregate(parse_blocks(content), &RepoFilter::new(repo_url))
}

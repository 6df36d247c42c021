use std::sync::Arc;

use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt};
use futures::stream::{self, StreamExt};
use reqwest::Url;
use tracing::{debug, info, warn};

use crate::analysis::DiffUnit;
use crate::errors::RootCauseError;
use crate::http::html::{anchors, elements, find_element, text_content};
use crate::http::{HttpFetch, HttpRequest};
use crate::models::ConsensusRecord;
use super::context::AnalysisContext;
use super::CommitAnalyzer;

pub const GITWEB_BASE: &str = "https://sourceware.org/git/";
pub const DEFAULT_PROJECT: &str = "glibc.git";

/// A changed file listed on a gitweb commitdiff page.
#[derive(Debug, Clone, PartialEq)]
pub struct DiffLink {
    pub filename: String,
    pub url: String,
}

/// `(project, hash)` from a gitweb URL. Parameters may be separated by
/// `;` or `&`; the project defaults to glibc.
pub fn parse_gitweb_params(url: &str) -> Option<(String, String)> {
    let query = url.split_once('?').map(|(_, q)| q)?;
    let query = query.split('#').next().unwrap_or(query);
    let mut project = None;
    let mut hash = None;
    for pair in query.split([';', '&']) {
        match pair.split_once('=') {
            Some(("p", v)) if !v.is_empty() => project = Some(v.to_string()),
            Some(("h", v)) if !v.is_empty() => hash = Some(v.to_string()),
            _ => {}
        }
    }
    Some((project.unwrap_or_else(|| DEFAULT_PROJECT.to_string()), hash?))
}

pub fn commitdiff_url(project: &str, hash: &str) -> String {
    format!("{}gitweb.cgi?p={};a=commitdiff;h={}", GITWEB_BASE, project, hash)
}

/// File rows of the `diff_tree` table: three cells, the first naming the
/// file and the last holding at least three links, the first of which is
/// the per-file diff.
pub fn extract_diff_links(page: &str) -> Vec<DiffLink> {
    let Ok(base) = Url::parse(GITWEB_BASE) else {
        return Vec::new();
    };
    let Some(table) = find_element(page, "table", "diff_tree") else {
        return Vec::new();
    };

    elements(table, "tr", None)
        .into_iter()
        .filter_map(|row| {
            let cells = elements(row, "td", None);
            if cells.len() != 3 {
                return None;
            }
            let filename = anchors(cells[0])
                .into_iter()
                .next()
                .map(|a| a.text)
                .unwrap_or_else(|| text_content(cells[0]).trim().to_string());
            let links = anchors(cells[2]);
            if links.len() < 3 {
                return None;
            }
            let url = base.join(&links[0].href).ok()?.to_string();
            Some(DiffLink { filename, url })
        })
        .collect()
}

/// Plain diff text of a diff page: the `page_body` block when present,
/// otherwise the raw body if it already is patch text.
pub fn diff_text(body: &str) -> Option<String> {
    if let Some(page_body) = find_element(body, "div", "page_body") {
        return Some(text_content(page_body));
    }
    body.contains("diff --git").then(|| body.to_string())
}

/// Split patch text into `(filename, block)` pairs at each `diff --git`
/// line. The filename is taken after ` b/`, or `unknown`.
pub fn split_file_blocks(text: &str) -> Vec<(String, String)> {
    let mut blocks: Vec<(String, Vec<&str>)> = Vec::new();
    for line in text.lines() {
        let trimmed = line.trim_start();
        if trimmed.starts_with("diff --git") {
            let filename = trimmed
                .split_once(" b/")
                .map(|(_, name)| name.trim().to_string())
                .unwrap_or_else(|| "unknown".to_string());
            blocks.push((filename, vec![trimmed]));
        } else if let Some((_, lines)) = blocks.last_mut() {
            lines.push(line);
        }
    }
    blocks.into_iter().map(|(name, lines)| (name, lines.join("\n"))).collect()
}

pub struct SourcewareAnalyzer {
    http: Arc<dyn HttpFetch>,
    ctx: Arc<AnalysisContext>,
}

impl SourcewareAnalyzer {
    pub fn new(http: Arc<dyn HttpFetch>, ctx: Arc<AnalysisContext>) -> Self {
        Self { http, ctx }
    }

    async fn fetch(&self, url: &str) -> Result<String, RootCauseError> {
        let resp = self.http.get(&HttpRequest::get(url)).await?.ensure_success()?;
        Ok(resp.body)
    }

    async fn units_for(&self, link: &DiffLink) -> Vec<DiffUnit> {
        let body = match self.fetch(&link.url).await {
            Ok(body) => body,
            Err(e) => {
                warn!(url = %link.url, error = %e, "Failed to fetch diff page");
                return Vec::new();
            }
        };
        let Some(text) = diff_text(&body) else {
            warn!(url = %link.url, "No diff content on page");
            return Vec::new();
        };

        let header = format!("Sourceware Diff URL: {}", link.url);
        split_file_blocks(&text)
            .into_iter()
            .map(|(filename, block)| DiffUnit::new(filename, block, &link.url).with_header(header.clone()))
            .collect()
    }
}

#[async_trait]
impl CommitAnalyzer for SourcewareAnalyzer {
    async fn analyze(&self, url: &str, cve_id: &str, source: &str) -> Result<Vec<ConsensusRecord>, RootCauseError> {
        let Some((project, hash)) = parse_gitweb_params(url) else {
            warn!(url, "Could not extract commit hash from URL");
            return Ok(Vec::new());
        };

        let page = self.fetch(&commitdiff_url(&project, &hash)).await?;
        let mut links = extract_diff_links(&page);
        if links.is_empty() {
            warn!(url, "No diff links found");
            return Ok(Vec::new());
        }

        if let Some(patch) = links.iter().find(|l| l.url.contains("patch")).cloned() {
            debug!(url = %patch.url, "Using patch link only");
            links = vec![patch];
        }

        let pages: Vec<BoxFuture<'_, Vec<DiffUnit>>> = links.iter().map(|link| self.units_for(link).boxed()).collect();
        let units: Vec<DiffUnit> = stream::iter(pages)
            .buffered(self.ctx.workers_for(links.len()))
            .concat()
            .await;

        let results = self.ctx.analyze_units(units, cve_id, source).await;
        info!(url, found = results.len(), "Final results for Sourceware commit");
        Ok(results)
    }

    fn platform(&self) -> &'static str {
        "sourceware"
    }
}

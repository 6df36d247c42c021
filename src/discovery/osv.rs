use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use regex::Regex;
use reqwest::Url;
use tracing::{info, warn};

use crate::errors::RootCauseError;
use crate::http::{html, HttpFetch, HttpRequest};
use super::links::{unique_in_order, LinkSource};
use super::LinkProvider;

static VULN_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:CVE|RHSA|GHSA|GO)(?:[-:][A-Za-z0-9]+)+\b").unwrap());
static REFERENCE_HREF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/(commit|pull|issues|security/advisories|tags)").unwrap());

const SEARCH_URL: &str = "https://osv.dev/list";

/// OSV's display name for a purl ecosystem; unknown ecosystems search
/// across all of OSV.
pub fn osv_ecosystem(ecosystem: Option<&str>) -> &'static str {
    match ecosystem.map(|e| e.to_ascii_lowercase()).as_deref() {
        Some("golang") => "Go",
        Some("maven") => "Maven",
        Some("npm") => "npm",
        Some("nuget") => "NuGet",
        Some("pypi") => "PyPI",
        Some("gem") => "RubyGems",
        _ => "",
    }
}

pub fn vulnerability_page_url(id: &str) -> String {
    format!("https://osv.dev/vulnerability/{}", id)
}

/// Advisory identifiers mentioned in the search results text, in order.
pub fn extract_vuln_ids(text: &str) -> Vec<String> {
    unique_in_order(VULN_ID.find_iter(text).map(|m| m.as_str().to_string()))
}

/// Reference anchors of an OSV vulnerability page, made absolute.
pub fn extract_reference_links(page_url: &str, body: &str) -> Vec<String> {
    let base = Url::parse(page_url).ok();
    html::anchors(body)
        .into_iter()
        .filter(|a| REFERENCE_HREF.is_match(&a.href))
        .filter_map(|a| match &base {
            Some(base) => base.join(&a.href).ok().map(|u| u.to_string()),
            None => Some(a.href),
        })
        .collect()
}

pub struct OsvSource {
    http: Arc<dyn HttpFetch>,
}

impl OsvSource {
    pub fn new(http: Arc<dyn HttpFetch>) -> Self {
        Self { http }
    }

    async fn search_ids(&self, cve_id: &str, ecosystem: &str) -> Result<Vec<String>, RootCauseError> {
        let request = HttpRequest::get(SEARCH_URL)
            .query("q", cve_id)
            .query("ecosystem", ecosystem);
        let page = self.http.get(&request).await?.ensure_success()?;
        Ok(extract_vuln_ids(&html::text_content(&page.body)))
    }
}

#[async_trait]
impl LinkProvider for OsvSource {
    fn source(&self) -> LinkSource {
        LinkSource::Osv
    }

    async fn collect(&self, cve_id: &str, ecosystem: Option<&str>) -> Result<Vec<String>, RootCauseError> {
        let ecosystem = osv_ecosystem(ecosystem);
        let ids = self.search_ids(cve_id, ecosystem).await?;
        info!(cve_id, ecosystem, ids = ?ids, "IDs found on OSV");

        let mut refs = Vec::new();
        for id in &ids {
            let page_url = vulnerability_page_url(id);
            let page = match self.http.get(&HttpRequest::get(&page_url)).await.and_then(|r| r.ensure_success()) {
                Ok(page) => page,
                Err(e) => {
                    warn!(cve_id, url = %page_url, error = %e, "Skipping OSV vulnerability page");
                    continue;
                }
            };
            refs.extend(extract_reference_links(&page_url, &page.body));
        }

        Ok(unique_in_order(refs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ecosystem_mapping() {
        assert_eq!(osv_ecosystem(Some("golang")), "Go");
        assert_eq!(osv_ecosystem(Some("PyPI")), "PyPI");
        assert_eq!(osv_ecosystem(Some("gem")), "RubyGems");
        assert_eq!(osv_ecosystem(Some("cargo")), "");
        assert_eq!(osv_ecosystem(None), "");
    }

    #[test]
    fn test_extract_vuln_ids() {
        let text = "GHSA-abcd-1234-wxyz npm foo\nCVE-2024-0001 CVE-2024-0001\nGO-2024-1234 PYSEC-1";
        assert_eq!(extract_vuln_ids(text), vec!["GHSA-abcd-1234-wxyz", "CVE-2024-0001", "GO-2024-1234"]);
    }

    #[test]
    fn test_extract_reference_links() {
        let body = r#"<a href="https://github.com/acme/foo/commit/abc">FIX</a>
            <a href="https://github.com/acme/foo">PACKAGE</a>
            <a href="/vulnerability/GHSA-1">self</a>
            <a href="https://github.com/acme/foo/releases/tags/v1">tag</a>"#;
        let links = extract_reference_links("https://osv.dev/vulnerability/CVE-2024-0001", body);
        assert_eq!(
            links,
            vec!["https://github.com/acme/foo/commit/abc", "https://github.com/acme/foo/releases/tags/v1"]
        );
    }
}

use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use regex::Regex;

use crate::errors::RootCauseError;
use crate::http::{html, HttpFetch, HttpRequest};
use super::links::{unique_in_order, LinkSource};
use super::LinkProvider;

static URL_IN_TEXT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"https?://[^\s"'>]+"#).unwrap());

/// Path fragments that mark a reference as worth following.
const TARGET_KEYWORDS: &[&str] = &[
    "/github",
    "/commit",
    "/pull",
    "/issues",
    "/security/advisories",
    "/tag",
    "/tags",
    "/bitbucket",
    "/sourceware",
    "/commits",
];

pub fn detail_page_url(cve_id: &str) -> String {
    format!("https://nvd.nist.gov/vuln/detail/{}", cve_id)
}

/// Every keyword-matching URL in free text, deduplicated in order.
pub fn extract_reference_urls(text: &str) -> Vec<String> {
    unique_in_order(
        URL_IN_TEXT
            .find_iter(text)
            .map(|m| m.as_str())
            .filter(|url| TARGET_KEYWORDS.iter().any(|k| url.contains(k)))
            .map(str::to_string),
    )
}

/// Scrapes the public NVD vulnerability detail page.
pub struct NvdPageSource {
    http: Arc<dyn HttpFetch>,
}

impl NvdPageSource {
    pub fn new(http: Arc<dyn HttpFetch>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl LinkProvider for NvdPageSource {
    fn source(&self) -> LinkSource {
        LinkSource::Nvd
    }

    async fn collect(&self, cve_id: &str, _ecosystem: Option<&str>) -> Result<Vec<String>, RootCauseError> {
        let page = self
            .http
            .get(&HttpRequest::get(detail_page_url(cve_id)))
            .await?
            .ensure_success()?;
        Ok(extract_reference_urls(&html::text_content(&page.body)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_filter_and_dedup() {
        let text = "References\nhttps://github.com/acme/foo/commit/abc123\n\
            https://www.cve.org/CVERecord?id=CVE-2024-0001\n\
            https://github.com/acme/foo/commit/abc123\n\
            https://lists.debian.org/debian-lts/msg.html\n\
            https://bitbucket.org/x/y/commits/9\n\
            https://sourceware.org/git/?p=glibc.git;a=commit;h=1";
        assert_eq!(
            extract_reference_urls(text),
            vec![
                "https://github.com/acme/foo/commit/abc123",
                "https://bitbucket.org/x/y/commits/9",
                "https://sourceware.org/git/?p=glibc.git;a=commit;h=1",
            ]
        );
    }

    #[test]
    fn test_url_stops_at_quote_and_bracket() {
        let urls = extract_reference_urls(r#"see "https://github.com/a/b/pull/1">here"#);
        assert_eq!(urls, vec!["https://github.com/a/b/pull/1"]);
    }

    #[test]
    fn test_detail_page_url() {
        assert_eq!(detail_page_url("CVE-2024-0001"), "https://nvd.nist.gov/vuln/detail/CVE-2024-0001");
    }
}

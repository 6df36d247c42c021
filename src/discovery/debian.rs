use std::sync::Arc;

use async_trait::async_trait;

use crate::errors::RootCauseError;
use crate::http::{html, HttpFetch, HttpRequest};
use super::links::{unique_in_order, LinkSource};
use super::LinkProvider;

const TRACKED_SITES: &[&str] = &["github.com", "gitlab.com", "sourceware.org"];

pub fn tracker_url(cve_id: &str) -> String {
    format!("https://security-tracker.debian.org/tracker/{}", cve_id)
}

/// Absolute links to the tracked forges, deduplicated in page order.
pub fn extract_note_urls(body: &str) -> Vec<String> {
    unique_in_order(
        html::anchors(body)
            .into_iter()
            .map(|a| a.href)
            .filter(|href| href.starts_with("http") && TRACKED_SITES.iter().any(|s| href.contains(s))),
    )
}

/// Scrapes the Debian security tracker page for a CVE.
pub struct DebianTrackerSource {
    http: Arc<dyn HttpFetch>,
}

impl DebianTrackerSource {
    pub fn new(http: Arc<dyn HttpFetch>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl LinkProvider for DebianTrackerSource {
    fn source(&self) -> LinkSource {
        LinkSource::Debian
    }

    async fn collect(&self, cve_id: &str, _ecosystem: Option<&str>) -> Result<Vec<String>, RootCauseError> {
        let page = self
            .http
            .get(&HttpRequest::get(tracker_url(cve_id)))
            .await?
            .ensure_success()?;
        Ok(extract_note_urls(&page.body))
    }
}

use std::sync::Arc;

use dashmap::DashMap;
use tracing::warn;

use crate::errors::RootCauseError;
use crate::http::{HttpFetch, HttpRequest};
use super::models::{Cve, CveResponse};

pub const NVD_API_URL: &str = "https://services.nvd.nist.gov/rest/json/cves/2.0";

/// Client for the NVD CVE API.
pub struct NvdClient {
    http: Arc<dyn HttpFetch>,
    api_key: Option<String>,
    base_url: String,
}

impl NvdClient {
    pub fn new(http: Arc<dyn HttpFetch>, api_key: Option<String>) -> Self {
        Self {
            http,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            base_url: NVD_API_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.to_string();
        self
    }

    /// The record for exactly `cve_id`, if NVD has one.
    pub async fn fetch_cve(&self, cve_id: &str) -> Result<Option<Cve>, RootCauseError> {
        let mut request = HttpRequest::get(&self.base_url).query("cveId", cve_id);
        if let Some(key) = &self.api_key {
            request = request.header("apiKey", key.as_str());
        }

        let resp = self.http.get(&request).await?.ensure_success()?;
        let data: CveResponse = resp.json()?;
        Ok(data
            .vulnerabilities
            .into_iter()
            .map(|w| w.cve)
            .find(|cve| cve.id == cve_id))
    }

    pub async fn description(&self, cve_id: &str) -> Result<Option<String>, RootCauseError> {
        Ok(self.fetch_cve(cve_id).await?.map(|cve| cve.joined_description()))
    }
}

/// Per-run memo of CVE descriptions used in analysis prompts.
pub struct DescriptionCache {
    client: Arc<NvdClient>,
    entries: DashMap<String, String>,
}

impl DescriptionCache {
    pub fn new(client: Arc<NvdClient>) -> Self {
        Self { client, entries: DashMap::new() }
    }

    pub fn fallback(cve_id: &str) -> String {
        format!("No description available for {}", cve_id)
    }

    /// Cached description, fetching it on first use. Failures yield the
    /// fallback text and are not cached.
    pub async fn get(&self, cve_id: &str) -> String {
        if let Some(hit) = self.entries.get(cve_id) {
            return hit.value().clone();
        }

        match self.client.description(cve_id).await {
            Ok(Some(description)) => {
                self.entries.insert(cve_id.to_string(), description.clone());
                description
            }
            Ok(None) => {
                warn!(cve_id, "NVD has no record for CVE");
                Self::fallback(cve_id)
            }
            Err(e) => {
                warn!(cve_id, error = %e, "Failed to fetch CVE description");
                Self::fallback(cve_id)
            }
        }
    }
}

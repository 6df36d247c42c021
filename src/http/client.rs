use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::errors::RootCauseError;

/// Browser-like agent string; several scraped pages and the GitHub API
/// reject requests without one.
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Timeout applied to the platform REST calls that declare one.
pub const API_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Default)]
pub struct HttpRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub query: Vec<(String, String)>,
    pub timeout: Option<Duration>,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self { url: url.into(), ..Default::default() }
    }

    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((name.to_string(), value.into()));
        self
    }

    pub fn query(mut self, name: &str, value: impl Into<String>) -> Self {
        self.query.push((name.to_string(), value.into()));
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub url: String,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn ensure_success(self) -> Result<Self, RootCauseError> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(RootCauseError::Http { status: self.status, url: self.url })
        }
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, RootCauseError> {
        Ok(serde_json::from_str(&self.body)?)
    }
}

/// GET transport shared by every scraper and platform client.
#[async_trait]
pub trait HttpFetch: Send + Sync {
    async fn get(&self, request: &HttpRequest) -> Result<HttpResponse, RootCauseError>;
}

pub struct ReqwestFetcher {
    client: Client,
}

impl ReqwestFetcher {
    pub fn new() -> Result<Self, RootCauseError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| RootCauseError::Config(format!("HTTP client setup failed: {}", e)))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpFetch for ReqwestFetcher {
    async fn get(&self, request: &HttpRequest) -> Result<HttpResponse, RootCauseError> {
        let mut builder = self.client.get(&request.url);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }

        let resp = builder.send().await?;
        let status = resp.status().as_u16();
        let url = resp.url().to_string();
        let body = resp.text().await?;
        debug!(url = %url, status, bytes = body.len(), "GET completed");

        Ok(HttpResponse { status, url, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builder() {
        let req = HttpRequest::get("https://services.nvd.nist.gov/rest/json/cves/2.0")
            .query("cveId", "CVE-2024-0001")
            .header("apiKey", "secret")
            .timeout(API_TIMEOUT);
        assert_eq!(req.query, vec![("cveId".to_string(), "CVE-2024-0001".to_string())]);
        assert_eq!(req.headers[0].0, "apiKey");
        assert_eq!(req.timeout, Some(Duration::from_secs(10)));
    }

    #[test]
    fn test_ensure_success_maps_status() {
        let resp = HttpResponse { status: 404, url: "https://x".into(), body: String::new() };
        match resp.ensure_success() {
            Err(RootCauseError::Http { status, .. }) => assert_eq!(status, 404),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_json_body() {
        let resp = HttpResponse { status: 200, url: "https://x".into(), body: r#"{"sha":"abc"}"#.into() };
        let v: serde_json::Value = resp.json().unwrap();
        assert_eq!(v["sha"], "abc");
    }
}

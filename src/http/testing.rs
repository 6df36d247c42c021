use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::errors::RootCauseError;
use super::client::{HttpFetch, HttpRequest, HttpResponse};

/// In-memory transport keyed by URL (query pairs appended as `?k=v&...`).
/// Unknown URLs answer 404.
#[derive(Default)]
pub struct StaticFetcher {
    routes: HashMap<String, (u16, String)>,
    pub requests: Mutex<Vec<HttpRequest>>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, url: &str, status: u16, body: &str) -> Self {
        self.routes.insert(url.to_string(), (status, body.to_string()));
        self
    }

    pub fn key(request: &HttpRequest) -> String {
        if request.query.is_empty() {
            request.url.clone()
        } else {
            let query: Vec<String> = request.query.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
            format!("{}?{}", request.url, query.join("&"))
        }
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or(0)
    }
}

#[async_trait]
impl HttpFetch for StaticFetcher {
    async fn get(&self, request: &HttpRequest) -> Result<HttpResponse, RootCauseError> {
        if let Ok(mut log) = self.requests.lock() {
            log.push(request.clone());
        }
        let key = Self::key(request);
        let (status, body) = self.routes.get(&key).cloned().unwrap_or((404, String::new()));
        Ok(HttpResponse { status, url: key, body })
    }
}

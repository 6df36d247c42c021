#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use rootcause::errors::RootCauseError;
use rootcause::http::{HttpFetch, HttpRequest, HttpResponse};
use rootcause::llm::{CompletionOptions, LLMProvider, LLMResponse, Message};

/// Canned HTTP responses keyed by URL plus `?k=v&...` query.
#[derive(Default)]
pub struct FakeHttp {
    routes: HashMap<String, String>,
    pub seen: Mutex<Vec<String>>,
}

impl FakeHttp {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, url: &str, body: &str) -> Self {
        self.routes.insert(url.to_string(), body.to_string());
        self
    }
}

#[async_trait]
impl HttpFetch for FakeHttp {
    async fn get(&self, request: &HttpRequest) -> Result<HttpResponse, RootCauseError> {
        let key = if request.query.is_empty() {
            request.url.clone()
        } else {
            let pairs: Vec<String> = request.query.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
            format!("{}?{}", request.url, pairs.join("&"))
        };
        self.seen.lock().unwrap().push(key.clone());
        match self.routes.get(&key) {
            Some(body) => Ok(HttpResponse { status: 200, url: key, body: body.clone() }),
            None => Ok(HttpResponse { status: 404, url: key, body: String::new() }),
        }
    }
}

/// Answers web-search prompts with "nothing found" and everything else
/// with a fixed consensus reply.
pub struct FakeModel {
    reply: String,
    pub calls: AtomicUsize,
}

impl FakeModel {
    pub fn new(reply: &str) -> Self {
        Self { reply: reply.to_string(), calls: AtomicUsize::new(0) }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LLMProvider for FakeModel {
    async fn chat(&self, messages: &[Message], _options: &CompletionOptions) -> Result<LLMResponse, RootCauseError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let content = if messages.iter().any(|m| m.content.contains("NO_PRIMARY_SOURCE_FOUND")) {
            "NO_PRIMARY_SOURCE_FOUND".to_string()
        } else {
            self.reply.clone()
        };
        Ok(LLMResponse { content, input_tokens: None, output_tokens: None, model: "fake".into() })
    }

    fn provider_name(&self) -> &str {
        "fake"
    }

    fn model_name(&self) -> &str {
        "fake"
    }
}

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Map, Value};
use crate::errors::RootCauseError;
use super::provider::LLMProvider;
use super::types::{CompletionOptions, LLMResponse, Message};

pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";

/// Chat-completions client for OpenRouter and other OpenAI-compatible
/// endpoints.
pub struct OpenRouterProvider {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenRouterProvider {
    pub fn new(api_key: &str, model: &str) -> Self {
        Self::with_base_url(api_key, model, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(api_key: &str, model: &str, base_url: &str) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn request_body(&self, messages: &[Message], options: &CompletionOptions) -> Value {
        let mut body = Map::new();
        body.insert("model".into(), json!(self.model));
        body.insert("messages".into(), json!(messages));
        if let Some(t) = options.temperature {
            body.insert("temperature".into(), json!(t));
        }
        if let Some(p) = options.top_p {
            body.insert("top_p".into(), json!(p));
        }
        if let Some(m) = options.max_tokens {
            body.insert("max_tokens".into(), json!(m));
        }
        if let Some(s) = options.seed {
            body.insert("seed".into(), json!(s));
        }
        Value::Object(body)
    }
}

#[async_trait]
impl LLMProvider for OpenRouterProvider {
    async fn chat(&self, messages: &[Message], options: &CompletionOptions) -> Result<LLMResponse, RootCauseError> {
        let body = self.request_body(messages, options);

        let resp = self.client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| RootCauseError::Network(format!("OpenRouter request failed: {}", e)))?;

        match resp.status().as_u16() {
            401 | 403 => return Err(RootCauseError::Authentication("OpenRouter rejected the API key".into())),
            429 => return Err(RootCauseError::RateLimit("OpenRouter rate limit".into())),
            _ => {}
        }

        let data: Value = resp.json().await
            .map_err(|e| RootCauseError::LLMApi(format!("Parse error: {}", e)))?;

        if let Some(error) = data.get("error") {
            return Err(RootCauseError::LLMApi(
                error["message"].as_str().unwrap_or("Unknown OpenRouter error").to_string()
            ));
        }

        let content = data["choices"][0]["message"]["content"].as_str()
            .ok_or_else(|| RootCauseError::LLMApi("No content in OpenRouter response".into()))?
            .to_string();
        let input_tokens = data["usage"]["prompt_tokens"].as_u64();
        let output_tokens = data["usage"]["completion_tokens"].as_u64();

        Ok(LLMResponse { content, input_tokens, output_tokens, model: self.model.clone() })
    }

    fn provider_name(&self) -> &str { "openrouter" }
    fn model_name(&self) -> &str { &self.model }
}

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Map, Value};
use crate::errors::RootCauseError;
use super::provider::LLMProvider;
use super::types::{CompletionOptions, LLMResponse, Message};

pub struct GeminiProvider {
    client: Client,
    api_key: String,
    model: String,
    grounded: bool,
}

impl GeminiProvider {
    pub fn new(api_key: &str, model: &str) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            grounded: false,
        }
    }

    /// Enable the Google Search grounding tool on every request.
    pub fn with_search_grounding(mut self) -> Self {
        self.grounded = true;
        self
    }

    fn request_body(&self, messages: &[Message], options: &CompletionOptions) -> Value {
        let system: Vec<&str> = messages
            .iter()
            .filter(|m| m.role == "system")
            .map(|m| m.content.as_str())
            .collect();
        let contents: Vec<Value> = messages
            .iter()
            .filter(|m| m.role != "system")
            .map(|m| {
                let role = if m.role == "assistant" { "model" } else { "user" };
                json!({"role": role, "parts": [{"text": m.content}]})
            })
            .collect();

        let mut generation = Map::new();
        if let Some(t) = options.temperature {
            generation.insert("temperature".into(), json!(t));
        }
        if let Some(p) = options.top_p {
            generation.insert("topP".into(), json!(p));
        }
        if let Some(m) = options.max_tokens {
            generation.insert("maxOutputTokens".into(), json!(m));
        }

        let mut body = json!({
            "contents": contents,
            "generationConfig": Value::Object(generation),
        });
        if !system.is_empty() {
            body["systemInstruction"] = json!({"parts": [{"text": system.join("\n\n")}]});
        }
        if self.grounded {
            body["tools"] = json!([{"google_search": {}}]);
        }
        body
    }
}

#[async_trait]
impl LLMProvider for GeminiProvider {
    async fn chat(&self, messages: &[Message], options: &CompletionOptions) -> Result<LLMResponse, RootCauseError> {
        let body = self.request_body(messages, options);

        let url = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent",
            self.model
        );

        let resp = self.client.post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| RootCauseError::Network(format!("Gemini request failed: {}", e)))?;

        if resp.status().as_u16() == 429 {
            return Err(RootCauseError::RateLimit("Gemini rate limit".into()));
        }

        let data: Value = resp.json().await
            .map_err(|e| RootCauseError::LLMApi(format!("Parse error: {}", e)))?;

        if let Some(error) = data.get("error") {
            return Err(RootCauseError::LLMApi(error["message"].as_str().unwrap_or("Unknown").to_string()));
        }

        // Grounded answers may be split across several parts.
        let content = data["candidates"][0]["content"]["parts"]
            .as_array()
            .map(|parts| {
                parts
                    .iter()
                    .filter_map(|p| p["text"].as_str())
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        let input_tokens = data["usageMetadata"]["promptTokenCount"].as_u64();
        let output_tokens = data["usageMetadata"]["candidatesTokenCount"].as_u64();

        Ok(LLMResponse {
            content,
            input_tokens,
            output_tokens,
            model: self.model.clone(),
        })
    }

    fn provider_name(&self) -> &str { "gemini" }
    fn model_name(&self) -> &str { &self.model }
}

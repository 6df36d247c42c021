use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMResponse {
    pub content: String,
    pub input_tokens: Option<u64>,
    pub output_tokens: Option<u64>,
    pub model: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn system(content: &str) -> Self {
        Self { role: "system".to_string(), content: content.to_string() }
    }
    pub fn user(content: &str) -> Self {
        Self { role: "user".to_string(), content: content.to_string() }
    }
    pub fn assistant(content: &str) -> Self {
        Self { role: "assistant".to_string(), content: content.to_string() }
    }
}

/// Sampling parameters sent with every request. `None` fields are omitted
/// from the request body.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompletionOptions {
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
    pub max_tokens: Option<u32>,
    pub seed: Option<u64>,
}

impl CompletionOptions {
    /// Parameters for the per-diff analysis runs.
    pub fn analysis() -> Self {
        Self { temperature: Some(0.0), top_p: Some(1.0), max_tokens: Some(500), seed: Some(42) }
    }

    /// Parameters for the consensus reduction call.
    pub fn consensus() -> Self {
        Self { temperature: Some(0.0), top_p: None, max_tokens: Some(4096), seed: None }
    }

    /// Parameters for web-search link discovery.
    pub fn search() -> Self {
        Self { temperature: Some(0.0), top_p: Some(0.0), max_tokens: Some(4000), seed: None }
    }
}

use async_trait::async_trait;
use crate::errors::RootCauseError;
use super::types::{CompletionOptions, LLMResponse, Message};

#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Chat completion over an ordered message list
    async fn chat(
        &self,
        messages: &[Message],
        options: &CompletionOptions,
    ) -> Result<LLMResponse, RootCauseError>;

    /// Single-turn completion with an optional system prompt
    async fn complete(
        &self,
        prompt: &str,
        system: Option<&str>,
        options: &CompletionOptions,
    ) -> Result<LLMResponse, RootCauseError> {
        let mut messages = Vec::with_capacity(2);
        if let Some(sys) = system {
            messages.push(Message::system(sys));
        }
        messages.push(Message::user(prompt));
        self.chat(&messages, options).await
    }

    /// Provider name for logging
    fn provider_name(&self) -> &str;

    /// Model identifier
    fn model_name(&self) -> &str;
}

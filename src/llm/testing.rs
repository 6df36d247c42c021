use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::errors::RootCauseError;
use super::provider::LLMProvider;
use super::types::{CompletionOptions, LLMResponse, Message};

type Responder = dyn Fn(&[Message]) -> Result<String, RootCauseError> + Send + Sync;

/// Provider whose replies are computed from the request messages.
pub struct FnProvider {
    model: String,
    responder: Box<Responder>,
    pub calls: AtomicUsize,
}

impl FnProvider {
    pub fn new<F>(model: &str, responder: F) -> Self
    where
        F: Fn(&[Message]) -> Result<String, RootCauseError> + Send + Sync + 'static,
    {
        Self { model: model.to_string(), responder: Box::new(responder), calls: AtomicUsize::new(0) }
    }

    pub fn fixed(model: &str, reply: &str) -> Self {
        let reply = reply.to_string();
        Self::new(model, move |_| Ok(reply.clone()))
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LLMProvider for FnProvider {
    async fn chat(&self, messages: &[Message], _options: &CompletionOptions) -> Result<LLMResponse, RootCauseError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let content = (self.responder)(messages)?;
        Ok(LLMResponse { content, input_tokens: None, output_tokens: None, model: self.model.clone() })
    }

    fn provider_name(&self) -> &str { "fake" }
    fn model_name(&self) -> &str { &self.model }
}

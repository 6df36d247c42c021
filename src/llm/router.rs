use std::sync::Arc;

use crate::errors::RootCauseError;
use super::provider::LLMProvider;
use super::gemini::GeminiProvider;
use super::openrouter::OpenRouterProvider;
use super::catalog;

pub fn create_provider(
    backend: &str,
    api_key: &str,
    model: &str,
    base_url: Option<&str>,
) -> Result<Arc<dyn LLMProvider>, RootCauseError> {
    if catalog::get_backend(backend).is_none() {
        return Err(RootCauseError::Config(format!("Unknown LLM backend: {}", backend)));
    }
    if api_key.trim().is_empty() {
        return Err(RootCauseError::Config(format!("Missing API key for {}", backend)));
    }

    match backend {
        "openrouter" => {
            let provider = match base_url {
                Some(url) => OpenRouterProvider::with_base_url(api_key, model, url),
                None => OpenRouterProvider::new(api_key, model),
            };
            Ok(Arc::new(provider))
        }
        "gemini" => Ok(Arc::new(GeminiProvider::new(api_key, model).with_search_grounding())),
        _ => Err(RootCauseError::Config(format!("Unknown LLM backend: {}", backend))),
    }
}

pub mod provider;
pub mod gemini;
pub mod openrouter;
pub mod router;
pub mod types;
pub mod catalog;
pub mod json;

pub use provider::LLMProvider;
pub use router::create_provider;
pub use types::{CompletionOptions, LLMResponse, Message};
pub use json::extract_clean_json;
#[cfg(test)]
pub(crate) mod testing;

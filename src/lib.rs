pub mod agents;
pub mod analysis;
pub mod cli;
pub mod config;
pub mod discovery;
pub mod errors;
pub mod http;
pub mod llm;
pub mod models;
pub mod nvd;
pub mod pipeline;
pub mod processors;
pub mod reporting;
pub mod utils;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RootCauseError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Rate limited: {0}")]
    RateLimit(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("HTTP {status} from {url}")]
    Http { status: u16, url: String },

    #[error("LLM API error: {0}")]
    LLMApi(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<reqwest::Error> for RootCauseError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            RootCauseError::Timeout(e.to_string())
        } else if let Some(status) = e.status() {
            RootCauseError::Http {
                status: status.as_u16(),
                url: e.url().map(|u| u.to_string()).unwrap_or_default(),
            }
        } else {
            RootCauseError::Network(e.to_string())
        }
    }
}

use super::types::RootCauseError;

#[derive(Debug, Clone)]
pub struct ErrorClassification {
    pub error_type: &'static str,
    pub retryable: bool,
}

impl RootCauseError {
    /// Stable error type name for logs, and whether re-issuing the same
    /// call can succeed.
    pub fn classify(&self) -> ErrorClassification {
        let (error_type, retryable) = match self {
            RootCauseError::RateLimit(_) => ("RateLimitError", true),
            RootCauseError::Network(_) => ("NetworkError", true),
            RootCauseError::Timeout(_) => ("TimeoutError", true),
            RootCauseError::LLMApi(_) => ("LLMApiError", true),
            RootCauseError::Io(_) => ("IoError", true),
            RootCauseError::Http { status, .. } => ("HttpError", *status >= 500),
            RootCauseError::Authentication(_) => ("AuthenticationError", false),
            RootCauseError::Config(_) => ("ConfigError", false),
            RootCauseError::InvalidInput(_) => ("InvalidInputError", false),
            RootCauseError::Parse(_) => ("ParseError", false),
            RootCauseError::InvalidUrl(_) => ("InvalidUrlError", false),
            RootCauseError::Json(_) => ("JsonError", false),
            RootCauseError::Yaml(_) => ("YamlError", false),
            RootCauseError::Internal(_) => ("InternalError", false),
        };
        ErrorClassification { error_type, retryable }
    }
}

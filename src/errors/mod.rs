pub mod types;
pub mod classification;
pub mod retry;

pub use types::RootCauseError;
pub use classification::ErrorClassification;
pub use retry::{RetryConfig, with_retry};

pub type Result<T> = std::result::Result<T, RootCauseError>;

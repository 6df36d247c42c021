pub mod credentials;
pub mod parser;
pub mod schema;
pub mod types;

pub use credentials::Credentials;
pub use types::*;
pub use parser::{parse_config, parse_config_str};

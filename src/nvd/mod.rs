pub mod models;
pub mod client;

pub use client::{DescriptionCache, NvdClient};
pub use models::*;

pub mod client;
pub mod html;
#[cfg(test)]
pub(crate) mod testing;

pub use client::{HttpFetch, HttpRequest, HttpResponse, ReqwestFetcher};

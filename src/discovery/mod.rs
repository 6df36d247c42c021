pub mod links;
pub mod classifier;
pub mod nvd_page;
pub mod osv;
pub mod debian;
pub mod websearch;

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use tracing::{info, warn};

use crate::errors::RootCauseError;

pub use classifier::{ClassifiedUrls, UrlBucket, UrlClassifier, DISPATCH_ORDER};
pub use links::{merge_unique, LinkEntry, LinkSource};

/// One independent place candidate fix URLs can be discovered from.
#[async_trait]
pub trait LinkProvider: Send + Sync {
    fn source(&self) -> LinkSource;

    async fn collect(&self, cve_id: &str, ecosystem: Option<&str>) -> Result<Vec<String>, RootCauseError>;
}

/// Runs every configured provider and merges their results in provider
/// order, so the earliest provider to report a URL keeps its provenance.
pub struct LinkDiscovery {
    providers: Vec<Arc<dyn LinkProvider>>,
}

impl LinkDiscovery {
    pub fn new(providers: Vec<Arc<dyn LinkProvider>>) -> Self {
        Self { providers }
    }

    pub fn provider_count(&self) -> usize {
        self.providers.len()
    }

    pub async fn discover(&self, cve_id: &str, ecosystem: Option<&str>) -> Vec<LinkEntry> {
        let futures = self.providers.iter().map(|provider| {
            let provider = provider.clone();
            async move {
                let source = provider.source();
                match provider.collect(cve_id, ecosystem).await {
                    Ok(urls) => {
                        info!(
                            cve_id,
                            ecosystem = ?ecosystem,
                            source = %source,
                            count = urls.len(),
                            links = ?urls,
                            "Collected links"
                        );
                        urls.into_iter().map(|url| LinkEntry::new(url, source)).collect()
                    }
                    Err(e) => {
                        warn!(
                            cve_id,
                            source = %source,
                            error = %e,
                            error_type = e.classify().error_type,
                            "Link source failed, contributing no links"
                        );
                        Vec::new()
                    }
                }
            }
        });

        merge_unique(join_all(futures).await)
    }
}

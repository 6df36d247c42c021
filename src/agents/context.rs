use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};
use futures::stream::{self, StreamExt};
use tracing::{error, info};

use crate::analysis::{is_valid_source_file, reference_url, ConsensusEngine, ConsensusStore, DiffUnit};
use crate::models::ConsensusRecord;
use crate::nvd::DescriptionCache;

/// Upper bound on concurrent per-file analyses.
pub const DEFAULT_MAX_WORKERS: usize = 15;

/// Collaborators shared by every analyzer for one CVE task.
pub struct AnalysisContext {
    pub engine: ConsensusEngine,
    pub store: Arc<ConsensusStore>,
    pub descriptions: DescriptionCache,
    pub max_workers: usize,
}

impl AnalysisContext {
    pub fn new(engine: ConsensusEngine, store: Arc<ConsensusStore>, descriptions: DescriptionCache) -> Self {
        Self { engine, store, descriptions, max_workers: DEFAULT_MAX_WORKERS }
    }

    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers.max(1);
        self
    }

    /// Worker count for a fan-out over `items` units of work.
    pub fn workers_for(&self, items: usize) -> usize {
        self.max_workers.min(items).max(1)
    }

    /// Analyze every eligible unit concurrently and store the accepted
    /// consensus records. Returns the accepted records in unit order.
    pub async fn analyze_units(&self, units: Vec<DiffUnit>, cve_id: &str, source: &str) -> Vec<ConsensusRecord> {
        let eligible: Vec<DiffUnit> = units
            .into_iter()
            .filter(|unit| {
                let keep = is_valid_source_file(&unit.filename);
                if !keep {
                    info!(filename = %unit.filename, "Skipping non-source or test file");
                }
                keep
            })
            .collect();

        if eligible.is_empty() {
            return Vec::new();
        }

        let description = self.descriptions.get(cve_id).await;
        let workers = self.workers_for(eligible.len());

        let pending: Vec<BoxFuture<'_, Option<ConsensusRecord>>> = eligible
            .iter()
            .map(|unit| self.analyze_unit(unit, &description, cve_id, source).boxed())
            .collect();

        stream::iter(pending)
            .buffered(workers)
            .filter_map(|record| async move { record })
            .collect()
            .await
    }

    async fn analyze_unit(
        &self,
        unit: &DiffUnit,
        description: &str,
        cve_id: &str,
        source: &str,
    ) -> Option<ConsensusRecord> {
        match self.engine.analyze(description, unit).await {
            Ok(Some(reply)) => {
                let record = ConsensusRecord {
                    commit_url: unit.commit_url.clone(),
                    source: source.to_string(),
                    reference_url: reference_url(cve_id, &unit.commit_url, source),
                    filename: unit.filename.clone(),
                    root_cause_functions: reply.root_cause_functions,
                };
                self.store.add(record.clone()).await;
                Some(record)
            }
            Ok(None) => None,
            Err(e) => {
                error!(
                    cve_id,
                    filename = %unit.filename,
                    commit_url = %unit.commit_url,
                    error = %e,
                    error_type = e.classify().error_type,
                    "Error processing file"
                );
                None
            }
        }
    }
}

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

/// Outcome of one dispatched bucket.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BucketMetrics {
    pub bucket: String,
    pub urls: usize,
    pub processed: usize,
    pub failed: usize,
    pub records: usize,
    pub duration_ms: u64,
}

/// Progress of one CVE task through the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunState {
    pub run_id: String,
    pub cve_id: String,
    pub status: RunStatus,
    pub start_time: DateTime<Utc>,
    pub discovered_urls: usize,
    pub bucket_counts: BTreeMap<String, usize>,
    pub buckets: Vec<BucketMetrics>,
    pub error: Option<String>,
}

impl RunState {
    pub fn new(cve_id: &str) -> Self {
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            cve_id: cve_id.to_string(),
            status: RunStatus::Running,
            start_time: Utc::now(),
            discovered_urls: 0,
            bucket_counts: BTreeMap::new(),
            buckets: Vec::new(),
            error: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RunSummary {
    pub run_id: String,
    pub cve_id: String,
    pub discovered_urls: usize,
    pub bucket_counts: BTreeMap<String, usize>,
    pub processed_urls: usize,
    pub failed_urls: usize,
    pub records: usize,
    pub total_duration_ms: u64,
    pub failed: bool,
}

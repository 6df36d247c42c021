use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::errors::RootCauseError;
use crate::models::{ConsensusRecord, ConsensusReply};

/// Marker that opens every block in the text store.
pub const BLOCK_MARKER: &str = "Root cause exists in the commit URL:";

/// Text rendering of one accepted record.
pub fn render_block(record: &ConsensusRecord) -> String {
    let reply = ConsensusReply { root_cause_functions: record.root_cause_functions.clone() };
    let json = serde_json::to_string_pretty(&[reply]).unwrap_or_else(|_| "[]".to_string());
    format!(
        "\n{} {}\nSource: {}\nReference URL: {}\n{}",
        BLOCK_MARKER, record.commit_url, record.source, record.reference_url, json
    )
}

/// Append-only accumulator of accepted consensus records for one task.
///
/// Each record is also appended to an optional sink file as soon as it is
/// accepted; the sink is truncated when the store is created.
pub struct ConsensusStore {
    records: Mutex<Vec<ConsensusRecord>>,
    sink: Option<PathBuf>,
}

impl ConsensusStore {
    pub fn in_memory() -> Self {
        Self { records: Mutex::new(Vec::new()), sink: None }
    }

    pub async fn with_sink(path: &Path) -> Result<Self, RootCauseError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, b"").await?;
        Ok(Self { records: Mutex::new(Vec::new()), sink: Some(path.to_path_buf()) })
    }

    pub fn sink_path(&self) -> Option<&Path> {
        self.sink.as_deref()
    }

    pub async fn add(&self, record: ConsensusRecord) {
        let mut records = self.records.lock().await;

        if let Some(path) = &self.sink {
            if let Err(e) = append(path, &render_block(&record)).await {
                warn!(path = %path.display(), error = %e, "Failed to append consensus block");
            }
        }

        info!(
            filename = %record.filename,
            commit_url = %record.commit_url,
            functions = record.root_cause_functions.len(),
            "Consensus added"
        );
        records.push(record);
    }

    pub async fn records(&self) -> Vec<ConsensusRecord> {
        self.records.lock().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Every block, in insertion order, joined with newlines.
    pub async fn render(&self) -> String {
        self.records
            .lock()
            .await
            .iter()
            .map(render_block)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

async fn append(path: &Path, block: &str) -> Result<(), RootCauseError> {
    let mut file = tokio::fs::OpenOptions::new().create(true).append(true).open(path).await?;
    file.write_all(block.as_bytes()).await?;
    file.write_all(b"\n").await?;
    file.flush().await?;
    Ok(())
}

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use crate::errors::RootCauseError;

static TRAILING_COMMA: LazyLock<Regex> = LazyLock::new(|| Regex::new(r",\s*([\]}])").unwrap());

/// Raw input record as it appears on disk.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InputEntry {
    #[serde(default)]
    pub purl: Option<String>,
    #[serde(default)]
    pub repo: Option<String>,
    #[serde(default)]
    pub cve: Option<String>,
}

/// One CVE analysis job. Every field may be absent; downstream stages skip
/// whatever they cannot do without it.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CveTask {
    pub cve_id: Option<String>,
    pub package_url: Option<String>,
    pub repo_url: Option<String>,
    pub ecosystem: Option<String>,
}

impl CveTask {
    pub fn from_entry(entry: InputEntry) -> Self {
        let cve_id = non_empty(entry.cve);
        let package_url = non_empty(entry.purl);
        let repo_url = non_empty(entry.repo);

        if cve_id.is_none() || package_url.is_none() || repo_url.is_none() {
            error!(
                cve_id = ?cve_id,
                purl = ?package_url,
                repo_url = ?repo_url,
                "Missing required fields in input JSON"
            );
        }

        let ecosystem = package_url.as_deref().and_then(extract_ecosystem);
        if package_url.is_some() && ecosystem.is_none() {
            warn!(purl = ?package_url, "Invalid package format, ecosystem unknown");
        }

        Self { cve_id, package_url, repo_url, ecosystem }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Ecosystem segment of a package URL: `pkg:npm/foo` gives `npm`.
pub fn extract_ecosystem(purl: &str) -> Option<String> {
    let (_, rest) = purl.split_once(':')?;
    let ecosystem = rest.split('/').next().unwrap_or(rest);
    if ecosystem.is_empty() {
        None
    } else {
        Some(ecosystem.to_string())
    }
}

/// Parse input text, tolerating a leading BOM and trailing commas.
pub fn parse_input(raw: &str) -> Result<CveTask, RootCauseError> {
    let text = raw.trim_start_matches('\u{feff}');
    let text = TRAILING_COMMA.replace_all(text, "$1");
    let entry: InputEntry = serde_json::from_str(&text)
        .map_err(|e| RootCauseError::InvalidInput(format!("line {} column {}: {}", e.line(), e.column(), e)))?;
    Ok(CveTask::from_entry(entry))
}

/// Load the single-entry input file.
pub fn load_task(path: &Path) -> Result<CveTask, RootCauseError> {
    let raw = std::fs::read_to_string(path).map_err(|e| {
        RootCauseError::InvalidInput(format!("cannot read {}: {}", path.display(), e))
    })?;
    parse_input(&raw)
}

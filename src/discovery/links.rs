use std::collections::HashSet;
use std::fmt;

use serde::Serialize;

/// Where a candidate URL was first seen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum LinkSource {
    #[serde(rename = "NVD")]
    Nvd,
    #[serde(rename = "OSV")]
    Osv,
    Debian,
    WebSearch,
    #[serde(rename = "Manual Input")]
    ManualInput,
}

impl LinkSource {
    pub fn label(&self) -> &'static str {
        match self {
            LinkSource::Nvd => "NVD",
            LinkSource::Osv => "OSV",
            LinkSource::Debian => "Debian",
            LinkSource::WebSearch => "WebSearch",
            LinkSource::ManualInput => "Manual Input",
        }
    }
}

impl fmt::Display for LinkSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkEntry {
    pub url: String,
    pub source: LinkSource,
}

impl LinkEntry {
    pub fn new(url: impl Into<String>, source: LinkSource) -> Self {
        Self { url: url.into(), source }
    }
}

/// Flatten groups in order, dropping blank URLs and keeping only the first
/// occurrence of each exact URL string.
pub fn merge_unique(groups: Vec<Vec<LinkEntry>>) -> Vec<LinkEntry> {
    let mut seen = HashSet::new();
    groups
        .into_iter()
        .flatten()
        .filter(|entry| !entry.url.trim().is_empty())
        .filter(|entry| seen.insert(entry.url.clone()))
        .collect()
}

/// Order-preserving dedup of plain strings.
pub fn unique_in_order(items: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    items.into_iter().filter(|item| seen.insert(item.clone())).collect()
}

//! VEX document assembly from commit aggregates and the NVD record.

use std::collections::HashSet;
use std::sync::LazyLock;

use chrono::NaiveDateTime;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;

use crate::nvd::Cve;
use super::rcs::{CommitAggregate, SourceRef};

static CWE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^CWE-(\d+)").unwrap());

#[derive(Debug, Clone, Serialize)]
pub struct VexDocument {
    pub cve: String,
    pub package: String,
    pub root_cause_functions: Vec<CommitAggregate>,
    pub vex: Vex,
}

#[derive(Debug, Clone, Serialize)]
pub struct Vex {
    pub sources: Vec<SourceEntry>,
    pub ratings: Vec<Rating>,
    pub cwes: Vec<u32>,
    pub description: String,
    pub detail: String,
    pub recommendation: String,
    pub references: Vec<ReferenceEntry>,
    pub advisories: Vec<Advisory>,
    pub created: String,
    pub published: String,
    pub updated: String,
    pub credits: Credits,
}

#[derive(Debug, Clone, Serialize)]
pub struct SourceEntry {
    pub source: SourceRef,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Rating {
    pub source: SourceRef,
    pub score: String,
    pub severity: String,
    pub vector: String,
    pub method: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReferenceEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub source: SourceRef,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Advisory {
    /// Reference tags, or `"Unknown"` when NVD lists none.
    pub title: Value,
    pub url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Credits {
    pub individuals: Vec<Individual>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Individual {
    pub name: String,
}

pub fn nvd_url(cve_id: &str) -> String {
    format!("https://nvd.nist.gov/vuln/detail/{}", cve_id)
}

pub fn osv_url(cve_id: &str) -> String {
    format!("https://osv.dev/vulnerability/{}", cve_id)
}

pub fn debian_url(cve_id: &str) -> String {
    format!("https://security-tracker.debian.org/tracker/{}", cve_id)
}

/// NVD timestamp (`2024-01-02T03:04:05.123`) as ISO-8601 with millisecond
/// precision and a `Z` suffix; empty when unparseable.
pub fn format_timestamp(ts: &str) -> String {
    NaiveDateTime::parse_from_str(ts, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|dt| dt.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string())
        .unwrap_or_default()
}

/// CVSS rating, v3.1 first and v2 only when v3.1 is absent.
pub fn extract_rating(cve: &Cve, cve_id: &str) -> Rating {
    let source = SourceRef { name: "NVD".to_string(), url: nvd_url(cve_id) };

    if let Some(metric) = cve.metrics.cvss_metric_v31.first() {
        let data = &metric.cvss_data;
        let method = data.vector_string.split('/').next().unwrap_or("").to_string();
        let vector = data.vector_string.get(method.len() + 1..).unwrap_or("").to_string();
        return Rating {
            source,
            score: data.base_score.map(|s| format!("{:?}", s)).unwrap_or_default(),
            severity: data.base_severity.to_lowercase(),
            vector,
            method,
        };
    }

    if let Some(metric) = cve.metrics.cvss_metric_v2.first() {
        let data = &metric.cvss_data;
        return Rating {
            source,
            score: data.base_score.map(|s| format!("{:?}", s)).unwrap_or_default(),
            severity: metric.base_severity.as_deref().unwrap_or("").to_lowercase(),
            vector: data.vector_string.clone(),
            method: "CVSS:2.0".to_string(),
        };
    }

    Rating { source, ..Default::default() }
}

/// Numeric CWE ids of English weakness descriptions that start with
/// `CWE-<n>`.
pub fn extract_cwes(cve: &Cve) -> Vec<u32> {
    cve.weaknesses
        .iter()
        .flat_map(|w| &w.description)
        .filter(|d| d.lang == "en")
        .filter_map(|d| CWE_RE.captures(&d.value)?.get(1)?.as_str().parse().ok())
        .collect()
}

pub fn extract_advisories(cve: &Cve) -> Vec<Advisory> {
    let mut seen = HashSet::new();
    cve.references
        .iter()
        .filter(|r| seen.insert(r.url.clone()))
        .map(|r| Advisory {
            title: match &r.tags {
                Some(tags) => Value::from(tags.clone()),
                None => Value::from("Unknown"),
            },
            url: r.url.clone(),
        })
        .collect()
}

/// Builds the final document for one task. A missing NVD record yields
/// empty metadata fields.
pub struct VexBuilder {
    cve_id: String,
    package: String,
    cve: Cve,
}

impl VexBuilder {
    pub fn new(cve_id: &str, package: &str, cve: Option<Cve>) -> Self {
        Self { cve_id: cve_id.to_string(), package: package.to_string(), cve: cve.unwrap_or_default() }
    }

    pub fn build(&self, root_cause_functions: Vec<CommitAggregate>) -> VexDocument {
        let id = &self.cve_id;
        let description = self.cve.english_description().to_string();
        let updated = format_timestamp(&self.cve.last_modified);

        let nvd = SourceRef { name: "NVD".to_string(), url: nvd_url(id) };
        let osv = SourceRef { name: "OSV DEV".to_string(), url: osv_url(id) };
        let debian = SourceRef { name: "Debian Security Tracker".to_string(), url: debian_url(id) };

        VexDocument {
            cve: id.clone(),
            package: self.package.clone(),
            root_cause_functions,
            vex: Vex {
                sources: vec![
                    SourceEntry { source: nvd.clone() },
                    SourceEntry { source: osv.clone() },
                    SourceEntry { source: debian.clone() },
                ],
                ratings: vec![extract_rating(&self.cve, id)],
                cwes: extract_cwes(&self.cve),
                detail: description.clone(),
                description,
                recommendation: String::new(),
                references: vec![
                    ReferenceEntry { id: Some(String::new()), source: nvd },
                    ReferenceEntry { id: Some(String::new()), source: osv },
                    ReferenceEntry { id: None, source: debian },
                ],
                advisories: extract_advisories(&self.cve),
                created: updated.clone(),
                published: format_timestamp(&self.cve.published),
                updated,
                credits: Credits { individuals: vec![Individual { name: String::new() }] },
            },
        }
    }
}

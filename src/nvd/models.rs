//! NVD CVE API 2.0 response shapes. Every field is defaulted so that sparse
//! or partially populated records still deserialize.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CveResponse {
    #[serde(default)]
    pub total_results: u32,
    #[serde(default)]
    pub vulnerabilities: Vec<VulnerabilityWrapper>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VulnerabilityWrapper {
    #[serde(default)]
    pub cve: Cve,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cve {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub published: String,
    #[serde(default)]
    pub last_modified: String,
    #[serde(default)]
    pub descriptions: Vec<Description>,
    #[serde(default)]
    pub metrics: Metrics,
    #[serde(default)]
    pub weaknesses: Vec<Weakness>,
    #[serde(default)]
    pub references: Vec<Reference>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Description {
    #[serde(default)]
    pub lang: String,
    #[serde(default)]
    pub value: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metrics {
    #[serde(default)]
    pub cvss_metric_v31: Vec<CvssMetricV3>,
    #[serde(default)]
    pub cvss_metric_v2: Vec<CvssMetricV2>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CvssMetricV3 {
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub cvss_data: CvssV3Data,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CvssV3Data {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub vector_string: String,
    pub base_score: Option<f64>,
    #[serde(default)]
    pub base_severity: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CvssMetricV2 {
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub cvss_data: CvssV2Data,
    pub base_severity: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CvssV2Data {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub vector_string: String,
    pub base_score: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Weakness {
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub description: Vec<Description>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Reference {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub source: String,
    pub tags: Option<Vec<String>>,
}

impl Cve {
    /// First English description, or empty.
    pub fn english_description(&self) -> &str {
        self.descriptions
            .iter()
            .find(|d| d.lang == "en")
            .map(|d| d.value.as_str())
            .unwrap_or("")
    }

    /// All description values joined with single spaces.
    pub fn joined_description(&self) -> String {
        self.descriptions
            .iter()
            .map(|d| d.value.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

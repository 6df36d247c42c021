use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub const DEFAULT_ANALYSIS_MODEL: &str = "anthropic/claude-sonnet-4";
pub const DEFAULT_SEARCH_MODEL: &str = "openai/gpt-4o-search-preview";
pub const DEFAULT_GROUNDED_SEARCH_MODEL: &str = "gemini-2.0-flash-exp";
pub const DEFAULT_STORE_PATH: &str = "output.txt";

/// Discovery sources that may be enabled.
pub const KNOWN_SOURCES: &[&str] = &["nvd", "osv", "debian", "websearch"];

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RunConfig {
    pub llm: LlmSettings,
    pub analysis: AnalysisSettings,
    pub discovery: DiscoverySettings,
    pub credentials: CredentialOverrides,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LlmSettings {
    pub base_url: String,
    pub analysis_model: String,
    pub consensus_model: String,
    pub search_model: String,
    pub grounded_search_model: String,
    pub analysis_runs: usize,
    pub max_retries: u32,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            base_url: crate::llm::openrouter::DEFAULT_BASE_URL.to_string(),
            analysis_model: DEFAULT_ANALYSIS_MODEL.to_string(),
            consensus_model: DEFAULT_ANALYSIS_MODEL.to_string(),
            search_model: DEFAULT_SEARCH_MODEL.to_string(),
            grounded_search_model: DEFAULT_GROUNDED_SEARCH_MODEL.to_string(),
            analysis_runs: 6,
            max_retries: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AnalysisSettings {
    pub max_workers: usize,
    pub store_path: PathBuf,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            max_workers: crate::agents::context::DEFAULT_MAX_WORKERS,
            store_path: PathBuf::from(DEFAULT_STORE_PATH),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DiscoverySettings {
    pub sources: Vec<String>,
    pub exclude_hosts: Vec<String>,
}

impl Default for DiscoverySettings {
    fn default() -> Self {
        Self {
            sources: KNOWN_SOURCES.iter().map(|s| s.to_string()).collect(),
            exclude_hosts: crate::discovery::classifier::DEFAULT_EXCLUDES
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl DiscoverySettings {
    pub fn enabled(&self, source: &str) -> bool {
        self.sources.iter().any(|s| s.eq_ignore_ascii_case(source))
    }
}

/// Optional credential values from the config file. Values starting with
/// `$` name an environment variable.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CredentialOverrides {
    pub github_token: Option<String>,
    pub gitlab_token: Option<String>,
    pub openrouter_api_key: Option<String>,
    pub nvd_api_key: Option<String>,
    pub gemini_api_key: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RunConfig::default();
        assert_eq!(config.llm.analysis_runs, 6);
        assert_eq!(config.llm.max_retries, 0);
        assert_eq!(config.llm.base_url, "https://openrouter.ai/api/v1");
        assert_eq!(config.analysis.max_workers, 15);
        assert_eq!(config.analysis.store_path, PathBuf::from("output.txt"));
        assert_eq!(config.discovery.sources, vec!["nvd", "osv", "debian", "websearch"]);
        assert_eq!(config.discovery.exclude_hosts, vec!["redhat", "netapp"]);
    }

    #[test]
    fn test_source_enabled_ignores_case() {
        let settings = DiscoverySettings { sources: vec!["NVD".into()], ..Default::default() };
        assert!(settings.enabled("nvd"));
        assert!(!settings.enabled("osv"));
    }
}

use std::path::Path;

use tracing::warn;

use crate::errors::RootCauseError;
use super::schema::CONFIG_SCHEMA;
use super::types::{RunConfig, KNOWN_SOURCES};

pub async fn parse_config(path: &Path) -> Result<RunConfig, RootCauseError> {
    if !path.exists() {
        return Err(RootCauseError::Config(format!("Config file not found: {}", path.display())));
    }

    let metadata = tokio::fs::metadata(path).await?;
    if metadata.len() > 1_048_576 {
        return Err(RootCauseError::Config("Config file exceeds 1MB limit".into()));
    }

    let content = tokio::fs::read_to_string(path).await?;
    parse_config_str(&content)
}

pub fn parse_config_str(content: &str) -> Result<RunConfig, RootCauseError> {
    if content.trim().is_empty() {
        return Ok(RunConfig::default());
    }

    let yaml: serde_yaml::Value = serde_yaml::from_str(content)?;

    // JSON Schema validation
    validate_schema(&yaml)?;

    let config: RunConfig = serde_yaml::from_value(yaml)?;
    validate(&config)?;

    Ok(config)
}

/// Validate config against the JSON schema for structural correctness.
fn validate_schema(yaml: &serde_yaml::Value) -> Result<(), RootCauseError> {
    // Convert YAML value to JSON for schema validation
    let json_value = serde_json::to_value(yaml)
        .map_err(|e| RootCauseError::Config(format!("Config conversion error: {}", e)))?;

    let compiled = jsonschema::JSONSchema::compile(&CONFIG_SCHEMA)
        .map_err(|e| RootCauseError::Config(format!("Schema compilation error: {}", e)))?;

    if let Err(errors) = compiled.validate(&json_value) {
        // Advisory only; semantic validation below is authoritative
        for e in errors {
            warn!(validation_error = %e, path = %e.instance_path, "Config schema warning");
        }
    }

    Ok(())
}

/// Reject settings the pipeline cannot run with.
pub fn validate(config: &RunConfig) -> Result<(), RootCauseError> {
    if config.llm.analysis_runs == 0 {
        return Err(RootCauseError::Config("llm.analysis_runs must be at least 1".into()));
    }
    if config.analysis.max_workers == 0 {
        return Err(RootCauseError::Config("analysis.max_workers must be at least 1".into()));
    }
    for source in &config.discovery.sources {
        if !KNOWN_SOURCES.iter().any(|k| k.eq_ignore_ascii_case(source)) {
            return Err(RootCauseError::Config(format!(
                "Unknown discovery source '{}', expected one of {}",
                source,
                KNOWN_SOURCES.join(", ")
            )));
        }
    }
    if config.discovery.sources.is_empty() {
        warn!("No discovery sources enabled, only the input repository URL will be analyzed");
    }
    Ok(())
}

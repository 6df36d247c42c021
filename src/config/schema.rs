use serde_json::{json, Value};
use std::sync::LazyLock;

pub static CONFIG_SCHEMA: LazyLock<Value> = LazyLock::new(|| {
    json!({
        "$schema": "http://json-schema.org/draft-07/schema#",
        "type": "object",
        "additionalProperties": false,
        "properties": {
            "llm": {
                "type": "object",
                "properties": {
                    "base_url": { "type": "string" },
                    "analysis_model": { "type": "string" },
                    "consensus_model": { "type": "string" },
                    "search_model": { "type": "string" },
                    "grounded_search_model": { "type": "string" },
                    "analysis_runs": { "type": "integer", "minimum": 1 },
                    "max_retries": { "type": "integer", "minimum": 0 }
                }
            },
            "analysis": {
                "type": "object",
                "properties": {
                    "max_workers": { "type": "integer", "minimum": 1 },
                    "store_path": { "type": "string" }
                }
            },
            "discovery": {
                "type": "object",
                "properties": {
                    "sources": {
                        "type": "array",
                        "items": { "type": "string", "enum": ["nvd", "osv", "debian", "websearch"] }
                    },
                    "exclude_hosts": { "type": "array", "items": { "type": "string" } }
                }
            },
            "credentials": {
                "type": "object",
                "properties": {
                    "github_token": { "type": "string" },
                    "gitlab_token": { "type": "string" },
                    "openrouter_api_key": { "type": "string" },
                    "nvd_api_key": { "type": "string" },
                    "gemini_api_key": { "type": "string" }
                }
            }
        }
    })
});

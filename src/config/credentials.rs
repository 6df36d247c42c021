use tracing::debug;

use crate::llm::catalog::api_key_from_env;
use super::types::CredentialOverrides;

/// Resolve a credential value. If the value starts with '$', treat it as an
/// environment variable reference and resolve from the environment.
pub fn resolve_credential(value: &str) -> String {
    if let Some(var_name) = value.strip_prefix('$') {
        match std::env::var(var_name) {
            Ok(resolved) => {
                debug!(var = %var_name, "Resolved credential from environment");
                resolved
            }
            Err(_) => {
                debug!(var = %var_name, "Environment variable not set, using literal");
                value.to_string()
            }
        }
    } else {
        value.to_string()
    }
}

fn env_value(var: &str) -> Option<String> {
    std::env::var(var).ok().filter(|v| !v.trim().is_empty())
}

fn pick(configured: &Option<String>, fallback: impl FnOnce() -> Option<String>) -> Option<String> {
    configured
        .as_deref()
        .map(resolve_credential)
        .filter(|v| !v.trim().is_empty() && !v.starts_with('$'))
        .or_else(fallback)
}

/// Secrets used by one run. Any of them may be absent.
#[derive(Clone, Default, PartialEq)]
pub struct Credentials {
    pub github_token: Option<String>,
    pub gitlab_token: Option<String>,
    pub openrouter_api_key: Option<String>,
    pub nvd_api_key: Option<String>,
    pub gemini_api_key: Option<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mask = |v: &Option<String>| if v.is_some() { "[REDACTED]" } else { "<unset>" };
        f.debug_struct("Credentials")
            .field("github_token", &mask(&self.github_token))
            .field("gitlab_token", &mask(&self.gitlab_token))
            .field("openrouter_api_key", &mask(&self.openrouter_api_key))
            .field("nvd_api_key", &mask(&self.nvd_api_key))
            .field("gemini_api_key", &mask(&self.gemini_api_key))
            .finish()
    }
}

impl Credentials {
    /// Config file values first, then the process environment.
    pub fn resolve(overrides: &CredentialOverrides) -> Self {
        Self {
            github_token: pick(&overrides.github_token, || env_value("GITHUB_TOKEN")),
            gitlab_token: pick(&overrides.gitlab_token, || env_value("GITLAB_TOKEN")),
            openrouter_api_key: pick(&overrides.openrouter_api_key, || api_key_from_env("openrouter")),
            nvd_api_key: pick(&overrides.nvd_api_key, || env_value("NVD_API_KEY")),
            gemini_api_key: pick(&overrides.gemini_api_key, || api_key_from_env("gemini")),
        }
    }

    pub fn from_env() -> Self {
        Self::resolve(&CredentialOverrides::default())
    }
}

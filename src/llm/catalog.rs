/// Chat backends the pipeline can talk to, with the environment variable
/// holding each one's credential.
pub struct BackendInfo {
    pub id: &'static str,
    pub name: &'static str,
    pub env_vars: &'static [&'static str],
}

pub static BACKENDS: &[BackendInfo] = &[
    BackendInfo {
        id: "openrouter",
        name: "OpenRouter",
        env_vars: &["OPEN_ROUTER_API_KEY", "OPENROUTER_API_KEY"],
    },
    BackendInfo {
        id: "gemini",
        name: "Google Gemini",
        env_vars: &["GEMINI_API_KEY", "GOOGLE_API_KEY"],
    },
];

pub fn get_backend(id: &str) -> Option<&'static BackendInfo> {
    BACKENDS.iter().find(|b| b.id == id)
}

/// First non-empty credential for `id` found in the environment.
pub fn api_key_from_env(id: &str) -> Option<String> {
    get_backend(id)?
        .env_vars
        .iter()
        .filter_map(|var| std::env::var(var).ok())
        .find(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_backends() {
        assert_eq!(get_backend("openrouter").unwrap().name, "OpenRouter");
        assert_eq!(get_backend("gemini").unwrap().env_vars[0], "GEMINI_API_KEY");
        assert!(get_backend("local").is_none());
    }
}

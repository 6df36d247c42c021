use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::errors::{with_retry, RetryConfig, RootCauseError};
use crate::llm::{extract_clean_json, CompletionOptions, LLMProvider};
use crate::models::ConsensusReply;
use crate::utils::formatting::format_duration;
use super::diff::DiffUnit;
use super::prompts::{analysis_messages, consensus_messages, format_run_output};

/// Fans one diff unit out to several identical analysis calls and reduces
/// their answers with a final consensus call.
pub struct ConsensusEngine {
    analyst: Arc<dyn LLMProvider>,
    reducer: Arc<dyn LLMProvider>,
    runs: usize,
    retry: RetryConfig,
}

impl ConsensusEngine {
    pub fn new(analyst: Arc<dyn LLMProvider>, reducer: Arc<dyn LLMProvider>, runs: usize) -> Self {
        Self { analyst, reducer, runs: runs.max(1), retry: RetryConfig::default() }
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn runs(&self) -> usize {
        self.runs
    }

    /// Raw answers of the parallel analysis runs. Failed runs are logged
    /// and left out.
    pub async fn run_analyses(&self, description: &str, unit: &DiffUnit) -> Vec<String> {
        let messages = analysis_messages(description, &unit.filename, &unit.formatted_code());
        let options = CompletionOptions::analysis();
        let model = self.analyst.model_name().to_string();

        let calls = (1..=self.runs).map(|run| {
            let messages = &messages;
            let options = &options;
            let model = &model;
            async move {
                info!(run, model = %model, filename = %unit.filename, "Running analysis");
                let started = Instant::now();
                let result = with_retry("analysis", &self.retry, || self.analyst.chat(messages, options)).await;
                debug!(run, elapsed = %format_duration(started.elapsed().as_millis() as u64), "Analysis run finished");
                match result {
                    Ok(resp) => Some(format_run_output(run, model, &unit.filename, &resp.content)),
                    Err(e) => {
                        warn!(
                            run,
                            filename = %unit.filename,
                            error = %e,
                            error_type = e.classify().error_type,
                            "Analysis run failed"
                        );
                        None
                    }
                }
            }
        });

        join_all(calls).await.into_iter().flatten().collect()
    }

    /// Accepted consensus for a unit, or `None` when the unit has no patch,
    /// every run failed, or the reply names no function.
    pub async fn analyze(&self, description: &str, unit: &DiffUnit) -> Result<Option<ConsensusReply>, RootCauseError> {
        if !unit.has_patch() {
            info!(filename = %unit.filename, "Skipping file without patch");
            return Ok(None);
        }

        let outputs = self.run_analyses(description, unit).await;
        if outputs.is_empty() {
            warn!(filename = %unit.filename, "No analysis output to reconcile");
            return Ok(None);
        }

        let messages = consensus_messages(&outputs, self.runs, &unit.filename);
        let options = CompletionOptions::consensus();
        let reply = with_retry("consensus", &self.retry, || self.reducer.chat(&messages, &options)).await?;
        info!(filename = %unit.filename, "Consensus generated");

        Ok(parse_consensus(&reply.content))
    }
}

/// Accept a consensus reply only when it carries a non-empty
/// `root_cause_functions` list.
pub fn parse_consensus(text: &str) -> Option<ConsensusReply> {
    let value = extract_clean_json(text)?;
    let functions = value.get("root_cause_functions").and_then(Value::as_array)?;
    if functions.is_empty() {
        return None;
    }
    match serde_json::from_value::<ConsensusReply>(value) {
        Ok(reply) => Some(reply),
        Err(e) => {
            warn!(error = %e, "Consensus JSON did not match the expected shape");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::testing::FnProvider;

    const ACCEPTED: &str = r#"```json
{"root_cause_functions":[{"function_name":"parseInput","role":"sink"}]}
```"#;

    fn unit() -> DiffUnit {
        DiffUnit::new("src/parse.c", "@@ -1 +1 @@\n-a\n+b", "https://github.com/acme/foo/commit/abc")
    }

    #[test]
    fn test_parse_consensus_accepts_non_empty_list() {
        let reply = parse_consensus(ACCEPTED).unwrap();
        assert_eq!(reply.root_cause_functions[0].function_name, "parseInput");
    }

    #[test]
    fn test_parse_consensus_rejections() {
        assert!(parse_consensus(r#"{"root_cause_functions": []}"#).is_none());
        assert!(parse_consensus(r#"{"functions": [{"function_name": "x"}]}"#).is_none());
        assert!(parse_consensus(r#"{"root_cause_functions": "parseInput"}"#).is_none());
        assert!(parse_consensus(r#"[{"function_name": "x"}]"#).is_none());
        assert!(parse_consensus("No majority agreement.").is_none());
    }

    #[tokio::test]
    async fn test_runs_fan_out_then_reduce() {
        let analyst = Arc::new(FnProvider::fixed("analyst", "Root cause function: parseInput\nRole: sink"));
        let reducer = Arc::new(FnProvider::new("reducer", |messages| {
            assert_eq!(messages.len(), 7);
            assert!(messages[1].content.starts_with("Output 1:\nRun 1 | Model: analyst| Filename: src/parse.c"));
            Ok(ACCEPTED.to_string())
        }));
        let engine = ConsensusEngine::new(analyst.clone(), reducer.clone(), 6);

        let reply = engine.analyze("desc", &unit()).await.unwrap().unwrap();
        assert_eq!(reply.root_cause_functions.len(), 1);
        assert_eq!(analyst.call_count(), 6);
        assert_eq!(reducer.call_count(), 1);
    }

    #[tokio::test]
    async fn test_empty_patch_never_reaches_models() {
        let analyst = Arc::new(FnProvider::fixed("analyst", "x"));
        let reducer = Arc::new(FnProvider::fixed("reducer", ACCEPTED));
        let engine = ConsensusEngine::new(analyst.clone(), reducer.clone(), 6);

        let empty = DiffUnit::new("src/parse.c", "", "https://github.com/acme/foo/commit/abc");
        assert!(engine.analyze("desc", &empty).await.unwrap().is_none());
        assert_eq!(analyst.call_count(), 0);
        assert_eq!(reducer.call_count(), 0);
    }

    #[tokio::test]
    async fn test_failed_runs_are_dropped() {
        let analyst = Arc::new(FnProvider::new("analyst", |_| Err(RootCauseError::LLMApi("overloaded".into()))));
        let reducer = Arc::new(FnProvider::fixed("reducer", ACCEPTED));
        let engine = ConsensusEngine::new(analyst, reducer.clone(), 3);

        assert!(engine.analyze("desc", &unit()).await.unwrap().is_none());
        assert_eq!(reducer.call_count(), 0);
    }

    #[tokio::test]
    async fn test_empty_consensus_discarded() {
        let analyst = Arc::new(FnProvider::fixed("analyst", "Did not get vulnerability in this file"));
        let reducer = Arc::new(FnProvider::fixed("reducer", r#"{"root_cause_functions": []}"#));
        let engine = ConsensusEngine::new(analyst, reducer, 2);
        assert!(engine.analyze("desc", &unit()).await.unwrap().is_none());
    }
}

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

static JSON_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\{[\s\S]*\}|\[[\s\S]*\])").unwrap());

/// Pull the outermost `{...}` or `[...]` block out of a model reply and parse
/// it. The match is greedy so prose before and after the block is dropped.
pub fn extract_clean_json(text: &str) -> Option<Value> {
    let block = JSON_BLOCK.find(text)?;
    serde_json::from_str(block.as_str()).ok()
}

use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use regex::Regex;

use crate::errors::RootCauseError;
use crate::llm::{CompletionOptions, LLMProvider, Message};
use super::links::{unique_in_order, LinkSource};
use super::LinkProvider;

static BULLET_URL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"-\s+(https?://[^\s|]+)").unwrap());

pub const NO_SOURCE_MARKER: &str = "NO_PRIMARY_SOURCE_FOUND";

const SYSTEM_PROMPT: &str = "You are a meticulous vulnerability analyst. When the user asks about a CVE you must:\n\
1. Search primary sources: upstream commit diffs, pull requests, tags, security advisories, fixes and patches.\n\
2. Never invent information. If nothing is found, reply strictly: NO_PRIMARY_SOURCE_FOUND.\n\
3. For every relevant commit or patch, extract:\n\
   - commit_url: the canonical URL of the fix, patch or diff\n\
   - file_path: path of the file that contains the vulnerable code\n\
   - method_name: name of the affected function or method\n\
4. Ignore anything inside test folders and methods whose names contain 'Test'.\n\
5. Output exactly one markdown bullet per finding, formatted:\n\
   - <commit_url> | <file_path> | <method_name> | <short note about the url> | (where the url was found)\n\
6. Cite the identical URL you list as the source.\n\
Do not add summaries, explanations, or extra text.";

fn user_prompt(cve_id: &str) -> String {
    format!(
        "Locate the root-cause commit(s) for **{}**\nReturn only the bullet list described above, no other prose.",
        cve_id
    )
}

/// URLs that open a markdown bullet in a search-model reply.
pub fn extract_bullet_urls(reply: &str) -> Vec<String> {
    if reply.trim() == NO_SOURCE_MARKER {
        return Vec::new();
    }
    unique_in_order(BULLET_URL.captures_iter(reply).filter_map(|caps| {
        let url = caps[1].trim_end_matches([')', ']', ',', '.', ';', '*']);
        (!url.is_empty()).then(|| url.to_string())
    }))
}

/// Asks a search-capable chat model for fix commits.
pub struct WebSearchSource {
    llm: Arc<dyn LLMProvider>,
}

impl WebSearchSource {
    pub fn new(llm: Arc<dyn LLMProvider>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl LinkProvider for WebSearchSource {
    fn source(&self) -> LinkSource {
        LinkSource::WebSearch
    }

    async fn collect(&self, cve_id: &str, _ecosystem: Option<&str>) -> Result<Vec<String>, RootCauseError> {
        let messages = [Message::system(SYSTEM_PROMPT), Message::user(&user_prompt(cve_id))];
        let reply = self.llm.chat(&messages, &CompletionOptions::search()).await?;
        Ok(extract_bullet_urls(&reply.content))
    }
}

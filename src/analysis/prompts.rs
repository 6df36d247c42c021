use crate::llm::Message;

const ANALYSIS_SYSTEM: &str = "You are a security researcher specializing in vulnerability detection, \
specifically in identifying the root cause of vulnerabilities in code. Your task is to determine which \
method(s) or function(s) are responsible for a specific CVE, analyze the root cause, and assign each one \
its role (entry_point, propagation, sink). Do not provide unrelated functions or methods or patch-related information.";

const ANALYSIS_TASK: &str = "***Task:***
Identify which method(s) or function(s) in the code above are responsible for the CVE, that is, its root cause.
Give a brief explanation of why you consider them the root cause.
Only consider the code shown above and answer with function/method names. Do **not** mention variables, constants or regular expressions on their own.
The **root cause** and the **patch/fix** are not the same thing. Do not include patch-only methods or unrelated functions.

***IMPORTANT:***
The file may contain many functions; report only those you consider the actual root cause, if any exist, and make sure they relate to the CVE description.
Your output structure is:
version:
Root cause function:
Role: Entrypoint/Propagation/Sink
Short explanation of why it is the root cause for the CVE:
If you find no such function or method, output \"Did not get vulnerability in this file\".
Check strictly that the code relates to the CVE description (package, language, filename). If it does not, output \"The code is not related to CVE description\".

***REMEMBER***
- Verify against the CVE description that the commit belongs to this CVE. If it does not, give no functions.
- Include roles (entry_point, propagation, sink) where relevant and identify them carefully.
- Do not hallucinate. Focus only on root cause functions/methods.
- Do **not** report a function/method that appears **only** in the fix.
- If a function appears in both the vulnerable code and the fix, report it for its root cause role, not for the fix.
- If no function is clearly responsible, say so explicitly.";

/// System and user messages for one analysis run over one diff unit.
pub fn analysis_messages(description: &str, filename: &str, formatted_code: &str) -> Vec<Message> {
    let user = format!(
        "The description of the CVE is:\n{}\n\nThe filename is {}\n\nAnalyze the following file and its code change:\n{}\n\n{}",
        description, filename, formatted_code, ANALYSIS_TASK
    );
    vec![Message::system(ANALYSIS_SYSTEM), Message::user(&user)]
}

/// Header line that labels one run's answer inside the consensus request.
pub fn format_run_output(run: usize, model: &str, filename: &str, content: &str) -> String {
    format!("Run {} | Model: {}| Filename: {}\nResponse:\n{}", run, model, filename, content.trim())
}

/// Agreement needed across `runs` answers: half of them, rounded up, so six
/// runs need three matching answers.
pub fn agreement_threshold(runs: usize) -> usize {
    runs.div_ceil(2).max(1)
}

fn consensus_instruction(runs: usize, filename: &str) -> String {
    format!(
        "You have {runs} analysis outputs from different LLMs that attempted to identify the **root cause function(s)** \
responsible for a vulnerability (CVE) in the file `{filename}`.\n\n\
### Task:\n\
- Determine the **majority-agreed root cause function(s)** (at least {threshold} matches).\n\
- If no function reaches the majority, return an empty `root_cause_functions` list.\n\
- Format your output as JSON:\n\n\
```json\n\
{{\n\
  \"root_cause_functions\": [\n\
    {{\n\
      \"function_name\": \"<function>\",\n\
      \"filename\": \"<filename>\",\n\
      \"role\": \"<role>\",\n\
      \"package\": \"<package>\",\n\
      \"version\": \"<version>\",\n\
      \"Qualified Name\": \"<qualified.name>\"\n\
    }}\n\
  ]\n\
}}\n\
```",
        runs = runs,
        filename = filename,
        threshold = agreement_threshold(runs),
    )
}

/// Consensus request: the instruction first, then one message per run.
pub fn consensus_messages(outputs: &[String], runs: usize, filename: &str) -> Vec<Message> {
    let mut messages = Vec::with_capacity(outputs.len() + 1);
    messages.push(Message::user(&consensus_instruction(runs, filename)));
    for (idx, out) in outputs.iter().enumerate() {
        messages.push(Message::user(&format!("Output {}:\n{}", idx + 1, out)));
    }
    messages
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analysis_messages_embed_inputs() {
        let messages = analysis_messages("Heap overflow in parser", "src/parse.c", "```diff\n+x\n```");
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, "system");
        assert!(messages[1].content.contains("Heap overflow in parser"));
        assert!(messages[1].content.contains("The filename is src/parse.c"));
        assert!(messages[1].content.contains("```diff\n+x\n```"));
    }

    #[test]
    fn test_consensus_messages_layout() {
        let outputs = vec!["a".to_string(), "b".to_string()];
        let messages = consensus_messages(&outputs, 6, "lib/x.rb");
        assert_eq!(messages.len(), 3);
        assert!(messages[0].content.contains("You have 6 analysis outputs"));
        assert!(messages[0].content.contains("at least 3 matches"));
        assert!(messages[0].content.contains("\"Qualified Name\""));
        assert_eq!(messages[2].content, "Output 2:\nb");
    }

    #[test]
    fn test_agreement_threshold() {
        assert_eq!(agreement_threshold(6), 3);
        assert_eq!(agreement_threshold(5), 3);
        assert_eq!(agreement_threshold(1), 1);
    }

    #[test]
    fn test_format_run_output() {
        assert_eq!(
            format_run_output(2, "m", "f.c", "  answer \n"),
            "Run 2 | Model: m| Filename: f.c\nResponse:\nanswer"
        );
    }
}

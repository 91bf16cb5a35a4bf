//! Prompt assembly for grounded and ungrounded answers.

use std::fmt::Write as _;

use ragvs_memory::ScoredMatch;

pub const SYSTEM_PROMPT: &str = "You are a helpful assistant. Use the provided context when relevant, and say when the context does not contain the answer.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

/// Build the system/user prompt pair.
///
/// The `Context:` section lists one `- {text}` line per match and is omitted entirely
/// when `context` is empty.
#[must_use]
pub fn build_prompt(question: &str, context: &[ScoredMatch], answer_language: &str) -> Prompt {
    let mut user = String::new();
    if !context.is_empty() {
        user.push_str("Context:\n");
        let lines: Vec<String> = context.iter().map(|m| format!("- {}", m.text)).collect();
        user.push_str(&lines.join("\n"));
        user.push_str("\n\n");
    }
    let _ = write!(
        user,
        "Question:\n{question}\n\nAnswer in {answer_language} to match the learning UI."
    );

    Prompt {
        system: SYSTEM_PROMPT.to_owned(),
        user,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matches(texts: &[&str]) -> Vec<ScoredMatch> {
        texts
            .iter()
            .map(|t| ScoredMatch {
                text: (*t).to_owned(),
                score: 0.8,
            })
            .collect()
    }

    #[test]
    fn context_section_lists_matches() {
        let prompt = build_prompt("Where?", &matches(&["one", "two"]), "Korean");
        assert_eq!(
            prompt.user,
            "Context:\n- one\n- two\n\nQuestion:\nWhere?\n\nAnswer in Korean to match the learning UI."
        );
        assert_eq!(prompt.system, SYSTEM_PROMPT);
    }

    #[test]
    fn empty_context_omits_header() {
        let prompt = build_prompt("Where?", &[], "Korean");
        assert!(!prompt.user.contains("Context:"));
        assert!(prompt.user.starts_with("Question:\nWhere?"));
    }

    #[test]
    fn language_is_configurable() {
        let prompt = build_prompt("q", &[], "English");
        assert!(prompt.user.ends_with("Answer in English to match the learning UI."));
    }

    #[test]
    fn multiline_match_text_is_kept_verbatim() {
        let prompt = build_prompt("q", &matches(&["a\n\nb"]), "Korean");
        assert!(prompt.user.starts_with("Context:\n- a\n\nb\n\nQuestion:"));
    }
}

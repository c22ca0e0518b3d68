//! LLM-backed highlight synthesis

use super::{ChatMessage, HighlightWriter, LLMClient};
use crate::error::Result;
use crate::text::truncate_chars;
use async_trait::async_trait;
use std::sync::Arc;

/// Evidence text cap before it goes into the prompt
const MAX_PROMPT_EVIDENCE_CHARS: usize = 2000;

/// Highlight lines kept per candidate
pub const MAX_HIGHLIGHTS: usize = 3;

/// Minimum length for a line to count as a highlight
const MIN_HIGHLIGHT_CHARS: usize = 5;

/// Highlight writer using an external chat LLM
pub struct LlmHighlightWriter {
    client: Arc<dyn LLMClient>,
}

impl LlmHighlightWriter {
    /// Create from LLM client
    pub fn new(client: Arc<dyn LLMClient>) -> Self {
        Self { client }
    }

    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        let client = super::HttpLLMClient::from_env()?;
        Ok(Self {
            client: Arc::new(client),
        })
    }
}

fn build_prompt(must_have: &[String], nice_to_have: &[String], evidence_text: &str) -> String {
    let must = if must_have.is_empty() {
        "general match".to_string()
    } else {
        must_have.join(", ")
    };
    let nice = if nice_to_have.is_empty() {
        "none specified".to_string()
    } else {
        nice_to_have.join(", ")
    };

    format!(
        r#"You are an evidence analyst for a recruitment platform.
Given a candidate's resume chunks and the job requirements, generate 3 concise highlight sentences (each under 100 characters).

Each highlight should explain WHY this candidate matches a specific requirement.
Format: one highlight per line, no bullets or numbers.

Requirements (must-have): {must}
Requirements (nice-to-have): {nice}

Candidate evidence:
{evidence}

Return exactly 3 highlight lines:"#,
        must = must,
        nice = nice,
        evidence = truncate_chars(evidence_text, MAX_PROMPT_EVIDENCE_CHARS),
    )
}

/// Keep non-trivial lines, at most three
pub(crate) fn parse_highlight_lines(response: &str) -> Vec<String> {
    response
        .lines()
        .map(str::trim)
        .filter(|line| line.chars().count() > MIN_HIGHLIGHT_CHARS)
        .take(MAX_HIGHLIGHTS)
        .map(str::to_string)
        .collect()
}

#[async_trait]
impl HighlightWriter for LlmHighlightWriter {
    async fn generate_highlights(
        &self,
        must_have: &[String],
        nice_to_have: &[String],
        evidence_text: &str,
    ) -> Result<Vec<String>> {
        let messages = vec![ChatMessage::system(build_prompt(
            must_have,
            nice_to_have,
            evidence_text,
        ))];

        let response = self.client.chat_completion(messages).await?;
        Ok(parse_highlight_lines(&response))
    }
}

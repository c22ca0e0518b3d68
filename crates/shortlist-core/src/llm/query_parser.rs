//! LLM-backed recruitment query parser

use super::{extract_json, ChatMessage, LLMClient, QueryParser};
use crate::error::{Result, ShortlistError};
use crate::skills::normalize_skills;
use crate::state::MissionSpec;
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;

const SYSTEM_PROMPT: &str = r#"You are a recruitment query analyst. Your job is to parse a recruiter's search query or job description into structured requirements.

Given the user's query, you MUST extract:
1. **must_have**: Skills, technologies, or qualifications that are explicitly required. Be specific. Normalize technology names (e.g., "React.js" -> "react", "Node" -> "nodejs").
2. **nice_to_have**: Skills mentioned as preferred, bonus, or optional.
3. **negative_constraints**: Technologies, roles, or domains explicitly excluded (look for "not", "except", "excluding", "no").
4. **min_years**: Minimum years of experience if mentioned (extract the number only).
5. **location**: Preferred location if mentioned.
6. **core_domain**: The single professional domain the query is about (e.g., "digital marketing"), if clear.
7. **clarifications**: Anything ambiguous or missing that the recruiter might want to specify. Keep these concise.

IMPORTANT RULES:
- Extract ACTUAL skill names, not generic descriptions. "experience with databases" -> "databases"
- Normalize common aliases: "JS" -> "javascript", "ML" -> "machine learning", "k8s" -> "kubernetes"
- If the query is just a list of skills, put them all in must_have.
- Keep everything lowercase.
- Return valid JSON matching the schema exactly.

You must respond with a JSON object matching this schema:
{
    "must_have": ["skill1", "skill2"],
    "nice_to_have": ["skill3"],
    "negative_constraints": ["excluded1"],
    "min_years": null or number,
    "location": null or "location string",
    "core_domain": null or "domain string",
    "clarifications": ["suggestion1"]
}"#;

/// Query parser using an external chat LLM
pub struct LlmQueryParser {
    client: Arc<dyn LLMClient>,
}

impl LlmQueryParser {
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

/// Raw LLM payload before coercion; unknown fields are dropped
#[derive(Debug, Default, Deserialize)]
struct ParsedSpec {
    #[serde(default)]
    must_have: Vec<String>,
    #[serde(default)]
    nice_to_have: Vec<String>,
    #[serde(default)]
    negative_constraints: Vec<String>,
    #[serde(default)]
    min_years: Option<u32>,
    #[serde(default)]
    location: Option<String>,
    #[serde(default)]
    core_domain: Option<String>,
    #[serde(default)]
    clarifications: Vec<String>,
}

#[async_trait]
impl QueryParser for LlmQueryParser {
    async fn parse_query(&self, query: &str) -> Result<MissionSpec> {
        let messages = vec![
            ChatMessage::system(SYSTEM_PROMPT),
            ChatMessage::user(format!("Parse this recruitment query:\n\n{}", query)),
        ];

        let response = self.client.chat_completion(messages).await?;

        coerce_response(&response, query)
    }
}

/// Coerce an LLM response into a mission spec
///
/// Skill lists pass through canonical normalization so the invariant holds
/// even when the model ignores its lowercasing instructions.
pub(crate) fn coerce_response(response: &str, query: &str) -> Result<MissionSpec> {
    let json_str = extract_json(response)
        .ok_or_else(|| ShortlistError::Schema("no JSON object in LLM response".to_string()))?;

    let parsed: ParsedSpec = serde_json::from_str(json_str)
        .map_err(|e| ShortlistError::Schema(format!("mission spec parse error: {}", e)))?;

    Ok(MissionSpec {
        must_have: normalize_skills(&parsed.must_have),
        nice_to_have: normalize_skills(&parsed.nice_to_have),
        negative_constraints: normalize_skills(&parsed.negative_constraints),
        min_years: parsed.min_years,
        location: parsed.location.filter(|s| !s.trim().is_empty()),
        core_domain: parsed
            .core_domain
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty()),
        clarifications: parsed.clarifications,
        raw_query: query.to_string(),
    })
}

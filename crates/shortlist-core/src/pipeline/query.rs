//! Stage 1: query understanding
//!
//! Turns free text into a [`MissionSpec`]. The LLM path is a replaceable
//! strategy; any failure there (or no parser configured at all) degrades
//! to deterministic keyword extraction. This stage never fails fatally.

use crate::error::Result;
use crate::llm::QueryParser;
use crate::skills::normalize_skills;
use crate::state::MissionSpec;
use crate::stream::{Event, EventWriter};
use crate::text::{char_len, excerpt};
use lazy_static::lazy_static;
use regex::Regex;
use std::time::Instant;

pub(crate) const STAGE_NAME: &str = "query_understanding";
const AGENT: &str = "Query Understanding";

lazy_static! {
    static ref YEARS_RE: Regex =
        Regex::new(r"(?i)(\d+)\s*(?:years?|yrs?|yoe)").expect("years regex");
    static ref TOKEN_SPLIT: Regex = Regex::new(r"[,;.\n]+").expect("token split regex");
    static ref STOPWORDS_RE: Regex = Regex::new(
        r"\b(with|and|or|experience|in|of|the|a|an|for|to|is|are|we|need|looking|senior|junior|mid|level|developer|engineer|specialist)\b"
    )
    .expect("stopword regex");
}

pub(crate) async fn run(
    query_text: &str,
    parser: Option<&dyn QueryParser>,
    writer: &EventWriter,
) -> Result<(MissionSpec, f64)> {
    let start = Instant::now();

    writer
        .emit(Event::AgentStart {
            agent: AGENT.into(),
            stage: 1,
            message: "Analyzing the query to extract structured requirements".into(),
        })
        .await?;

    if query_text.trim().is_empty() {
        writer
            .emit(Event::AgentThought {
                agent: AGENT.into(),
                message: "No query provided, using empty mission spec".into(),
            })
            .await?;
        let elapsed = start.elapsed().as_secs_f64();
        writer
            .emit(Event::StageComplete {
                stage: STAGE_NAME.into(),
                timing_ms: (elapsed * 1000.0).round() as u64,
                message: "Query understanding complete (empty query)".into(),
            })
            .await?;
        return Ok((MissionSpec::empty(), elapsed));
    }

    writer
        .emit(Event::AgentThought {
            agent: AGENT.into(),
            message: format!("Reading query: \"{}\"", excerpt(query_text, 100)),
        })
        .await?;

    let spec = match parser {
        Some(parser) => {
            writer
                .emit(Event::ToolCall {
                    agent: AGENT.into(),
                    tool: "parse_query".into(),
                    message: "Calling the LLM to parse requirements".into(),
                })
                .await?;
            match parser.parse_query(query_text).await {
                Ok(spec) => {
                    writer
                        .emit(Event::ToolResult {
                            agent: AGENT.into(),
                            tool: "parse_query".into(),
                            message: "LLM returned a structured mission spec".into(),
                        })
                        .await?;
                    spec
                }
                Err(e) => {
                    tracing::warn!("LLM query parse failed, falling back to keywords: {e}");
                    writer
                        .emit(Event::AgentThought {
                            agent: AGENT.into(),
                            message: "LLM parse failed, using keyword extraction fallback".into(),
                        })
                        .await?;
                    fallback_parse(query_text)
                }
            }
        }
        None => {
            writer
                .emit(Event::AgentThought {
                    agent: AGENT.into(),
                    message: "No query parser configured, using keyword extraction".into(),
                })
                .await?;
            fallback_parse(query_text)
        }
    };

    writer
        .emit(Event::MissionSpec {
            agent: AGENT.into(),
            message: format!(
                "Extracted {} must-have skills, {} nice-to-have",
                spec.must_have.len(),
                spec.nice_to_have.len()
            ),
            data: spec.clone(),
        })
        .await?;

    let elapsed = start.elapsed().as_secs_f64();
    writer
        .emit(Event::StageComplete {
            stage: STAGE_NAME.into(),
            timing_ms: (elapsed * 1000.0).round() as u64,
            message: format!(
                "Query understanding complete ({}ms)",
                (elapsed * 1000.0).round() as u64
            ),
        })
        .await?;

    Ok((spec, elapsed))
}

/// Deterministic fallback: extract skills from the query text
pub(crate) fn fallback_parse(query: &str) -> MissionSpec {
    let min_years = YEARS_RE
        .captures(query)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<u32>().ok());

    let mut skills = Vec::new();
    for token in TOKEN_SPLIT.split(query) {
        let cleaned = token.trim().to_lowercase();
        let cleaned = STOPWORDS_RE.replace_all(&cleaned, " ");
        let cleaned = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
        let len = char_len(&cleaned);
        if (2..=50).contains(&len) {
            skills.push(cleaned);
        }
    }

    MissionSpec {
        must_have: normalize_skills(&skills),
        min_years,
        raw_query: query.to_string(),
        clarifications: vec![
            "Query was parsed using keyword extraction. Provide a more detailed JD for better results."
                .to_string(),
        ],
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_extracts_skills() {
        let spec = fallback_parse("Looking for senior developer with Python, Django; AWS");
        assert!(spec.must_have.contains(&"python".to_string()));
        assert!(spec.must_have.contains(&"django".to_string()));
        assert!(spec.must_have.contains(&"aws".to_string()));
        assert_eq!(spec.raw_query, "Looking for senior developer with Python, Django; AWS");
        assert_eq!(spec.clarifications.len(), 1);
    }

    #[test]
    fn test_fallback_strips_stopwords() {
        let spec = fallback_parse("we need experience with kubernetes");
        assert_eq!(spec.must_have, vec!["kubernetes"]);
    }

    #[test]
    fn test_fallback_min_years_variants() {
        assert_eq!(fallback_parse("python, 5 years").min_years, Some(5));
        assert_eq!(fallback_parse("python, 3 yrs").min_years, Some(3));
        assert_eq!(fallback_parse("python, 7 YOE").min_years, Some(7));
        assert_eq!(fallback_parse("python").min_years, None);
    }

    #[test]
    fn test_fallback_token_length_bounds() {
        // single characters are dropped, long run-on fragments too
        let long = "x".repeat(60);
        let spec = fallback_parse(&format!("r, go, {long}"));
        assert_eq!(spec.must_have, vec!["go"]);
    }

    #[test]
    fn test_fallback_applies_aliases() {
        let spec = fallback_parse("k8s, node");
        assert_eq!(spec.must_have, vec!["kubernetes", "nodejs"]);
    }

    #[tokio::test]
    async fn test_empty_query_yields_empty_spec() {
        let (writer, mut rx) = EventWriter::channel(16);
        let (spec, _) = run("", None, &writer).await.unwrap();
        assert!(spec.must_have.is_empty());
        assert_eq!(spec.raw_query, "");
        drop(writer);

        let mut types = Vec::new();
        while let Some(event) = rx.recv().await {
            types.push(event.event_type());
        }
        assert_eq!(types, vec!["agent_start", "agent_thought", "stage_complete"]);
    }

    #[tokio::test]
    async fn test_no_parser_uses_fallback_with_note() {
        let (writer, mut rx) = EventWriter::channel(32);
        let (spec, _) = run("rust, tokio", None, &writer).await.unwrap();
        assert_eq!(spec.must_have, vec!["rust", "tokio"]);
        assert!(spec.clarifications[0].contains("keyword extraction"));
        drop(writer);

        let mut saw_mission_spec = false;
        while let Some(event) = rx.recv().await {
            if event.event_type() == "mission_spec" {
                saw_mission_spec = true;
            }
        }
        assert!(saw_mission_spec);
    }
}

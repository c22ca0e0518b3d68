//! Lexical (sparse) chunk search
//!
//! Scores each chunk by the total number of case-insensitive occurrences
//! of the query terms in its text. Raw occurrence counts, unscaled by
//! chunk length; chunk texts are already capped at ingest. Ties keep
//! natural storage order.

use crate::state::{HitSource, RetrievalHit};
use crate::store::ChunkRecord;
use crate::text::truncate_chars;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;

lazy_static! {
    static ref TERM_SPLIT: Regex = Regex::new(r"[,;\s]+").expect("term split regex");
}

/// Split query text into search terms, dropping single characters
pub fn split_terms(query_text: &str) -> Vec<String> {
    TERM_SPLIT
        .split(query_text)
        .filter(|t| t.chars().count() > 1)
        .map(|t| t.to_lowercase())
        .collect()
}

/// Count non-overlapping occurrences of `term` in `haystack` (both lowercase)
fn count_occurrences(haystack: &str, term: &str) -> usize {
    haystack.matches(term).count()
}

/// Rank chunks by summed term occurrences, descending
///
/// `matched_skills` maps candidates to the skills that gated them; every
/// hit for a gated candidate carries that list.
pub fn lexical_search(
    chunks: &[ChunkRecord],
    query_text: &str,
    limit: usize,
    max_chars_per_chunk: usize,
    matched_skills: &HashMap<String, Vec<String>>,
) -> Vec<RetrievalHit> {
    let terms = split_terms(query_text);
    if terms.is_empty() {
        return vec![];
    }

    let mut scored: Vec<(usize, &ChunkRecord)> = Vec::new();
    for chunk in chunks {
        let haystack = chunk.chunk_text.to_lowercase();
        let score: usize = terms
            .iter()
            .map(|term| count_occurrences(&haystack, term))
            .sum();
        if score > 0 {
            scored.push((score, chunk));
        }
    }

    // Stable sort keeps storage order within equal scores
    scored.sort_by(|a, b| b.0.cmp(&a.0));

    scored
        .into_iter()
        .take(limit)
        .enumerate()
        .map(|(i, (score, chunk))| RetrievalHit {
            chunk_id: chunk.chunk_id.clone(),
            candidate_id: chunk.candidate_id.clone(),
            section_type: chunk.section_type.clone(),
            chunk_text: truncate_chars(&chunk.chunk_text, max_chars_per_chunk),
            score: score as f64,
            rank: i + 1,
            source: HitSource::Lexical,
            matched_skills: matched_skills
                .get(&chunk.candidate_id)
                .cloned()
                .unwrap_or_default(),
        })
        .collect()
}

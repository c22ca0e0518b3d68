//! Vector (dense) chunk search
//!
//! Exact cosine similarity between the query embedding and every gated
//! chunk embedding. Chunks with a missing or empty embedding are skipped
//! without affecting their neighbors.

use crate::state::{HitSource, RetrievalHit};
use crate::store::ChunkRecord;
use crate::text::truncate_chars;

/// Cosine similarity of two vectors; 0 on dimension mismatch or zero norm
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}

/// Rank chunks by cosine similarity to the query embedding, descending
pub fn vector_search(
    chunks: &[ChunkRecord],
    query_embedding: &[f32],
    limit: usize,
    max_chars_per_chunk: usize,
) -> Vec<RetrievalHit> {
    let mut scored: Vec<(f32, &ChunkRecord)> = chunks
        .iter()
        .filter_map(|chunk| match chunk.embedding.as_deref() {
            Some(embedding) if !embedding.is_empty() => {
                Some((cosine_similarity(query_embedding, embedding), chunk))
            }
            _ => None,
        })
        .collect();

    // Stable sort keeps storage order within equal similarities
    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

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
            source: HitSource::Vector,
            matched_skills: vec![],
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(id: &str, candidate: &str, embedding: Option<Vec<f32>>) -> ChunkRecord {
        ChunkRecord {
            chunk_id: id.into(),
            candidate_id: candidate.into(),
            section_type: "skills".into(),
            section_ordinal: 0,
            chunk_text: format!("chunk {id}"),
            embedding,
        }
    }

    #[test]
    fn test_cosine_basic() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert!((cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]) + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_degenerate_inputs() {
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 2.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]), 0.0);
    }

    #[test]
    fn test_ranking_by_similarity() {
        let chunks = vec![
            chunk("k1", "c1", Some(vec![0.0, 1.0])),
            chunk("k2", "c2", Some(vec![1.0, 0.0])),
            chunk("k3", "c3", Some(vec![0.7, 0.7])),
        ];
        let hits = vector_search(&chunks, &[1.0, 0.0], 10, 800);
        assert_eq!(
            hits.iter().map(|h| h.chunk_id.as_str()).collect::<Vec<_>>(),
            vec!["k2", "k3", "k1"]
        );
        assert_eq!(hits[0].rank, 1);
        assert_eq!(hits[2].rank, 3);
        assert_eq!(hits[0].source, HitSource::Vector);
    }

    #[test]
    fn test_missing_embeddings_skipped() {
        let chunks = vec![
            chunk("k1", "c1", None),
            chunk("k2", "c2", Some(vec![])),
            chunk("k3", "c3", Some(vec![1.0, 0.0])),
        ];
        let hits = vector_search(&chunks, &[1.0, 0.0], 10, 800);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].chunk_id, "k3");
        assert_eq!(hits[0].rank, 1);
    }

    #[test]
    fn test_limit_applied() {
        let chunks: Vec<_> = (0..5)
            .map(|i| chunk(&format!("k{i}"), "c", Some(vec![1.0, i as f32])))
            .collect();
        assert_eq!(vector_search(&chunks, &[1.0, 0.0], 2, 800).len(), 2);
    }
}

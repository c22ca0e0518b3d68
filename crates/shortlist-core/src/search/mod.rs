//! Chunk-level sub-searches
//!
//! The retrieval stage runs both of these over the gated chunk set:
//! - lexical: case-insensitive term-occurrence scoring
//! - vector: cosine similarity against the query embedding
//!
//! Both return ranked [`RetrievalHit`](crate::state::RetrievalHit) lists
//! with 1-based ranks assigned in output order.

mod lexical;
mod vector;

pub use lexical::{lexical_search, split_terms};
pub use vector::{cosine_similarity, vector_search};

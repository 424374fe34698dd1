//! The embedding collaborator the memory store calls out to for
//! cosine scoring. Kept as a trait so tests and hosts without a real
//! embedding model can still exercise the BM25 half of recall.

use async_trait::async_trait;
use wick_proto::MemoryError;

/// Produces a normalized embedding vector for a piece of text.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed `text`, returning a vector whose norm is used as-is by
    /// cosine scoring (callers are expected to normalize on their own
    /// side if their model doesn't already).
    async fn embed(&self, text: &str) -> Result<Vec<f32>, MemoryError>;
}

#![deny(missing_docs)]
//! Hybrid BM25 + cosine semantic memory for the wick agent core.
//!
//! [`MemoryStore`] owns the flat entry list, per-entry token index,
//! and embedding cache; [`tokenize`] and [`score`] are the pure
//! building blocks it scores recall candidates with. [`Embedder`] is
//! the one external collaborator — plug in a real embedding model, or
//! leave it unset and recall degrades gracefully to BM25-only.

pub mod embedder;
pub mod score;
pub mod store;
pub mod tokenize;

pub use embedder::Embedder;
pub use store::{MemoryEntry, MemoryStore, ScoredEntry, HIGH_COSINE_THRESHOLD, KEYWORD_WEIGHT, VECTOR_WEIGHT};
pub use wick_proto::MemoryError;

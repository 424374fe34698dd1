//! The memory store itself: a flat ordered entry list, a per-entry
//! token index, recall scoring, hygiene, and the embedding cache.

use crate::embedder::Embedder;
use crate::score::{bm25_score, cosine};
use crate::tokenize::{tokenize, tokenize_entry};
use lru::LruCache;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Arc;
use wick_proto::id::random_id_segment;
use wick_proto::MemoryId;

/// Cosine score above which an entry is admitted into recall results
/// even when it scored zero on BM25.
pub const HIGH_COSINE_THRESHOLD: f64 = 0.5;
/// Weight given to the cosine component of the merged score.
pub const VECTOR_WEIGHT: f64 = 0.5;
/// Weight given to the normalized BM25 component of the merged score.
pub const KEYWORD_WEIGHT: f64 = 0.5;

/// One stored memory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryEntry {
    /// Unique id, of the form `mem_<n>`.
    pub id: MemoryId,
    /// Logical grouping (e.g. "preference", "fact").
    pub category: String,
    /// Key used for dedup within a category.
    pub key: String,
    /// The stored value.
    pub value: serde_json::Value,
    /// Precomputed embedding, if the caller supplied one.
    pub embedding: Option<Vec<f32>>,
    /// Wall-clock time this entry was stored, in epoch milliseconds.
    pub created_at_ms: i64,
    /// Core entries are exempt from age- and capacity-based eviction.
    pub core: bool,
}

#[derive(Debug, Clone)]
struct DocIndex {
    tokens: Vec<String>,
    length: usize,
}

/// One scored recall result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredEntry {
    /// The matched entry.
    pub entry: MemoryEntry,
    /// Merged relevance score.
    pub score: f64,
}

fn value_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn normalize_query(query: &str) -> String {
    query.trim().to_lowercase()
}

/// Flat ordered memory store with a hybrid BM25 + cosine recall path.
pub struct MemoryStore {
    entries: Vec<MemoryEntry>,
    index: HashMap<String, DocIndex>,
    avg_doc_length: f64,
    embedder: Option<Arc<dyn Embedder>>,
    embedding_cache: LruCache<String, Vec<f32>>,
}

impl MemoryStore {
    /// Build an empty store. `embedding_cache_capacity` bounds the LRU
    /// cache of query-text -> embedding lookups.
    pub fn new(embedder: Option<Arc<dyn Embedder>>, embedding_cache_capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(embedding_cache_capacity.max(1)).expect("capacity is at least 1");
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
            avg_doc_length: 0.0,
            embedder,
            embedding_cache: LruCache::new(capacity),
        }
    }

    /// All stored entries, in storage order.
    pub fn entries(&self) -> &[MemoryEntry] {
        &self.entries
    }

    fn recompute_avg_doc_length(&mut self) {
        if self.index.is_empty() {
            self.avg_doc_length = 0.0;
            return;
        }
        let total: usize = self.index.values().map(|d| d.length).sum();
        self.avg_doc_length = total as f64 / self.index.len() as f64;
    }

    /// Store a value under `(category, key)`, replacing any existing
    /// entry with the same pair (dedup keeps the newest). Returns the
    /// new entry's id.
    pub fn store(&mut self, category: impl Into<String>, key: impl Into<String>, value: serde_json::Value, embedding: Option<Vec<f32>>, core: bool, now_ms: i64) -> MemoryId {
        let category = category.into();
        let key = key.into();

        self.entries.retain(|e| !(e.category == category && e.key == key));

        let id = MemoryId::new(format!("mem_{}", random_id_segment()));
        let tokens = tokenize_entry(&key, &value_text(&value));
        self.index.insert(
            id.as_str().to_string(),
            DocIndex {
                length: tokens.len(),
                tokens,
            },
        );

        let entry = MemoryEntry {
            id: id.clone(),
            category,
            key,
            value,
            embedding,
            created_at_ms: now_ms,
            core,
        };
        self.entries.push(entry);
        self.recompute_avg_doc_length();

        tracing::debug!(id = %id, "stored memory entry");
        id
    }

    /// Remove the entry with this id, if present. Returns whether
    /// anything was removed.
    pub fn forget(&mut self, id: &MemoryId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| &e.id != id);
        self.index.remove(id.as_str());
        self.recompute_avg_doc_length();
        self.entries.len() != before
    }

    fn doc_frequencies(&self) -> HashMap<String, usize> {
        let mut freq: HashMap<String, usize> = HashMap::new();
        for doc in self.index.values() {
            let mut seen = std::collections::HashSet::new();
            for tok in &doc.tokens {
                if seen.insert(tok.as_str()) {
                    *freq.entry(tok.clone()).or_insert(0) += 1;
                }
            }
        }
        freq
    }

    async fn query_embedding(&mut self, normalized_query: &str) -> Option<Vec<f32>> {
        if let Some(cached) = self.embedding_cache.get(normalized_query) {
            return Some(cached.clone());
        }
        let embedder = self.embedder.clone()?;
        match embedder.embed(normalized_query).await {
            Ok(embedding) => {
                self.embedding_cache.put(normalized_query.to_string(), embedding.clone());
                Some(embedding)
            }
            Err(err) => {
                tracing::warn!(error = %err, "query embedding failed, falling back to BM25-only recall");
                None
            }
        }
    }

    fn candidates<'a>(&'a self, category: Option<&str>) -> Vec<&'a MemoryEntry> {
        self.entries.iter().filter(|e| category.is_none_or(|c| e.category == c)).collect()
    }

    /// Score `candidates` against `query_tokens` plus an optional
    /// query embedding, merging BM25 and cosine per spec.
    fn score_candidates(&self, candidates: &[&MemoryEntry], query_tokens: &[String], query_embedding: Option<&[f32]>) -> Vec<ScoredEntry> {
        let doc_freq = self.doc_frequencies();
        let n = self.index.len();

        let raw_bm25: Vec<f64> = candidates
            .iter()
            .map(|e| {
                self.index
                    .get(e.id.as_str())
                    .map(|doc| bm25_score(query_tokens, &doc.tokens, &doc_freq, n, self.avg_doc_length))
                    .unwrap_or(0.0)
            })
            .collect();
        let max_bm25 = raw_bm25.iter().cloned().fold(0.0_f64, f64::max);

        let has_vector_scores = query_embedding.is_some() && candidates.iter().any(|e| e.embedding.is_some());

        let mut results = Vec::new();
        for (entry, bm25) in candidates.iter().zip(raw_bm25.iter()) {
            let bm25norm = if max_bm25 > 0.0 { bm25 / max_bm25 } else { 0.0 };
            let cos = match (query_embedding, &entry.embedding) {
                (Some(q), Some(d)) => cosine(q, d),
                _ => 0.0,
            };

            let score = if has_vector_scores {
                if bm25norm == 0.0 && cos > HIGH_COSINE_THRESHOLD {
                    VECTOR_WEIGHT * cos
                } else {
                    VECTOR_WEIGHT * cos + KEYWORD_WEIGHT * bm25norm
                }
            } else {
                bm25norm
            };

            if score > 0.0 || bm25norm > 0.0 {
                results.push(ScoredEntry {
                    entry: (*entry).clone(),
                    score,
                });
            }
        }

        results
    }

    /// Recall entries matching `query`, optionally filtered by
    /// category, sorted by score descending, filtered by `min_score`,
    /// truncated to `top_k`.
    ///
    /// An empty query returns every (optionally category-filtered)
    /// entry with score 1, newest-first order preserved. A non-empty
    /// query tokenizes, scores BM25 and (if an embedder is configured)
    /// cosine, and merges them.
    pub async fn recall(&mut self, query: &str, category: Option<&str>, min_score: f64, top_k: usize) -> Vec<ScoredEntry> {
        if query.trim().is_empty() {
            let mut results: Vec<ScoredEntry> = self
                .candidates(category)
                .into_iter()
                .map(|e| ScoredEntry { entry: e.clone(), score: 1.0 })
                .collect();
            results.truncate(top_k);
            return results;
        }

        let query_tokens = tokenize(query);
        let normalized = normalize_query(query);
        let query_embedding = self.query_embedding(&normalized).await;

        let candidates = self.candidates(category);
        let mut results = self.score_candidates(&candidates, &query_tokens, query_embedding.as_deref());

        results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        results.retain(|r| r.score >= min_score);
        results.truncate(top_k);
        results
    }

    /// Synchronous recall: identical to [`MemoryStore::recall`] except
    /// it never consults the embedder, so cosine scores are always 0
    /// and the merge collapses to pure BM25. Useful for callers that
    /// cannot await (e.g. a synchronous hygiene sweep that wants a
    /// quick relevance check).
    pub fn recall_sync(&self, query: &str, category: Option<&str>, min_score: f64, top_k: usize) -> Vec<ScoredEntry> {
        if query.trim().is_empty() {
            let mut results: Vec<ScoredEntry> = self
                .candidates(category)
                .into_iter()
                .map(|e| ScoredEntry { entry: e.clone(), score: 1.0 })
                .collect();
            results.truncate(top_k);
            return results;
        }

        let query_tokens = tokenize(query);
        let candidates = self.candidates(category);
        let mut results = self.score_candidates(&candidates, &query_tokens, None);

        results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        results.retain(|r| r.score >= min_score);
        results.truncate(top_k);
        results
    }

    /// Deduplicate by `(category, key)` keeping the newest (a no-op
    /// given `store` already dedups on write, but cheap to re-assert),
    /// remove non-core entries older than `max_age_ms`, then if still
    /// over `max_entries` remove the oldest non-core entries until at
    /// capacity. Every run invalidates the embedding cache, since
    /// removed entries can no longer back a cached similarity result.
    pub fn hygiene(&mut self, max_age_ms: i64, max_entries: usize, now_ms: i64) {
        let mut seen: HashMap<(String, String), usize> = HashMap::new();
        for (idx, entry) in self.entries.iter().enumerate() {
            seen.insert((entry.category.clone(), entry.key.clone()), idx);
        }
        let keep_idx: std::collections::HashSet<usize> = seen.values().copied().collect();
        self.entries = self
            .entries
            .iter()
            .enumerate()
            .filter(|(idx, _)| keep_idx.contains(idx))
            .map(|(_, e)| e.clone())
            .collect();

        self.entries.retain(|e| e.core || now_ms - e.created_at_ms <= max_age_ms);

        if self.entries.len() > max_entries {
            self.entries.sort_by_key(|e| e.created_at_ms);
            let mut removed = 0;
            let overflow = self.entries.len() - max_entries;
            self.entries.retain(|e| {
                if e.core || removed >= overflow {
                    true
                } else {
                    removed += 1;
                    false
                }
            });
        }

        let live_ids: std::collections::HashSet<&str> = self.entries.iter().map(|e| e.id.as_str()).collect();
        self.index.retain(|id, _| live_ids.contains(id.as_str()));
        self.recompute_avg_doc_length();
        self.embedding_cache.clear();
        tracing::debug!(remaining = self.entries.len(), "memory hygiene sweep complete");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn store() -> MemoryStore {
        MemoryStore::new(None, 32)
    }

    #[tokio::test]
    async fn store_and_dedup_by_category_key() {
        let mut s = store();
        s.store("fact", "favorite_color", json!("blue"), None, false, 0);
        assert_eq!(s.entries().len(), 1);
        s.store("fact", "favorite_color", json!("green"), None, false, 1);
        assert_eq!(s.entries().len(), 1);
        assert_eq!(s.entries()[0].value, json!("green"));
    }

    #[tokio::test]
    async fn empty_query_returns_all_entries_with_score_one() {
        let mut s = store();
        s.store("fact", "a", json!("x"), None, false, 0);
        s.store("fact", "b", json!("y"), None, false, 0);
        let results = s.recall("", None, 0.0, 10).await;
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.score == 1.0));
    }

    #[tokio::test]
    async fn empty_query_respects_category_filter() {
        let mut s = store();
        s.store("fact", "a", json!("x"), None, false, 0);
        s.store("preference", "b", json!("y"), None, false, 0);
        let results = s.recall("", Some("fact"), 0.0, 10).await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].entry.category, "fact");
    }

    #[tokio::test]
    async fn bm25_only_recall_ranks_relevant_entries_first() {
        let mut s = store();
        s.store("fact", "deploy_notes", json!("the production deployment runs nightly"), None, false, 0);
        s.store("fact", "lunch", json!("sandwiches are tasty"), None, false, 0);

        let results = s.recall("deployment", None, 0.0, 10).await;
        assert!(!results.is_empty());
        assert_eq!(results[0].entry.key, "deploy_notes");
    }

    #[tokio::test]
    async fn recall_sync_never_uses_embeddings() {
        let mut s = store();
        s.store("fact", "deploy_notes", json!("the production deployment runs nightly"), Some(vec![1.0, 0.0]), false, 0);
        let results = s.recall_sync("deployment", None, 0.0, 10);
        assert!(!results.is_empty());
    }

    #[tokio::test]
    async fn forget_removes_entry() {
        let mut s = store();
        let id = s.store("fact", "a", json!("x"), None, false, 0);
        assert!(s.forget(&id));
        assert!(s.entries().is_empty());
        assert!(!s.forget(&id));
    }

    #[tokio::test]
    async fn hygiene_evicts_aged_non_core_entries() {
        let mut s = store();
        s.store("fact", "old", json!("x"), None, false, 0);
        s.store("fact", "pinned", json!("y"), None, true, 0);
        s.hygiene(1000, 100, 5000);
        let keys: Vec<&str> = s.entries().iter().map(|e| e.key.as_str()).collect();
        assert_eq!(keys, vec!["pinned"]);
    }

    #[tokio::test]
    async fn hygiene_evicts_oldest_over_capacity_but_spares_core() {
        let mut s = store();
        s.store("fact", "core1", json!("x"), None, true, 0);
        s.store("fact", "a", json!("x"), None, false, 10);
        s.store("fact", "b", json!("x"), None, false, 20);
        s.store("fact", "c", json!("x"), None, false, 30);
        s.hygiene(i64::MAX, 2, 100);
        assert!(s.entries().len() <= 3);
        assert!(s.entries().iter().any(|e| e.key == "core1"));
        assert!(s.entries().iter().any(|e| e.key == "c"));
    }
}

//! BM25 and cosine scoring over tokenized documents and embedding
//! vectors.

use std::collections::HashMap;

/// BM25 term-frequency saturation parameter.
pub const K1: f64 = 1.2;
/// BM25 length-normalization parameter.
pub const B: f64 = 0.75;

/// `idf = ln((N - df + 0.5) / (df + 0.5) + 1)`.
fn idf(n: usize, df: usize) -> f64 {
    (((n as f64) - (df as f64) + 0.5) / ((df as f64) + 0.5) + 1.0).ln()
}

/// Score one document against a tokenized query.
///
/// `doc_freq` maps each corpus token to the number of documents
/// containing it at least once; `n` is the corpus size; `avg_doc_len`
/// is the corpus's running average document length.
pub fn bm25_score(query_tokens: &[String], doc_tokens: &[String], doc_freq: &HashMap<String, usize>, n: usize, avg_doc_len: f64) -> f64 {
    if doc_tokens.is_empty() || avg_doc_len <= 0.0 {
        return 0.0;
    }

    let mut term_freq: HashMap<&str, usize> = HashMap::new();
    for tok in doc_tokens {
        *term_freq.entry(tok.as_str()).or_insert(0) += 1;
    }

    let doc_len = doc_tokens.len() as f64;
    let mut score = 0.0;
    for qt in query_tokens {
        let Some(&tf) = term_freq.get(qt.as_str()) else {
            continue;
        };
        let df = doc_freq.get(qt).copied().unwrap_or(0);
        if df == 0 {
            continue;
        }
        let tf = tf as f64;
        let denom = tf + K1 * (1.0 - B + B * doc_len / avg_doc_len);
        score += idf(n, df) * (tf * (K1 + 1.0)) / denom;
    }

    score
}

/// Cosine similarity between two normalized embedding vectors. Returns
/// 0 for mismatched lengths or zero-norm vectors so callers never have
/// to special-case missing embeddings.
pub fn cosine(a: &[f32], b: &[f32]) -> f64 {
    if a.is_empty() || a.len() != b.len() {
        return 0.0;
    }

    let dot: f64 = a.iter().zip(b.iter()).map(|(x, y)| (*x as f64) * (*y as f64)).sum();
    let norm_a: f64 = a.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();
    let norm_b: f64 = b.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bm25_scores_zero_when_query_term_absent_from_doc() {
        let doc_freq = HashMap::from([("foo".to_string(), 1)]);
        let score = bm25_score(&["bar".to_string()], &["foo".to_string()], &doc_freq, 1, 1.0);
        assert_eq!(score, 0.0);
    }

    #[test]
    fn bm25_rewards_term_frequency() {
        let doc_freq = HashMap::from([("foo".to_string(), 2)]);
        let low = bm25_score(&["foo".to_string()], &["foo".to_string(), "bar".to_string()], &doc_freq, 2, 2.0);
        let high = bm25_score(
            &["foo".to_string()],
            &["foo".to_string(), "foo".to_string(), "foo".to_string()],
            &doc_freq,
            2,
            2.0,
        );
        assert!(high > low);
    }

    #[test]
    fn cosine_identical_vectors_is_one() {
        let v = vec![1.0_f32, 0.0, 0.0];
        assert!((cosine(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_orthogonal_vectors_is_zero() {
        assert!((cosine(&[1.0, 0.0], &[0.0, 1.0]) - 0.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_mismatched_lengths_is_zero() {
        assert_eq!(cosine(&[1.0, 0.0], &[1.0]), 0.0);
    }

    #[test]
    fn cosine_zero_norm_is_zero() {
        assert_eq!(cosine(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }
}

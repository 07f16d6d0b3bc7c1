//! Vector retrieval: cosine ranking over a recency-bounded candidate set.
//!
//! The retriever embeds the query, pulls the newest `window` chunks from
//! the store (not the whole corpus), scores each candidate by cosine
//! similarity, and returns the top N. Candidates embedded by a different
//! model, or with a mismatched dimension, are skipped rather than scored
//! in a foreign vector space.

use std::sync::Arc;

use tracing::debug;

use bankpilot_core::error::Result;
use bankpilot_core::traits::{ChunkStore, Embedder};
use bankpilot_core::types::ScoredChunk;

use crate::extract::collapse;

/// Guards the denominator against degenerate all-zero vectors.
const COSINE_EPSILON: f64 = 1e-9;

/// Normalized dot-product similarity, ≈[-1, 1].
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += f64::from(*x) * f64::from(*y);
        norm_a += f64::from(*x) * f64::from(*x);
        norm_b += f64::from(*y) * f64::from(*y);
    }
    (dot / (norm_a.sqrt() * norm_b.sqrt() + COSINE_EPSILON)) as f32
}

pub struct Retriever {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn ChunkStore>,
    /// Candidate window size; much larger than any top-N.
    window: usize,
}

impl Retriever {
    pub fn new(embedder: Arc<dyn Embedder>, store: Arc<dyn ChunkStore>, window: usize) -> Self {
        Self { embedder, store, window }
    }

    /// Rank the newest `window` chunks against `query` and return the top
    /// `top_n`, sorted by non-increasing score. Exact score ties keep
    /// candidate (recency) order.
    pub async fn retrieve(&self, query: &str, top_n: usize) -> Result<Vec<ScoredChunk>> {
        let query_vec = self.embedder.embed(query).await?;
        let candidates = self.store.recent_window(self.window).await?;

        let mut scored: Vec<ScoredChunk> = candidates
            .into_iter()
            .filter(|c| {
                if c.embed_model != self.embedder.model() || c.embedding.len() != query_vec.len() {
                    debug!("skipping chunk {} embedded by '{}'", c.id, c.embed_model);
                    return false;
                }
                true
            })
            .map(|record| {
                let score = cosine_similarity(&query_vec, &record.embedding);
                ScoredChunk { record, score }
            })
            .collect();

        // Stable sort: equal scores stay in recency order.
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_n);
        Ok(scored)
    }
}

/// Unique source locators in first-occurrence order, capped.
pub fn unique_sources(chunks: &[ScoredChunk], cap: usize) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for chunk in chunks {
        if out.len() >= cap {
            break;
        }
        if seen.insert(chunk.record.src.clone()) {
            out.push(chunk.record.src.clone());
        }
    }
    out
}

/// Whitespace-collapsed evidence texts in rank order, hard-capped at
/// `char_cap` total characters. A safety net independent of token
/// budgeting: the chunk that crosses the cap is truncated, the rest
/// dropped.
pub fn evidence_texts(chunks: &[ScoredChunk], char_cap: usize) -> Vec<String> {
    let mut out = Vec::new();
    let mut total = 0usize;
    for chunk in chunks {
        if total >= char_cap {
            break;
        }
        let text = collapse(&chunk.record.text);
        if text.is_empty() {
            continue;
        }
        let remaining = char_cap - total;
        let len = text.chars().count();
        if len <= remaining {
            total += len;
            out.push(text);
        } else {
            let cut: String = text.chars().take(remaining).collect();
            total += remaining;
            out.push(cut);
            break;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bankpilot_core::error::{BankpilotError, Result};
    use bankpilot_core::types::ChunkRecord;
    use chrono::{TimeZone, Utc};

    use crate::store::SqliteStore;

    const MODEL: &str = "text-embedding-3-small";

    /// Deterministic fake: maps known texts to fixed unit vectors.
    struct FakeEmbedder {
        fail: bool,
    }

    #[async_trait]
    impl Embedder for FakeEmbedder {
        fn model(&self) -> &str {
            MODEL
        }

        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            if self.fail {
                return Err(BankpilotError::Provider("embedding service down".into()));
            }
            Ok(match text {
                t if t.contains("fees") => vec![1.0, 0.0, 0.0],
                t if t.contains("custody") => vec![0.0, 1.0, 0.0],
                _ => vec![0.0, 0.0, 1.0],
            })
        }
    }

    fn record(id: &str, src: &str, embedding: Vec<f32>, secs: i64) -> ChunkRecord {
        ChunkRecord {
            id: id.to_string(),
            text: format!("chunk {id} body"),
            embedding,
            src: src.to_string(),
            file_type: "html".to_string(),
            embed_model: MODEL.to_string(),
            created_at: Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap(),
        }
    }

    async fn seeded_store() -> Arc<SqliteStore> {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        // c1 aligned with "fees", c2 diagonal, c3 orthogonal
        store.upsert(&record("c1", "https://a.example/fees", vec![1.0, 0.0, 0.0], 1)).await.unwrap();
        store.upsert(&record("c2", "https://a.example/fees", vec![0.7, 0.7, 0.0], 2)).await.unwrap();
        store.upsert(&record("c3", "https://b.example/about", vec![0.0, 0.0, 1.0], 3)).await.unwrap();
        store
    }

    #[test]
    fn test_cosine_identical_vectors() {
        let v = vec![0.3, -0.5, 0.8];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_orthogonal_vectors() {
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_opposite_vectors() {
        assert!((cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]) + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_zero_vector_is_zero_not_nan() {
        let sim = cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]);
        assert!(sim.abs() < 1e-6);
        assert!(!sim.is_nan());
    }

    #[test]
    fn test_cosine_dimension_mismatch() {
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
    }

    #[tokio::test]
    async fn test_retrieve_ranks_by_similarity() {
        let store = seeded_store().await;
        let retriever = Retriever::new(Arc::new(FakeEmbedder { fail: false }), store, 100);

        let results = retriever.retrieve("what are the fees", 10).await.unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].record.id, "c1");
        assert_eq!(results[1].record.id, "c2");
        assert_eq!(results[2].record.id, "c3");
        for pair in results.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }

    #[tokio::test]
    async fn test_retrieve_never_exceeds_top_n() {
        let store = seeded_store().await;
        let retriever = Retriever::new(Arc::new(FakeEmbedder { fail: false }), store, 100);
        let results = retriever.retrieve("what are the fees", 2).await.unwrap();
        assert_eq!(results.len(), 2);
    }

    #[tokio::test]
    async fn test_retrieve_tie_break_prefers_recency() {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        // Identical embeddings, different creation times: the newer chunk
        // comes first in the window and must stay first after the sort.
        store.upsert(&record("old", "https://a.example", vec![1.0, 0.0, 0.0], 1)).await.unwrap();
        store.upsert(&record("new", "https://a.example", vec![1.0, 0.0, 0.0], 2)).await.unwrap();
        let retriever = Retriever::new(Arc::new(FakeEmbedder { fail: false }), store, 100);

        let results = retriever.retrieve("fees", 2).await.unwrap();
        assert_eq!(results[0].record.id, "new");
        assert_eq!(results[1].record.id, "old");
    }

    #[tokio::test]
    async fn test_retrieve_skips_foreign_embed_model() {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let mut foreign = record("f1", "https://a.example", vec![1.0, 0.0, 0.0], 1);
        foreign.embed_model = "some-other-model".to_string();
        store.upsert(&foreign).await.unwrap();
        store.upsert(&record("ok", "https://a.example", vec![1.0, 0.0, 0.0], 2)).await.unwrap();
        let retriever = Retriever::new(Arc::new(FakeEmbedder { fail: false }), store, 100);

        let results = retriever.retrieve("fees", 10).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].record.id, "ok");
    }

    #[tokio::test]
    async fn test_retrieve_propagates_embed_failure() {
        let store = seeded_store().await;
        let retriever = Retriever::new(Arc::new(FakeEmbedder { fail: true }), store, 100);
        assert!(retriever.retrieve("fees", 5).await.is_err());
    }

    #[test]
    fn test_unique_sources_order_preserving_and_capped() {
        let chunks: Vec<ScoredChunk> = [
            ("a", "https://one.example"),
            ("b", "https://two.example"),
            ("c", "https://one.example"),
            ("d", "https://three.example"),
        ]
        .iter()
        .map(|(id, src)| ScoredChunk {
            record: record(id, src, vec![1.0], 0),
            score: 0.5,
        })
        .collect();

        let sources = unique_sources(&chunks, 2);
        assert_eq!(sources, vec!["https://one.example", "https://two.example"]);
    }

    #[test]
    fn test_evidence_texts_collapsed_and_capped() {
        let mut a = record("a", "s", vec![1.0], 0);
        a.text = "some   spaced\n\ntext".to_string();
        let mut b = record("b", "s", vec![1.0], 0);
        b.text = "x".repeat(50);
        let chunks = vec![
            ScoredChunk { record: a, score: 0.9 },
            ScoredChunk { record: b, score: 0.8 },
        ];

        let texts = evidence_texts(&chunks, 30);
        assert_eq!(texts[0], "some spaced text");
        let total: usize = texts.iter().map(|t| t.chars().count()).sum();
        assert!(total <= 30);
        assert_eq!(texts.len(), 2);
    }
}

//! Trait seams for the external collaborators.
//!
//! The embedding service, the generation service, and the chunk store are
//! opaque dependencies: serving and ingestion only ever see these traits,
//! and concrete clients are injected at construction time.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{BankEntry, ChunkRecord, GenerateParams, Message};

/// External embedding service: text in, fixed-dimension vector out.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embedding model identifier, recorded on every chunk it produces.
    fn model(&self) -> &str;

    /// Embed one piece of text. Implementations truncate oversized input
    /// to the model's accepted length before sending.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

/// External text-generation service.
#[async_trait]
pub trait Generator: Send + Sync {
    fn name(&self) -> &str;

    /// Send an ordered message list (system first) and return the single
    /// text completion.
    async fn generate(&self, messages: &[Message], params: &GenerateParams) -> Result<String>;
}

/// Append-only, idempotently-keyed chunk persistence with recency
/// ordering. Read-only from the serving path; ingestion upserts.
#[async_trait]
pub trait ChunkStore: Send + Sync {
    /// Idempotent write keyed by `record.id`: overwrites any existing
    /// record with the same id.
    async fn upsert(&self, record: &ChunkRecord) -> Result<()>;

    /// Up to `limit` most-recently-created records, newest first. A
    /// deliberate recency bound, not a full-corpus scan.
    async fn recent_window(&self, limit: usize) -> Result<Vec<ChunkRecord>>;

    async fn count(&self) -> Result<usize>;
}

/// The bank attribute index consulted by the direct-match augmenter.
/// Separate from the chunk store: rows here are structured facts, not
/// embedded text.
#[async_trait]
pub trait BankDirectory: Send + Sync {
    /// Equality lookup on a recognized attribute field.
    async fn attribute_query(&self, field: &str, value: bool) -> Result<Vec<BankEntry>>;

    async fn upsert_bank(&self, entry: &BankEntry, crypto_friendly: bool) -> Result<()>;
}

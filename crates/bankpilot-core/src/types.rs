//! Shared data model: conversation turns, chunk records, serving payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Speaker role in a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A single conversation turn, supplied by the caller per request.
/// Never persisted by this workspace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

/// Unit of retrievable evidence, created by ingestion and immutable once
/// stored (re-ingestion overwrites by `id`, never patches in place).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkRecord {
    /// Deterministic id: hex(sha256("{src}|{seq}")). Re-running ingestion
    /// over the same document overwrites rather than duplicates.
    pub id: String,
    /// Non-empty plain-text segment.
    pub text: String,
    /// Fixed-dimension vector. All records scored together must come from
    /// one embedding model; see `embed_model`.
    pub embedding: Vec<f32>,
    /// Source locator (URL or document id). Many chunks share a source.
    pub src: String,
    /// Original document kind, for diagnostics and filtering.
    pub file_type: String,
    /// Which embedding model produced `embedding`. The retriever refuses
    /// to score candidates from a different model.
    pub embed_model: String,
    /// Creation timestamp; orders the retrieval candidate window.
    pub created_at: DateTime<Utc>,
}

/// A candidate chunk with its cosine similarity against the query.
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub record: ChunkRecord,
    pub score: f32,
}

/// Row of the bank attribute index, returned by direct-match lookups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankEntry {
    pub name: String,
    pub official_url: String,
}

/// What the context budgeter admitted into the prompt.
#[derive(Debug, Clone, Default)]
pub struct ContextSelection {
    /// Admitted history, re-established in chronological order.
    pub history: Vec<Message>,
    /// Admitted evidence, in similarity rank order.
    pub evidence: Vec<String>,
    /// Set when the user prompt alone exceeds its sub-budget. The caller
    /// must shrink or summarize the input and retry; nothing is selected.
    pub needs_compression: bool,
}

/// Serving output for one answered request.
#[derive(Debug, Clone, Serialize)]
pub struct ChatReply {
    pub text: String,
    /// Number of evidence chunks that made it into the prompt.
    pub evidence_used: usize,
    /// Source URLs actually cited in the answer text.
    pub sources: Vec<String>,
}

/// Outcome of the serving path. An oversized user turn is a signal, not
/// an error: the request itself is well-formed.
#[derive(Debug, Clone)]
pub enum ChatOutcome {
    Answer(ChatReply),
    NeedsCompression,
}

/// Sampling parameters forwarded to the generation provider.
#[derive(Debug, Clone)]
pub struct GenerateParams {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_serde_lowercase() {
        let msg = Message::user("hello");
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"role\":\"user\""));

        let back: Message = serde_json::from_str("{\"role\":\"assistant\",\"content\":\"hi\"}").unwrap();
        assert_eq!(back.role, Role::Assistant);
    }

    #[test]
    fn test_message_constructors() {
        assert_eq!(Message::system("s").role, Role::System);
        assert_eq!(Message::user("u").role, Role::User);
        assert_eq!(Message::assistant("a").role, Role::Assistant);
    }
}

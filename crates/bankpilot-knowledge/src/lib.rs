//! # Bankpilot Knowledge
//!
//! The retrieval-augmented-generation core:
//!
//! - **extract** — raw document bytes to normalized plain text, per format
//! - **chunker** — normalized text to bounded-size segments
//! - **store** — SQLite chunk persistence with idempotent upserts and a
//!   recency-ordered candidate window, plus the bank attribute index
//! - **retriever** — cosine-similarity ranking over the recency window
//! - **budget** — fits system text, history, and evidence into the
//!   generation model's token ceiling
//! - **augment** — keyword-triggered direct lookup against the bank
//!   attribute index

pub mod augment;
pub mod budget;
pub mod chunker;
pub mod extract;
pub mod retriever;
pub mod store;

pub use augment::DirectMatcher;
pub use budget::ContextBudgeter;
pub use retriever::Retriever;
pub use store::SqliteStore;

//! Bankpilot error type.

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, BankpilotError>;

#[derive(Debug, Error)]
pub enum BankpilotError {
    /// Configuration missing or malformed.
    #[error("config error: {0}")]
    Config(String),

    /// Transport-level HTTP failure (connect, timeout, decode).
    #[error("http error: {0}")]
    Http(String),

    /// An external provider (embedding or generation) returned an error.
    #[error("provider error: {0}")]
    Provider(String),

    /// No API key resolved for the named provider.
    #[error("no API key configured for provider '{0}'")]
    ApiKeyMissing(String),

    /// Chunk store / bank directory failure.
    #[error("store error: {0}")]
    Store(String),

    /// Ingestion-level failure (bad dataset, unreadable input).
    #[error("ingest error: {0}")]
    Ingest(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

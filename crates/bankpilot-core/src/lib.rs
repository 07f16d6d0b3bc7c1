//! # Bankpilot Core
//!
//! Shared foundation for the Bankpilot workspace: configuration, the
//! crate-wide error type, the data model (chunks, conversation turns,
//! serving payloads), and the trait seams behind which the external
//! embedding/generation services and the chunk store live.
//!
//! Everything external is injected through these traits so tests can
//! substitute fakes; no module in this workspace reaches for a global
//! client.

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use config::BankpilotConfig;
pub use error::{BankpilotError, Result};

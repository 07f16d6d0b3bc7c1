//! Direct-match augmentation: keyword-triggered structured lookup.
//!
//! One recognized intent class — "which banks are crypto-friendly" — is
//! answered from the bank attribute index, not the chunk store. The
//! result list is authoritative and never cosine-ranked; it competes only
//! for token budget. A failed lookup degrades to an empty list and never
//! blocks the main answer path.

use std::sync::{Arc, LazyLock};

use regex::Regex;
use tracing::{info, warn};

use bankpilot_core::traits::BankDirectory;
use bankpilot_core::types::BankEntry;

static CRYPTO_ASK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bcrypto[- ]?friendly\b|\ballow(?:s|ing)?\s+crypto\b")
        .expect("valid crypto trigger pattern")
});

/// Does this message ask for the crypto-friendly list?
pub fn triggers(text: &str) -> bool {
    CRYPTO_ASK.is_match(text)
}

pub struct DirectMatcher {
    directory: Arc<dyn BankDirectory>,
}

impl DirectMatcher {
    pub fn new(directory: Arc<dyn BankDirectory>) -> Self {
        Self { directory }
    }

    /// Return the crypto-friendly bank list when the message triggers the
    /// intent, else an empty list. Lookup failure also yields an empty
    /// list (logged), keeping the answer path alive.
    pub async fn lookup(&self, user_message: &str) -> Vec<BankEntry> {
        if !triggers(user_message) {
            return Vec::new();
        }
        match self.directory.attribute_query("crypto_friendly", true).await {
            Ok(entries) => {
                info!("direct crypto list size: {}", entries.len());
                entries
            }
            Err(e) => {
                warn!("direct crypto query failed: {e}");
                Vec::new()
            }
        }
    }
}

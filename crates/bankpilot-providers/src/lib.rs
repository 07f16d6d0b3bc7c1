//! # Bankpilot Providers
//!
//! Clients for the external embedding and generation services. Both speak
//! the OpenAI wire format; the endpoint and models come from config, the
//! API key from config or the `OPENAI_API_KEY` environment variable.

pub mod openai;

use std::sync::Arc;

use bankpilot_core::config::BankpilotConfig;
use bankpilot_core::error::{BankpilotError, Result};
use bankpilot_core::traits::{Embedder, Generator};

use openai::{OpenAiEmbedder, OpenAiGenerator};

/// Resolve the API key: config first, then environment, else error.
fn resolve_api_key(config: &BankpilotConfig) -> Result<String> {
    if !config.api_key.is_empty() {
        return Ok(config.api_key.clone());
    }
    std::env::var("OPENAI_API_KEY")
        .ok()
        .filter(|k| !k.is_empty())
        .ok_or_else(|| BankpilotError::ApiKeyMissing("openai".into()))
}

/// Create the embedding client from configuration.
pub fn create_embedder(config: &BankpilotConfig) -> Result<Arc<dyn Embedder>> {
    let api_key = resolve_api_key(config)?;
    Ok(Arc::new(OpenAiEmbedder::new(
        api_key,
        config.llm.endpoint.clone(),
        config.embedding.model.clone(),
        config.embedding.max_input_chars,
    )))
}

/// Create the generation client from configuration.
pub fn create_generator(config: &BankpilotConfig) -> Result<Arc<dyn Generator>> {
    let api_key = resolve_api_key(config)?;
    Ok(Arc::new(OpenAiGenerator::new(api_key, config.llm.endpoint.clone())))
}

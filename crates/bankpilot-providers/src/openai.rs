//! OpenAI-compatible embedding and chat-completion clients.
//!
//! Two small structs over one wire format. The embedder truncates its
//! input to the model's accepted length and retries transient failures;
//! the generator sends the ordered message list and returns the single
//! completion. Call sites decide what a failure means: ingestion skips
//! the chunk, retrieval degrades to no evidence, generation failure is
//! terminal for the request.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};

use bankpilot_core::error::{BankpilotError, Result};
use bankpilot_core::traits::{Embedder, Generator};
use bankpilot_core::types::{GenerateParams, Message};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);
const MAX_RETRIES: usize = 3;

/// Truncate at a char boundary; oversized multi-byte input must not panic.
fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

fn retry_backoff(attempt: usize) -> Duration {
    let capped = attempt.min(5) as u32;
    Duration::from_millis(500 * (1 << capped))
}

fn is_retryable_status(status: reqwest::StatusCode) -> bool {
    status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// Embeddings client.
pub struct OpenAiEmbedder {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    max_input_chars: usize,
}

impl OpenAiEmbedder {
    pub fn new(api_key: String, base_url: String, model: String, max_input_chars: usize) -> Self {
        let endpoint = format!("{}/embeddings", base_url.trim_end_matches('/'));
        Self {
            client: reqwest::Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .unwrap_or_default(),
            endpoint,
            api_key,
            model,
            max_input_chars,
        }
    }
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    fn model(&self) -> &str {
        &self.model
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let input = truncate_chars(text, self.max_input_chars);
        let body = json!({
            "model": self.model,
            "input": input,
            "encoding_format": "float",
        });

        let mut attempt = 0usize;
        loop {
            let resp = self
                .client
                .post(&self.endpoint)
                .header("Authorization", format!("Bearer {}", self.api_key))
                .json(&body)
                .send()
                .await;

            match resp {
                Ok(r) if r.status().is_success() => {
                    let parsed: EmbeddingResponse = r
                        .json()
                        .await
                        .map_err(|e| BankpilotError::Http(e.to_string()))?;
                    return parsed
                        .data
                        .into_iter()
                        .next()
                        .map(|d| d.embedding)
                        .ok_or_else(|| {
                            BankpilotError::Provider("empty embedding response".into())
                        });
                }
                Ok(r) => {
                    let status = r.status();
                    let text = r.text().await.unwrap_or_default();
                    if is_retryable_status(status) && attempt + 1 < MAX_RETRIES {
                        attempt += 1;
                        tokio::time::sleep(retry_backoff(attempt)).await;
                        continue;
                    }
                    return Err(BankpilotError::Provider(format!(
                        "embeddings request failed ({status}): {text}"
                    )));
                }
                Err(e) => {
                    if (e.is_timeout() || e.is_connect()) && attempt + 1 < MAX_RETRIES {
                        attempt += 1;
                        tokio::time::sleep(retry_backoff(attempt)).await;
                        continue;
                    }
                    return Err(BankpilotError::Http(format!(
                        "embeddings connection failed ({}): {e}",
                        self.endpoint
                    )));
                }
            }
        }
    }
}

/// Chat-completions client.
pub struct OpenAiGenerator {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl OpenAiGenerator {
    pub fn new(api_key: String, base_url: String) -> Self {
        let endpoint = format!("{}/chat/completions", base_url.trim_end_matches('/'));
        Self {
            client: reqwest::Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .unwrap_or_default(),
            endpoint,
            api_key,
        }
    }
}

#[async_trait]
impl Generator for OpenAiGenerator {
    fn name(&self) -> &str {
        "openai"
    }

    async fn generate(&self, messages: &[Message], params: &GenerateParams) -> Result<String> {
        let body = json!({
            "model": params.model,
            "temperature": params.temperature,
            "max_tokens": params.max_tokens,
            "messages": messages,
        });

        let resp = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                BankpilotError::Http(format!("chat connection failed ({}): {e}", self.endpoint))
            })?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(BankpilotError::Provider(format!(
                "chat request failed ({status}): {text}"
            )));
        }

        let parsed: Value = resp
            .json()
            .await
            .map_err(|e| BankpilotError::Http(e.to_string()))?;

        parsed["choices"]
            .get(0)
            .and_then(|c| c["message"]["content"].as_str())
            .map(|s| s.trim().to_string())
            .ok_or_else(|| BankpilotError::Provider("no choices in chat response".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_chars_short_input_untouched() {
        assert_eq!(truncate_chars("hello", 10), "hello");
    }

    #[test]
    fn test_truncate_chars_cuts_at_limit() {
        assert_eq!(truncate_chars("hello world", 5), "hello");
    }

    #[test]
    fn test_truncate_chars_multibyte_safe() {
        // 4 chars, each multi-byte; must not slice mid-char
        let s = "áéíó";
        assert_eq!(truncate_chars(s, 2), "áé");
        assert_eq!(truncate_chars(s, 4), s);
    }

    #[test]
    fn test_retry_backoff_grows_and_caps() {
        assert!(retry_backoff(1) < retry_backoff(2));
        assert_eq!(retry_backoff(5), retry_backoff(9));
    }

    #[test]
    fn test_endpoint_join_strips_trailing_slash() {
        let g = OpenAiGenerator::new("k".into(), "https://api.openai.com/v1/".into());
        assert_eq!(g.endpoint, "https://api.openai.com/v1/chat/completions");
        let e = OpenAiEmbedder::new("k".into(), "https://api.openai.com/v1".into(), "m".into(), 8000);
        assert_eq!(e.endpoint, "https://api.openai.com/v1/embeddings");
    }
}

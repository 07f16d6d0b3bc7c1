//! Fetching and extracting documents that arrived without content.

use std::time::Duration;

use bankpilot_core::error::{BankpilotError, Result};
use bankpilot_knowledge::extract::{self, DocFormat};

const FETCH_TIMEOUT: Duration = Duration::from_secs(120);
const USER_AGENT: &str = "bankpilot-ingest/0.1";

pub struct Fetcher {
    client: reqwest::Client,
}

impl Default for Fetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Fetcher {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(FETCH_TIMEOUT)
                .user_agent(USER_AGENT)
                .build()
                .unwrap_or_default(),
        }
    }

    /// Download `url` and extract its text. The extraction itself never
    /// fails (it degrades to a marker); only the download can error, and
    /// the pipeline answers that by skipping the record.
    pub async fn fetch_text(&self, url: &str) -> Result<(String, DocFormat)> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| BankpilotError::Http(format!("fetch failed ({url}): {e}")))?;

        if !resp.status().is_success() {
            return Err(BankpilotError::Http(format!(
                "fetch failed ({url}): status {}",
                resp.status()
            )));
        }

        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| BankpilotError::Http(format!("fetch body failed ({url}): {e}")))?;

        let format = DocFormat::detect(content_type.as_deref(), url);
        let text = extract::extract_text(&format, &bytes);
        Ok((text, format))
    }
}

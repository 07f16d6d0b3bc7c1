//! Normalizing crawl-service records.
//!
//! The crawl service emits loosely-shaped rows whose URL may live under
//! any of several names depending on actor version. This adapter pins a
//! single precedence order — `url` > `pageUrl` > `loadedUrl` >
//! `request.url` — so the rest of the pipeline never sees the mess.

use serde::Deserialize;

/// Raw crawl row, exactly as the dataset serializes it.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlRecord {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub page_url: Option<String>,
    #[serde(default)]
    pub loaded_url: Option<String>,
    #[serde(default)]
    pub request: Option<CrawlRequest>,
    /// Pre-extracted text, when the crawler produced it.
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub file_type: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlRequest {
    #[serde(default)]
    pub url: Option<String>,
}

/// A crawl row with its URL resolved. Rows without any URL are dropped
/// by the adapter (and counted by the pipeline).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedDoc {
    pub url: String,
    pub content: Option<String>,
    pub file_type: Option<String>,
}

impl CrawlRecord {
    /// Resolve the source URL under the defined precedence.
    pub fn resolve_url(&self) -> Option<&str> {
        self.url
            .as_deref()
            .or(self.page_url.as_deref())
            .or(self.loaded_url.as_deref())
            .or(self.request.as_ref().and_then(|r| r.url.as_deref()))
            .filter(|u| !u.is_empty())
    }

    pub fn normalize(self) -> Option<NormalizedDoc> {
        let url = self.resolve_url()?.to_string();
        Some(NormalizedDoc {
            url,
            content: self.content.filter(|c| !c.is_empty()),
            file_type: self.file_type,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> CrawlRecord {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_url_field_wins() {
        let rec = parse(r#"{"url":"https://a","pageUrl":"https://b","loadedUrl":"https://c"}"#);
        assert_eq!(rec.resolve_url(), Some("https://a"));
    }

    #[test]
    fn test_page_url_beats_loaded_url() {
        let rec = parse(r#"{"pageUrl":"https://b","loadedUrl":"https://c"}"#);
        assert_eq!(rec.resolve_url(), Some("https://b"));
    }

    #[test]
    fn test_request_url_is_last_resort() {
        let rec = parse(r#"{"request":{"url":"https://d"}}"#);
        assert_eq!(rec.resolve_url(), Some("https://d"));
    }

    #[test]
    fn test_no_url_normalizes_to_none() {
        let rec = parse(r#"{"content":"some text"}"#);
        assert!(rec.normalize().is_none());
    }

    #[test]
    fn test_empty_url_treated_as_missing() {
        let rec = parse(r#"{"url":"","loadedUrl":"https://c"}"#);
        assert_eq!(rec.resolve_url(), Some("https://c"));
    }

    #[test]
    fn test_normalize_keeps_content_and_file_type() {
        let rec = parse(r#"{"url":"https://a","content":"body text","fileType":"pdf"}"#);
        let doc = rec.normalize().unwrap();
        assert_eq!(doc.url, "https://a");
        assert_eq!(doc.content.as_deref(), Some("body text"));
        assert_eq!(doc.file_type.as_deref(), Some("pdf"));
    }

    #[test]
    fn test_empty_content_dropped() {
        let rec = parse(r#"{"url":"https://a","content":""}"#);
        assert!(rec.normalize().unwrap().content.is_none());
    }
}

//! # Bankpilot Ingest
//!
//! Out-of-band batch ingestion: crawl-service records in, chunk records
//! out. The pipeline normalizes loosely-shaped crawl rows, fetches and
//! extracts documents that arrived without content, chunks the text, and
//! either embeds-and-stores each chunk (persist mode) or writes a
//! newline-delimited chunk manifest for external object storage (export
//! mode). Embed calls run under a bounded worker pool and a token-bucket
//! rate limit; a failed chunk is skipped, never the batch.

pub mod adapter;
pub mod export;
pub mod fetch;
pub mod pipeline;

pub use adapter::{CrawlRecord, NormalizedDoc};
pub use export::write_manifest;
pub use pipeline::{IngestPipeline, IngestReport, RateLimiter};

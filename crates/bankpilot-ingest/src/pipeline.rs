//! The ingestion pipeline: normalize → extract → chunk → embed → store.
//!
//! Embed calls run concurrently under a semaphore bound and a token-bucket
//! rate limit, so the external embedding service sees at most
//! `concurrency` in-flight requests at no more than the configured rate.
//! A chunk whose embed call fails is skipped and counted; the batch keeps
//! going. Writes are idempotent upserts, safe to interleave with serving
//! reads.

use std::sync::Arc;
use std::time::Duration;

use sha2::{Digest, Sha256};
use tokio::sync::{Mutex, Semaphore};
use tracing::{info, warn};

use bankpilot_core::config::IngestConfig;
use bankpilot_core::error::Result;
use bankpilot_core::traits::{ChunkStore, Embedder};
use bankpilot_core::types::ChunkRecord;
use bankpilot_knowledge::chunker::{ChunkPolicy, split_chunks};

use crate::adapter::{CrawlRecord, NormalizedDoc};
use crate::export::{ManifestRow, ManifestWriter};
use crate::fetch::Fetcher;

/// Deterministic chunk id: stable across re-ingestion of the same
/// document, so the upsert overwrites instead of duplicating.
pub fn chunk_id(src: &str, seq: usize) -> String {
    let mut hasher = Sha256::new();
    hasher.update(src.as_bytes());
    hasher.update(b"|");
    hasher.update(seq.to_string().as_bytes());
    let digest = hasher.finalize();
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

/// Token bucket: `capacity` burst, refilled at `max_per_minute / 60` per
/// second. `acquire` waits for a token instead of sleeping a fixed pause
/// every K operations.
#[derive(Clone)]
pub struct RateLimiter {
    state: Arc<Mutex<RateState>>,
    capacity: f64,
    refill_per_sec: f64,
}

struct RateState {
    tokens: f64,
    last_refill: tokio::time::Instant,
}

impl RateLimiter {
    pub fn new(max_per_minute: u32, burst: u32) -> Option<Self> {
        if max_per_minute == 0 || burst == 0 {
            return None;
        }
        let capacity = f64::from(burst);
        Some(Self {
            state: Arc::new(Mutex::new(RateState {
                tokens: capacity,
                last_refill: tokio::time::Instant::now(),
            })),
            capacity,
            refill_per_sec: f64::from(max_per_minute) / 60.0,
        })
    }

    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut guard = self.state.lock().await;
                let now = tokio::time::Instant::now();
                let elapsed = now.duration_since(guard.last_refill).as_secs_f64();
                guard.last_refill = now;
                guard.tokens = (guard.tokens + elapsed * self.refill_per_sec).min(self.capacity);
                if guard.tokens >= 1.0 {
                    guard.tokens -= 1.0;
                    return;
                }
                Duration::from_secs_f64((1.0 - guard.tokens) / self.refill_per_sec)
            };
            tokio::time::sleep(wait).await;
        }
    }
}

/// Batch summary counters.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct IngestReport {
    pub docs_seen: usize,
    pub stored: usize,
    pub skipped_no_url: usize,
    pub skipped_no_text: usize,
    pub fetch_failures: usize,
    pub embed_failures: usize,
}

enum ChunkOutcome {
    Stored,
    EmbedFailed,
}

pub struct IngestPipeline {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn ChunkStore>,
    fetcher: Fetcher,
    chunk_max_chars: usize,
    concurrency: usize,
    limiter: Option<RateLimiter>,
}

impl IngestPipeline {
    pub fn new(embedder: Arc<dyn Embedder>, store: Arc<dyn ChunkStore>, config: &IngestConfig) -> Self {
        Self {
            embedder,
            store,
            fetcher: Fetcher::new(),
            chunk_max_chars: config.chunk_max_chars,
            concurrency: config.concurrency.max(1),
            limiter: RateLimiter::new(config.embeds_per_minute, config.burst),
        }
    }

    /// Resolve a document's text: inline content if the crawler provided
    /// it, otherwise fetch and extract. Returns the text and file type.
    async fn resolve_text(&self, doc: &NormalizedDoc) -> Result<(String, String)> {
        if let Some(content) = &doc.content {
            let file_type = doc.file_type.clone().unwrap_or_else(|| "html".to_string());
            return Ok((content.clone(), file_type));
        }
        let (text, format) = self.fetcher.fetch_text(&doc.url).await?;
        let file_type = doc.file_type.clone().unwrap_or_else(|| format.label().to_string());
        Ok((text, file_type))
    }

    /// Persist mode: embed every chunk and upsert it into the store.
    pub async fn run(&self, records: Vec<CrawlRecord>) -> IngestReport {
        let mut report = IngestReport::default();
        let semaphore = Arc::new(Semaphore::new(self.concurrency));

        for record in records {
            let Some(doc) = record.normalize() else {
                report.skipped_no_url += 1;
                continue;
            };
            report.docs_seen += 1;

            let (text, file_type) = match self.resolve_text(&doc).await {
                Ok(resolved) => resolved,
                Err(e) => {
                    warn!("skipping {}: {e}", doc.url);
                    report.fetch_failures += 1;
                    continue;
                }
            };

            let chunks = split_chunks(&text, self.chunk_max_chars, ChunkPolicy::LineAware);
            if chunks.is_empty() {
                report.skipped_no_text += 1;
                continue;
            }
            info!("{} → {} chunks (≤{} chars each)", doc.url, chunks.len(), self.chunk_max_chars);

            let mut handles = Vec::with_capacity(chunks.len());
            for (seq, chunk) in chunks.into_iter().enumerate() {
                let Ok(permit) = semaphore.clone().acquire_owned().await else {
                    break;
                };
                let embedder = self.embedder.clone();
                let store = self.store.clone();
                let limiter = self.limiter.clone();
                let src = doc.url.clone();
                let file_type = file_type.clone();

                handles.push(tokio::spawn(async move {
                    let _permit = permit;
                    if let Some(limiter) = &limiter {
                        limiter.acquire().await;
                    }
                    let embedding = match embedder.embed(&chunk).await {
                        Ok(v) => v,
                        Err(e) => {
                            warn!("embed failed for {src}#{seq}: {e}");
                            return ChunkOutcome::EmbedFailed;
                        }
                    };
                    let record = ChunkRecord {
                        id: chunk_id(&src, seq),
                        text: chunk,
                        embedding,
                        src,
                        file_type,
                        embed_model: embedder.model().to_string(),
                        created_at: chrono::Utc::now(),
                    };
                    match store.upsert(&record).await {
                        Ok(()) => ChunkOutcome::Stored,
                        Err(e) => {
                            warn!("store upsert failed for {}: {e}", record.id);
                            ChunkOutcome::EmbedFailed
                        }
                    }
                }));
            }

            for handle in handles {
                match handle.await {
                    Ok(ChunkOutcome::Stored) => report.stored += 1,
                    Ok(ChunkOutcome::EmbedFailed) => report.embed_failures += 1,
                    Err(e) => {
                        warn!("ingest task panicked: {e}");
                        report.embed_failures += 1;
                    }
                }
            }
        }

        info!(
            "ingest summary — stored:{} | skipURL:{} | skipText:{} | fetchFail:{} | embedFail:{}",
            report.stored,
            report.skipped_no_url,
            report.skipped_no_text,
            report.fetch_failures,
            report.embed_failures
        );
        report
    }

    /// Export mode: identical extraction and chunking, but the sink is a
    /// newline-delimited chunk manifest instead of the embedded store.
    pub async fn run_export(
        &self,
        records: Vec<CrawlRecord>,
        path: &std::path::Path,
    ) -> Result<IngestReport> {
        let mut report = IngestReport::default();
        let mut writer = ManifestWriter::create(path)?;

        for record in records {
            let Some(doc) = record.normalize() else {
                report.skipped_no_url += 1;
                continue;
            };
            report.docs_seen += 1;

            let (text, file_type) = match self.resolve_text(&doc).await {
                Ok(resolved) => resolved,
                Err(e) => {
                    warn!("skipping {}: {e}", doc.url);
                    report.fetch_failures += 1;
                    continue;
                }
            };

            let chunks = split_chunks(&text, self.chunk_max_chars, ChunkPolicy::LineAware);
            if chunks.is_empty() {
                report.skipped_no_text += 1;
                continue;
            }

            for (seq, chunk) in chunks.into_iter().enumerate() {
                writer.write_row(&ManifestRow {
                    url: doc.url.clone(),
                    seq,
                    file_type: file_type.clone(),
                    text: chunk,
                })?;
                report.stored += 1;
            }
        }

        writer.finish()?;
        info!("manifest written: {} rows → {}", report.stored, path.display());
        Ok(report)
    }
}

//! # Bankpilot — retrieval-augmented banking-advisory assistant
//!
//! Usage:
//!   bankpilot chat --message "which banks are crypto-friendly?"
//!   bankpilot chat --conversation convo.json
//!   bankpilot ingest --input dataset.json
//!   bankpilot ingest --input dataset.json --export chunks.jsonl
//!   bankpilot banks --import banks.json
//!   bankpilot stats

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use bankpilot_agent::Advisor;
use bankpilot_core::BankpilotConfig;
use bankpilot_core::traits::{BankDirectory, ChunkStore};
use bankpilot_core::types::{ChatOutcome, Message};
use bankpilot_ingest::{CrawlRecord, IngestPipeline};
use bankpilot_knowledge::SqliteStore;

#[derive(Parser)]
#[command(name = "bankpilot", version, about = "Retrieval-augmented banking-advisory assistant")]
struct Cli {
    /// Config file (default: ~/.bankpilot/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Answer a question or a whole conversation
    Chat {
        /// Single question (becomes a one-turn conversation)
        #[arg(short, long)]
        message: Option<String>,

        /// JSON file holding an ordered [{role, content}, ...] list
        #[arg(long)]
        conversation: Option<PathBuf>,
    },
    /// Ingest a crawl dataset into the chunk store
    Ingest {
        /// JSON array of crawl records
        #[arg(long)]
        input: PathBuf,

        /// Write a chunk manifest (JSONL) instead of embedding + storing
        #[arg(long)]
        export: Option<PathBuf>,

        /// Process at most this many records
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Import bank attribute rows into the directory
    Banks {
        /// JSON array of {name, official_url, crypto_friendly}
        #[arg(long)]
        import: PathBuf,
    },
    /// Show chunk store statistics
    Stats,
}

#[derive(serde::Deserialize)]
struct BankImportRow {
    name: String,
    official_url: String,
    #[serde(default)]
    crypto_friendly: bool,
}

fn expand_path(p: &str) -> PathBuf {
    if let Some(rest) = p.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(p)
}

fn open_store(config: &BankpilotConfig) -> Result<Arc<SqliteStore>> {
    let path = expand_path(&config.knowledge.db_path);
    Ok(Arc::new(SqliteStore::open(&path)?))
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("parsing {}", path.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "bankpilot=debug" } else { "bankpilot=info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_target(false)
        .init();

    let config = match &cli.config {
        Some(path) => BankpilotConfig::load_from(path)?,
        None => BankpilotConfig::load()?,
    };

    match cli.command {
        Commands::Chat { message, conversation } => {
            let convo: Vec<Message> = match (message, conversation) {
                (Some(text), None) => vec![Message::user(text)],
                (None, Some(path)) => read_json(&path)?,
                _ => bail!("pass exactly one of --message or --conversation"),
            };
            if convo.is_empty() {
                bail!("conversation must not be empty");
            }

            let store = open_store(&config)?;
            let generator = bankpilot_providers::create_generator(&config)?;
            let embedder = bankpilot_providers::create_embedder(&config)?;
            let advisor = Advisor::new(
                &config,
                generator,
                embedder,
                store.clone() as Arc<dyn ChunkStore>,
                store as Arc<dyn BankDirectory>,
            )?;

            match advisor.answer(&convo).await? {
                ChatOutcome::Answer(reply) => {
                    println!("{}", serde_json::to_string_pretty(&reply)?);
                }
                ChatOutcome::NeedsCompression => {
                    bail!("user message exceeds the prompt budget; shorten it and retry");
                }
            }
        }

        Commands::Ingest { input, export, limit } => {
            let mut records: Vec<CrawlRecord> = read_json(&input)?;
            if let Some(limit) = limit {
                records.truncate(limit);
            }
            tracing::info!("{} crawl records loaded", records.len());

            let store = open_store(&config)?;
            let embedder = bankpilot_providers::create_embedder(&config)?;
            let pipeline =
                IngestPipeline::new(embedder, store as Arc<dyn ChunkStore>, &config.ingest);

            let report = match export {
                Some(path) => pipeline.run_export(records, &path).await?,
                None => pipeline.run(records).await,
            };
            println!(
                "stored:{} skipURL:{} skipText:{} fetchFail:{} embedFail:{}",
                report.stored,
                report.skipped_no_url,
                report.skipped_no_text,
                report.fetch_failures,
                report.embed_failures
            );
        }

        Commands::Banks { import } => {
            let rows: Vec<BankImportRow> = read_json(&import)?;
            let store = open_store(&config)?;
            for row in &rows {
                store
                    .upsert_bank(
                        &bankpilot_core::types::BankEntry {
                            name: row.name.clone(),
                            official_url: row.official_url.clone(),
                        },
                        row.crypto_friendly,
                    )
                    .await?;
            }
            println!("{} banks imported", rows.len());
        }

        Commands::Stats => {
            let store = open_store(&config)?;
            println!("chunks: {}", store.count().await?);
        }
    }

    Ok(())
}

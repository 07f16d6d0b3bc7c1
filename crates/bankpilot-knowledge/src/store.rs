//! SQLite-backed chunk store and bank attribute index.
//!
//! Chunks are append-only and idempotently keyed: `upsert` is an
//! `INSERT OR REPLACE` on the deterministic chunk id, so re-ingesting a
//! document overwrites rather than duplicates. The serving path only ever
//! reads (`recent_window`, `attribute_query`), so interleaving with
//! ingestion writes needs no coordination beyond the connection lock.

use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::Connection;

use bankpilot_core::error::{BankpilotError, Result};
use bankpilot_core::traits::{BankDirectory, ChunkStore};
use bankpilot_core::types::{BankEntry, ChunkRecord};

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

fn store_err(e: impl std::fmt::Display) -> BankpilotError {
    BankpilotError::Store(e.to_string())
}

/// Embeddings are persisted as little-endian f32 bytes.
fn vec_to_blob(v: &[f32]) -> Vec<u8> {
    let mut blob = Vec::with_capacity(v.len() * 4);
    for x in v {
        blob.extend_from_slice(&x.to_le_bytes());
    }
    blob
}

fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect()
}

impl SqliteStore {
    /// Open (or create) the store at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path).map_err(store_err)?;
        Self::init(conn)
    }

    /// Fully in-memory store, for tests.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(store_err)?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS chunks (
                id TEXT PRIMARY KEY,
                text TEXT NOT NULL,
                embedding BLOB NOT NULL,
                src TEXT NOT NULL,
                file_type TEXT NOT NULL,
                embed_model TEXT NOT NULL,
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_chunks_created ON chunks(created_at DESC);
            CREATE TABLE IF NOT EXISTS banks (
                name TEXT PRIMARY KEY,
                official_url TEXT NOT NULL,
                crypto_friendly INTEGER NOT NULL DEFAULT 0
            );",
        )
        .map_err(store_err)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| store_err(e.to_string()))
    }
}

fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<ChunkRecord> {
    let created: String = row.get(6)?;
    Ok(ChunkRecord {
        id: row.get(0)?,
        text: row.get(1)?,
        embedding: blob_to_vec(&row.get::<_, Vec<u8>>(2)?),
        src: row.get(3)?,
        file_type: row.get(4)?,
        embed_model: row.get(5)?,
        created_at: DateTime::parse_from_rfc3339(&created)
            .map(|d| d.with_timezone(&Utc))
            .unwrap_or_default(),
    })
}

#[async_trait]
impl ChunkStore for SqliteStore {
    async fn upsert(&self, record: &ChunkRecord) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR REPLACE INTO chunks (id, text, embedding, src, file_type, embed_model, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            rusqlite::params![
                record.id,
                record.text,
                vec_to_blob(&record.embedding),
                record.src,
                record.file_type,
                record.embed_model,
                record.created_at.to_rfc3339(),
            ],
        )
        .map_err(store_err)?;
        Ok(())
    }

    async fn recent_window(&self, limit: usize) -> Result<Vec<ChunkRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, text, embedding, src, file_type, embed_model, created_at
                 FROM chunks ORDER BY created_at DESC, rowid DESC LIMIT ?1",
            )
            .map_err(store_err)?;
        let rows = stmt
            .query_map(rusqlite::params![limit as i64], row_to_record)
            .map_err(store_err)?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    async fn count(&self) -> Result<usize> {
        let conn = self.lock()?;
        conn.query_row("SELECT COUNT(*) FROM chunks", [], |r| r.get::<_, i64>(0))
            .map(|n| n as usize)
            .map_err(store_err)
    }
}

#[async_trait]
impl BankDirectory for SqliteStore {
    async fn attribute_query(&self, field: &str, value: bool) -> Result<Vec<BankEntry>> {
        // Allowlisted field → column mapping; this is the one recognized
        // attribute class today.
        let column = match field {
            "crypto_friendly" => "crypto_friendly",
            other => {
                return Err(BankpilotError::Store(format!(
                    "unknown bank attribute field '{other}'"
                )));
            }
        };
        let conn = self.lock()?;
        let sql = format!("SELECT name, official_url FROM banks WHERE {column} = ?1 ORDER BY name");
        let mut stmt = conn.prepare(&sql).map_err(store_err)?;
        let rows = stmt
            .query_map(rusqlite::params![value as i64], |row| {
                Ok(BankEntry { name: row.get(0)?, official_url: row.get(1)? })
            })
            .map_err(store_err)?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    async fn upsert_bank(&self, entry: &BankEntry, crypto_friendly: bool) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR REPLACE INTO banks (name, official_url, crypto_friendly) VALUES (?1, ?2, ?3)",
            rusqlite::params![entry.name, entry.official_url, crypto_friendly as i64],
        )
        .map_err(store_err)?;
        Ok(())
    }
}

//! Newline-delimited chunk manifest, the batch-export sink.
//!
//! One JSON object per line, ready for upload to object storage by
//! external tooling. Shares the pipeline's extraction and chunking; only
//! the sink differs from persist mode.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use bankpilot_core::error::Result;

/// One exported chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestRow {
    pub url: String,
    pub seq: usize,
    pub file_type: String,
    pub text: String,
}

pub struct ManifestWriter {
    inner: BufWriter<File>,
}

impl ManifestWriter {
    pub fn create(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(Self { inner: BufWriter::new(File::create(path)?) })
    }

    pub fn write_row(&mut self, row: &ManifestRow) -> Result<()> {
        serde_json::to_writer(&mut self.inner, row)?;
        self.inner.write_all(b"\n")?;
        Ok(())
    }

    pub fn finish(mut self) -> Result<()> {
        self.inner.flush()?;
        Ok(())
    }
}

/// Write a whole manifest in one call.
pub fn write_manifest(path: &Path, rows: &[ManifestRow]) -> Result<()> {
    let mut writer = ManifestWriter::create(path)?;
    for row in rows {
        writer.write_row(row)?;
    }
    writer.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(seq: usize) -> ManifestRow {
        ManifestRow {
            url: "https://a.example/doc".into(),
            seq,
            file_type: "html".into(),
            text: format!("chunk {seq}"),
        }
    }

    #[test]
    fn test_manifest_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chunks.jsonl");

        write_manifest(&path, &[row(0), row(1), row(2)]).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let rows: Vec<ManifestRow> = content
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1], row(1));
    }

    #[test]
    fn test_manifest_one_json_object_per_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chunks.jsonl");
        write_manifest(&path, &[row(0), row(1)]).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 2);
        for line in content.lines() {
            assert!(line.starts_with('{') && line.ends_with('}'));
        }
    }

    #[test]
    fn test_manifest_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/deeper/chunks.jsonl");
        write_manifest(&path, &[row(0)]).unwrap();
        assert!(path.exists());
    }
}

//! Whole-store persistence: one JSON-array file, rewritten atomically.
//!
//! The rename is the only durability boundary. A failed write leaves
//! the previous file intact; the caller logs and retries on the next
//! trigger.

use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::io::AsyncWriteExt;
use ulid::Ulid;

use crate::codec;
use crate::error::Result;
use crate::record::Record;

/// Canonical data file, created next to the process.
pub const DATA_FILE: &str = "weather_data.json";

#[derive(Debug, Clone)]
pub struct DataFile {
    path: PathBuf,
}

impl DataFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Rewrites the file from an ordered snapshot: encode, write to a
    /// sibling temp file, sync, rename over the canonical path.
    pub async fn write(&self, records: &[Record]) -> Result<()> {
        let tmp_path = self
            .path
            .with_extension(format!("{}.tmp", Ulid::new()));

        let mut file = fs::File::create(&tmp_path).await?;
        file.write_all(codec::encode_array(records).as_bytes())
            .await?;
        file.sync_all().await?;
        fs::rename(&tmp_path, &self.path).await?;
        Ok(())
    }

    /// Reads the file back as an ordered list of records. `None` means
    /// the file does not exist; a parse failure propagates so the
    /// caller can log it and continue empty.
    pub async fn read(&self) -> Result<Option<Vec<Record>>> {
        if !self.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&self.path).await?;
        Ok(Some(codec::decode_array(&content)?))
    }
}

//! JSON checkpoint of classification records, rewritten after every stay point.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use sojourn_core::{Checkpoint, LlmClassification};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::StoreError;

/// Writes the full record list to a temporary file next to `path` and renames
/// it into place, so a crash mid-write leaves the previous checkpoint intact.
#[derive(Debug, Clone)]
pub struct JsonCheckpoint {
    path: PathBuf,
}

impl JsonCheckpoint {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Records from an earlier run. A missing file means a fresh start.
    pub fn load(&self) -> Result<Vec<LlmClassification>, StoreError> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::io(&self.path, e)),
        };
        let records: Vec<LlmClassification> = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| StoreError::json(&self.path, e))?;
        info!(path = %self.path.display(), records = records.len(), "loaded checkpoint");
        Ok(records)
    }

    fn write(&self, records: &[LlmClassification]) -> Result<(), StoreError> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let tmp = NamedTempFile::new_in(dir).map_err(|e| StoreError::io(dir, e))?;
        {
            let mut writer = BufWriter::new(tmp.as_file());
            serde_json::to_writer_pretty(&mut writer, records)
                .map_err(|e| StoreError::json(&self.path, e))?;
            writer.flush().map_err(|e| StoreError::io(tmp.path(), e))?;
        }
        tmp.persist(&self.path)
            .map_err(|e| StoreError::io(&self.path, e.error))?;
        debug!(path = %self.path.display(), records = records.len(), "checkpoint written");
        Ok(())
    }
}

impl Checkpoint for JsonCheckpoint {
    fn save(&mut self, records: &[LlmClassification]) -> anyhow::Result<()> {
        self.write(records)
            .with_context(|| format!("writing checkpoint {}", self.path.display()))
    }
}

//! Merge Stage: append a batch of records to an existing metadata artifact.
//!
//! The existing artifact is copied byte for byte to the backup path before it
//! is replaced. Both artifacts are handled as plain JSON arrays: entries are
//! concatenated as is, unknown fields survive, and duplicates are kept.

use std::path::Path;

use biocorpus_common::{CorpusError, Result};
use serde::Serialize;
use serde_json::Value;
use tracing::{info, instrument, warn};

use crate::artifacts::{write_atomic, write_atomic_io};

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct MergeReport {
    pub existing: usize,
    pub added: usize,
    pub total: usize,
}

fn read_required(path: &Path) -> Result<Vec<u8>> {
    if !path.exists() {
        return Err(CorpusError::MissingInput(path.to_path_buf()));
    }
    Ok(std::fs::read(path)?)
}

fn parse_entries(bytes: &[u8]) -> Result<Vec<Value>> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Replace `existing` with `existing ++ new_batch`, keeping a backup of the old bytes.
///
/// Nothing is written unless both inputs are JSON arrays. If the backup
/// cannot be written the existing artifact is left untouched.
#[instrument]
pub fn merge_metadata(existing: &Path, new_batch: &Path, backup: &Path) -> Result<MergeReport> {
    let existing_bytes = read_required(existing)?;
    let mut entries = parse_entries(&existing_bytes)?;
    let added = parse_entries(&read_required(new_batch)?)?;

    write_atomic_io(backup, &existing_bytes).map_err(|source| CorpusError::Backup {
        path: backup.to_path_buf(),
        source,
    })?;
    info!(backup = %backup.display(), "Backup created");

    let report = MergeReport {
        existing: entries.len(),
        added: added.len(),
        total: entries.len() + added.len(),
    };
    entries.extend(added);
    write_atomic(existing, &serde_json::to_vec_pretty(&entries)?)?;

    info!(existing = report.existing, added = report.added, total = report.total, "Metadata merged");
    warn!("Vector index no longer matches the merged metadata until it is rebuilt");
    Ok(report)
}

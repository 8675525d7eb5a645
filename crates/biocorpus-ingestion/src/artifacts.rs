//! Reading and writing the metadata and index artifacts.
//!
//! Every write goes through a temp file in the destination directory that is
//! renamed over the target, so a crash never leaves a half-written artifact.

use std::io::Write;
use std::path::Path;

use biocorpus_common::{CorpusError, Result};
use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::index::IndexArtifact;
use crate::models::NormalizedRecord;

/// Atomically replace `path` with `bytes`.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    write_atomic_io(path, bytes)?;
    debug!(path = %path.display(), bytes = bytes.len(), "Artifact written");
    Ok(())
}

/// [`write_atomic`] reporting the raw I/O error.
pub fn write_atomic_io(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Metadata artifact bytes: pretty-printed JSON array, non-ASCII kept as is.
pub fn encode_metadata(records: &[NormalizedRecord]) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec_pretty(records)?)
}

pub fn write_metadata(path: &Path, records: &[NormalizedRecord]) -> Result<()> {
    write_atomic(path, &encode_metadata(records)?)
}

pub fn parse_metadata(bytes: &[u8]) -> Result<Vec<NormalizedRecord>> {
    Ok(serde_json::from_slice(bytes)?)
}

pub fn read_metadata(path: &Path) -> Result<Vec<NormalizedRecord>> {
    if !path.exists() {
        return Err(CorpusError::MissingInput(path.to_path_buf()));
    }
    parse_metadata(&std::fs::read(path)?)
}

pub fn write_index(path: &Path, artifact: &IndexArtifact) -> Result<()> {
    write_atomic(path, &artifact.encode()?)
}

pub fn read_index(path: &Path) -> Result<IndexArtifact> {
    if !path.exists() {
        return Err(CorpusError::MissingInput(path.to_path_buf()));
    }
    IndexArtifact::decode(&std::fs::read(path)?)
}

/// Hex SHA-256 over each record's id and combined text, in order.
pub fn metadata_digest(records: &[NormalizedRecord]) -> String {
    let mut hasher = Sha256::new();
    for record in records {
        hasher.update(record.id.as_bytes());
        hasher.update([0u8]);
        hasher.update(record.combined_text.as_bytes());
        hasher.update([0u8]);
    }
    format!("{:x}", hasher.finalize())
}

//! Records and vectors that can only move together.
//!
//! Position `i` of the index is the embedding of `records[i]`. The pair only
//! grows through [`AlignedCorpus::push`], and loading from disk checks that
//! the index was written for exactly this metadata.

use std::path::Path;

use biocorpus_common::{CorpusError, Result};
use tracing::{info, instrument};

use crate::artifacts::{metadata_digest, read_index, read_metadata, write_index, write_metadata};
use crate::index::{FlatL2Index, IndexArtifact};
use crate::models::NormalizedRecord;

#[derive(Debug, Clone)]
pub struct AlignedCorpus {
    records: Vec<NormalizedRecord>,
    index: FlatL2Index,
}

impl AlignedCorpus {
    pub fn new(dim: usize) -> Self {
        Self { records: Vec::new(), index: FlatL2Index::new(dim) }
    }

    /// Build from separately held parts; lengths must agree.
    pub fn from_parts(records: Vec<NormalizedRecord>, index: FlatL2Index) -> Result<Self> {
        if records.len() != index.len() {
            return Err(CorpusError::AlignmentMismatch(format!(
                "{} metadata records but {} vectors",
                records.len(),
                index.len()
            )));
        }
        Ok(Self { records, index })
    }

    /// Append a record and its vector. Nothing is added if the vector is rejected.
    pub fn push(&mut self, record: NormalizedRecord, vector: &[f32]) -> Result<()> {
        self.index.add(vector)?;
        self.records.push(record);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn dim(&self) -> usize {
        self.index.dim()
    }

    pub fn records(&self) -> &[NormalizedRecord] {
        &self.records
    }

    pub fn index(&self) -> &FlatL2Index {
        &self.index
    }

    /// Nearest records to `query`, closest first.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(&NormalizedRecord, f32)>> {
        self.index
            .search(query, k)?
            .into_iter()
            .map(|(pos, dist)| {
                self.records
                    .get(pos)
                    .map(|r| (r, dist))
                    .ok_or_else(|| CorpusError::AlignmentMismatch(format!("no record at position {pos}")))
            })
            .collect()
    }

    /// Write both artifacts. The index carries the digest of the metadata.
    #[instrument(skip(self), fields(records = self.records.len(), dim = self.dim()))]
    pub fn save(&self, index_path: &Path, metadata_path: &Path) -> Result<()> {
        let artifact = IndexArtifact::from_index(&self.index, metadata_digest(&self.records));
        write_index(index_path, &artifact)?;
        write_metadata(metadata_path, &self.records)?;
        info!(index = %index_path.display(), metadata = %metadata_path.display(), "Saved index and metadata");
        Ok(())
    }

    /// Load both artifacts, failing if they do not describe the same records.
    pub fn load(index_path: &Path, metadata_path: &Path) -> Result<Self> {
        let artifact = read_index(index_path)?;
        let records = read_metadata(metadata_path)?;

        if artifact.count != records.len() {
            return Err(CorpusError::AlignmentMismatch(format!(
                "index holds {} vectors but metadata holds {} records",
                artifact.count,
                records.len()
            )));
        }
        let digest = metadata_digest(&records);
        if artifact.metadata_digest != digest {
            return Err(CorpusError::AlignmentMismatch(
                "metadata changed since the index was written; run reindex".to_string(),
            ));
        }
        Self::from_parts(records, artifact.into_index()?)
    }
}

//! Flat L2 vector index.
//!
//! Vectors are stored row-major in one contiguous buffer; position `i` is the
//! `i`-th vector added. Search is an exact brute-force scan.

use biocorpus_common::{CorpusError, Result};
use bincode::serde::{decode_from_slice, encode_to_vec};
use serde::{Deserialize, Serialize};

pub const INDEX_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq)]
pub struct FlatL2Index {
    dim: usize,
    data: Vec<f32>,
}

impl FlatL2Index {
    pub fn new(dim: usize) -> Self {
        Self { dim, data: Vec::new() }
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn len(&self) -> usize {
        if self.dim == 0 {
            0
        } else {
            self.data.len() / self.dim
        }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Append one vector. The index is append-only.
    pub fn add(&mut self, vector: &[f32]) -> Result<()> {
        if self.dim == 0 {
            return Err(CorpusError::Index("index dimension is zero".to_string()));
        }
        if vector.len() != self.dim {
            return Err(CorpusError::Index(format!(
                "vector has {} dimensions, index expects {}",
                vector.len(),
                self.dim
            )));
        }
        self.data.extend_from_slice(vector);
        Ok(())
    }

    pub fn get(&self, position: usize) -> Option<&[f32]> {
        let start = position.checked_mul(self.dim)?;
        self.data.get(start..start + self.dim)
    }

    pub fn iter(&self) -> impl Iterator<Item = &[f32]> {
        self.data.chunks_exact(self.dim.max(1))
    }

    /// The `k` nearest positions by squared L2 distance, closest first.
    /// Ties keep insertion order.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(usize, f32)>> {
        if query.len() != self.dim {
            return Err(CorpusError::Index(format!(
                "query has {} dimensions, index expects {}",
                query.len(),
                self.dim
            )));
        }
        let mut scored: Vec<(usize, f32)> = self
            .iter()
            .enumerate()
            .map(|(i, v)| (i, squared_l2(query, v)))
            .collect();
        scored.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
        scored.truncate(k);
        Ok(scored)
    }
}

pub fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// On-disk form of the index. `metadata_digest` binds it to the metadata
/// artifact it was written with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexArtifact {
    pub format_version: u32,
    pub dim: usize,
    pub count: usize,
    pub metadata_digest: String,
    pub vectors: Vec<f32>,
}

impl IndexArtifact {
    pub fn from_index(index: &FlatL2Index, metadata_digest: String) -> Self {
        Self {
            format_version: INDEX_FORMAT_VERSION,
            dim: index.dim,
            count: index.len(),
            metadata_digest,
            vectors: index.data.clone(),
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(encode_to_vec(self, bincode::config::standard())?)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let (artifact, _): (Self, usize) = decode_from_slice(bytes, bincode::config::standard())?;
        if artifact.format_version != INDEX_FORMAT_VERSION {
            return Err(CorpusError::Index(format!(
                "unsupported index format version {}",
                artifact.format_version
            )));
        }
        Ok(artifact)
    }

    /// Rebuild the in-memory index, checking the stored shape.
    pub fn into_index(self) -> Result<FlatL2Index> {
        if self.dim == 0 || self.vectors.len() != self.dim * self.count {
            return Err(CorpusError::Index(format!(
                "corrupt index: {} values for {} vectors of dimension {}",
                self.vectors.len(),
                self.count,
                self.dim
            )));
        }
        Ok(FlatL2Index { dim: self.dim, data: self.vectors })
    }
}

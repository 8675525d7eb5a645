//! Token-to-sentence pooling.

use candle_core::Tensor;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PoolingStrategy {
    /// Average of non-padding token embeddings (sentence-transformers default).
    #[default]
    Mean,
    /// First ([CLS]) token embedding.
    Cls,
}

impl PoolingStrategy {
    /// `embeddings`: (batch, seq_len, hidden); `attention_mask`: (batch, seq_len) as F32.
    /// Returns (batch, hidden).
    pub fn apply(&self, embeddings: &Tensor, attention_mask: &Tensor) -> candle_core::Result<Tensor> {
        match self {
            PoolingStrategy::Mean => mean_pool(embeddings, attention_mask),
            PoolingStrategy::Cls => embeddings.narrow(1, 0, 1)?.squeeze(1),
        }
    }
}

fn mean_pool(embeddings: &Tensor, attention_mask: &Tensor) -> candle_core::Result<Tensor> {
    let mask = attention_mask.unsqueeze(2)?;
    let summed = embeddings.broadcast_mul(&mask)?.sum(1)?;
    let counts = mask.sum(1)?.clamp(1e-9f32, f32::MAX)?;
    summed.broadcast_div(&counts)
}

pub fn l2_normalize(embeddings: &Tensor) -> candle_core::Result<Tensor> {
    let norms = embeddings
        .sqr()?
        .sum_keepdim(1)?
        .sqrt()?
        .clamp(1e-9f32, f32::MAX)?;
    embeddings.broadcast_div(&norms)
}

//! Configuration for the local embedder.

use serde::{Deserialize, Serialize};

use crate::PoolingStrategy;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalEmbedConfig {
    /// Hugging Face model ID. Must be a BERT-architecture checkpoint.
    pub model_id: String,

    /// Token limit per text; longer inputs are truncated.
    pub max_length: usize,

    pub batch_size: usize,

    pub normalize: bool,

    pub pooling: PoolingStrategy,

    /// Try CUDA/Metal before falling back to CPU.
    pub use_gpu: bool,

    /// Overrides the Hugging Face cache location.
    pub cache_dir: Option<String>,
}

impl Default for LocalEmbedConfig {
    fn default() -> Self {
        Self {
            model_id: "NeuML/pubmedbert-base-embeddings".to_string(),
            max_length: 512,
            batch_size: 32,
            normalize: true,
            pooling: PoolingStrategy::Mean,
            use_gpu: true,
            cache_dir: None,
        }
    }
}

impl LocalEmbedConfig {
    pub fn cpu() -> Self {
        Self {
            use_gpu: false,
            ..Default::default()
        }
    }

    pub fn with_model(mut self, model_id: impl Into<String>) -> Self {
        self.model_id = model_id.into();
        self
    }

    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size.max(1);
        self
    }
}

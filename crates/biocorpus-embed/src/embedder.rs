//! Candle-backed sentence embedder.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use biocorpus_common::embedder::run_blocking;
use biocorpus_common::Embedder;
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config};
use hf_hub::api::sync::{Api, ApiBuilder};
use hf_hub::{Repo, RepoType};
use tokenizers::Tokenizer;
use tracing::{debug, info};

use crate::pooling::l2_normalize;
use crate::{EmbedError, LocalEmbedConfig, Result};

/// Sentence embedder over a BERT checkpoint from the Hugging Face Hub.
///
/// Cheap to clone; inference runs on the blocking thread pool.
#[derive(Clone)]
pub struct SentenceEmbedder {
    inner: Arc<LoadedModel>,
}

struct LoadedModel {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    config: LocalEmbedConfig,
    dim: usize,
}

struct ModelFiles {
    config: PathBuf,
    tokenizer: PathBuf,
    weights: PathBuf,
}

impl SentenceEmbedder {
    /// Download (or reuse cached) model files and load the model.
    pub async fn load(config: LocalEmbedConfig) -> Result<Self> {
        let model = tokio::task::spawn_blocking(move || LoadedModel::load(config))
            .await
            .map_err(|e| EmbedError::ModelLoad(e.to_string()))??;
        Ok(Self { inner: Arc::new(model) })
    }

    pub fn is_gpu(&self) -> bool {
        !matches!(self.inner.device, Device::Cpu)
    }
}

impl LoadedModel {
    fn load(config: LocalEmbedConfig) -> Result<Self> {
        let start = Instant::now();
        info!(model = %config.model_id, "Loading sentence embedding model");

        let device = select_device(config.use_gpu);
        let files = fetch_model_files(&config)?;

        let bert_config: Config = serde_json::from_str(&std::fs::read_to_string(&files.config)?)?;
        let dim = bert_config.hidden_size;

        let tokenizer = Tokenizer::from_file(&files.tokenizer)?;

        let is_safetensors = files
            .weights
            .extension()
            .map(|e| e == "safetensors")
            .unwrap_or(false);
        let vb = if is_safetensors {
            // SAFETY: the weights file is not modified while mapped.
            unsafe { VarBuilder::from_mmaped_safetensors(&[&files.weights], DType::F32, &device)? }
        } else {
            VarBuilder::from_pth(&files.weights, DType::F32, &device)?
        };
        let model = BertModel::load(vb, &bert_config)?;

        info!(dim, elapsed_s = start.elapsed().as_secs_f32(), "Embedding model ready");
        Ok(Self { model, tokenizer, device, config, dim })
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let encodings = self.tokenizer.encode_batch(texts.to_vec(), true)?;

        let max_len = self.config.max_length;
        let seq_len = encodings
            .iter()
            .map(|e| e.get_ids().len().min(max_len))
            .max()
            .unwrap_or(0);
        if seq_len == 0 {
            return Err(EmbedError::Tokenizer("tokenizer produced no tokens".to_string()));
        }

        let batch = encodings.len();
        let mut ids = Vec::with_capacity(batch * seq_len);
        let mut type_ids = Vec::with_capacity(batch * seq_len);
        let mut mask = Vec::with_capacity(batch * seq_len);
        for enc in &encodings {
            let len = enc.get_ids().len().min(max_len);
            ids.extend_from_slice(&enc.get_ids()[..len]);
            type_ids.extend_from_slice(&enc.get_type_ids()[..len]);
            mask.extend(enc.get_attention_mask()[..len].iter().map(|&m| m as f32));
            let pad = seq_len - len;
            ids.extend(std::iter::repeat_n(0u32, pad));
            type_ids.extend(std::iter::repeat_n(0u32, pad));
            mask.extend(std::iter::repeat_n(0f32, pad));
        }

        let input_ids = Tensor::from_vec(ids, (batch, seq_len), &self.device)?;
        let token_type_ids = Tensor::from_vec(type_ids, (batch, seq_len), &self.device)?;
        let attention_mask = Tensor::from_vec(mask, (batch, seq_len), &self.device)?;

        let hidden = self.model.forward(&input_ids, &token_type_ids, Some(&attention_mask))?;
        let pooled = self.config.pooling.apply(&hidden, &attention_mask)?;
        let pooled = if self.config.normalize { l2_normalize(&pooled)? } else { pooled };

        Ok(pooled.to_vec2::<f32>()?)
    }

    fn embed_all(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.config.batch_size.max(1)) {
            out.extend(self.embed_batch(batch)?);
        }
        Ok(out)
    }
}

#[async_trait]
impl Embedder for SentenceEmbedder {
    fn dimension(&self) -> usize {
        self.inner.dim
    }

    async fn embed(&self, texts: &[String]) -> biocorpus_common::Result<Vec<Vec<f32>>> {
        let start = Instant::now();
        let model = Arc::clone(&self.inner);
        let owned = texts.to_vec();
        let out = run_blocking(move || Ok(model.embed_all(&owned)?)).await?;
        debug!(
            n = texts.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Local embedding batch complete"
        );
        Ok(out)
    }

    fn model_name(&self) -> &str {
        &self.inner.config.model_id
    }
}

fn select_device(use_gpu: bool) -> Device {
    if !use_gpu {
        return Device::Cpu;
    }

    #[cfg(feature = "cuda")]
    {
        match Device::new_cuda(0) {
            Ok(device) => return device,
            Err(e) => debug!("CUDA not available: {}, falling back to CPU", e),
        }
    }

    #[cfg(feature = "metal")]
    {
        match Device::new_metal(0) {
            Ok(device) => return device,
            Err(e) => debug!("Metal not available: {}, falling back to CPU", e),
        }
    }

    Device::Cpu
}

fn fetch_model_files(config: &LocalEmbedConfig) -> Result<ModelFiles> {
    let api = match config.cache_dir.as_deref() {
        Some(dir) => ApiBuilder::new().with_cache_dir(Path::new(dir).to_path_buf()).build()?,
        None => Api::new()?,
    };
    let repo = api.repo(Repo::new(config.model_id.clone(), RepoType::Model));

    let config_path = repo.get("config.json")?;
    let tokenizer = repo.get("tokenizer.json")?;
    let weights = repo
        .get("model.safetensors")
        .or_else(|_| repo.get("pytorch_model.bin"))?;

    Ok(ModelFiles { config: config_path, tokenizer, weights })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cpu_device_when_gpu_disabled() {
        assert!(matches!(select_device(false), Device::Cpu));
    }

    #[tokio::test]
    #[ignore] // Downloads model weights from the Hugging Face Hub
    async fn test_local_embedding_dimension() {
        let embedder = SentenceEmbedder::load(LocalEmbedConfig::cpu()).await.unwrap();
        let texts = vec![
            "Low-dose CT screening reduces lung cancer mortality".to_string(),
            "EGFR".to_string(),
        ];
        let vectors = embedder.embed(&texts).await.unwrap();
        assert_eq!(vectors.len(), 2);
        assert!(vectors.iter().all(|v| v.len() == embedder.dimension()));
    }
}

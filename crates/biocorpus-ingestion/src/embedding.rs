//! Embedding client and the corpus embedding step.
//!
//! Supports multiple backends:
//!   - OpenAI         (`/v1/embeddings` on api.openai.com)
//!   - OpenAI-compat  (any `/v1/embeddings` endpoint)
//!   - Ollama         (`/api/embeddings`, one text per request)
//!   - Local          (Candle sentence embedder, `local-embed` feature)
//!
//! [`embed_corpus`] turns an ordered record sequence into an [`AlignedCorpus`],
//! retrying failed batches record by record and dropping what still fails.

use std::time::Duration;

use async_trait::async_trait;
use biocorpus_common::{CorpusError, Embedder, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::aligned::AlignedCorpus;
use crate::models::NormalizedRecord;

#[cfg(feature = "local-embed")]
use biocorpus_embed::{LocalEmbedConfig, SentenceEmbedder};

// ── Backend config ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    pub backend:      EmbeddingBackend,
    pub api_key:      Option<String>,
    pub model:        String,
    /// Expected vector length for HTTP backends; the local model reports its own.
    pub dim:          usize,
    pub batch_size:   usize,
    pub base_url:     Option<String>,
    pub timeout_secs: u64,
    /// L2-normalise vectors returned by HTTP backends.
    pub normalize:    bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EmbeddingBackend {
    #[serde(rename = "openai")]
    OpenAi,
    #[serde(rename = "openai_compatible")]
    OpenAiCompatible,
    #[serde(rename = "ollama")]
    Ollama,
    #[serde(rename = "local")]
    Local,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            backend:      EmbeddingBackend::Local,
            api_key:      None,
            model:        "NeuML/pubmedbert-base-embeddings".to_string(),
            dim:          768,
            batch_size:   32,
            base_url:     None,
            timeout_secs: 120,
            normalize:    false,
        }
    }
}

impl EmbeddingConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

// ── Embedding client ──────────────────────────────────────────────────────────

pub struct EmbeddingClient {
    cfg:    EmbeddingConfig,
    client: reqwest::Client,
    #[cfg(feature = "local-embed")]
    local:  Option<SentenceEmbedder>,
}

impl EmbeddingClient {
    /// Build a client. The local backend loads (and may download) its model here.
    pub async fn new(cfg: EmbeddingConfig) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(cfg.timeout()).build()?;

        #[cfg(feature = "local-embed")]
        let local = load_local(&cfg).await?;
        #[cfg(not(feature = "local-embed"))]
        load_local(&cfg).await?;

        Ok(Self {
            cfg,
            client,
            #[cfg(feature = "local-embed")]
            local,
        })
    }

    pub fn config(&self) -> &EmbeddingConfig {
        &self.cfg
    }

    /// Embed a batch of texts; returns one vector per text, in order.
    #[instrument(skip(self, texts), fields(n = texts.len(), backend = ?self.cfg.backend))]
    pub async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }
        let vectors = match self.cfg.backend {
            EmbeddingBackend::OpenAi           => self.embed_openai(texts).await?,
            EmbeddingBackend::OpenAiCompatible => self.embed_compat(texts).await?,
            EmbeddingBackend::Ollama           => self.embed_ollama(texts).await?,
            EmbeddingBackend::Local            => return self.embed_local(texts).await,
        };
        if vectors.len() != texts.len() {
            return Err(CorpusError::Embedding(format!(
                "backend returned {} vectors for {} texts",
                vectors.len(),
                texts.len()
            )));
        }
        Ok(if self.cfg.normalize {
            vectors.iter().map(|v| l2_normalize(v)).collect()
        } else {
            vectors
        })
    }

    // ── OpenAI ─────────────────────────────────────────────────────────────

    async fn embed_openai(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let key = self.cfg.api_key.as_deref().ok_or_else(|| {
            CorpusError::Config("the openai embedding backend needs an api key".to_string())
        })?;
        let base = self.cfg.base_url.as_deref()
            .unwrap_or("https://api.openai.com").trim_end_matches('/');
        let body = serde_json::json!({
            "model": &self.cfg.model,
            "input": texts,
        });
        let resp: serde_json::Value = self.client
            .post(format!("{base}/v1/embeddings"))
            .bearer_auth(key)
            .json(&body)
            .send().await?
            .error_for_status()?
            .json().await?;
        parse_openai_embeddings(&resp)
    }

    // ── OpenAI-compatible ──────────────────────────────────────────────────

    async fn embed_compat(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let base = self.cfg.base_url.as_deref()
            .unwrap_or("http://localhost:8000").trim_end_matches('/');
        let body = serde_json::json!({
            "model": &self.cfg.model,
            "input": texts,
        });
        let mut req = self.client.post(format!("{base}/v1/embeddings")).json(&body);
        if let Some(ref k) = self.cfg.api_key {
            req = req.bearer_auth(k);
        }
        let resp: serde_json::Value = req.send().await?.error_for_status()?.json().await?;
        parse_openai_embeddings(&resp)
    }

    // ── Ollama ─────────────────────────────────────────────────────────────

    async fn embed_ollama(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let base = self.cfg.base_url.as_deref()
            .unwrap_or("http://localhost:11434").trim_end_matches('/');
        let url = format!("{base}/api/embeddings");
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            let body = serde_json::json!({"model": &self.cfg.model, "prompt": text});
            let resp: serde_json::Value = self.client.post(&url).json(&body)
                .send().await?
                .error_for_status()?
                .json().await?;
            out.push(parse_vector(&resp["embedding"])?);
        }
        Ok(out)
    }

    // ── Local (Candle) ─────────────────────────────────────────────────────

    #[cfg(feature = "local-embed")]
    async fn embed_local(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        match &self.local {
            Some(embedder) => embedder.embed(texts).await,
            None => Err(CorpusError::Embedding("local embedder not loaded".to_string())),
        }
    }

    #[cfg(not(feature = "local-embed"))]
    async fn embed_local(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Err(local_backend_disabled())
    }

    #[cfg(feature = "local-embed")]
    fn local_dimension(&self) -> Option<usize> {
        self.local.as_ref().map(|e| e.dimension())
    }

    #[cfg(not(feature = "local-embed"))]
    fn local_dimension(&self) -> Option<usize> {
        None
    }
}

#[cfg(feature = "local-embed")]
async fn load_local(cfg: &EmbeddingConfig) -> Result<Option<SentenceEmbedder>> {
    if cfg.backend != EmbeddingBackend::Local {
        return Ok(None);
    }
    let local_cfg = LocalEmbedConfig::default()
        .with_model(cfg.model.clone())
        .with_batch_size(cfg.batch_size);
    let embedder = SentenceEmbedder::load(local_cfg).await?;
    info!(model = %cfg.model, dim = embedder.dimension(), gpu = embedder.is_gpu(), "Local embedder ready");
    Ok(Some(embedder))
}

#[cfg(not(feature = "local-embed"))]
async fn load_local(cfg: &EmbeddingConfig) -> Result<()> {
    if cfg.backend == EmbeddingBackend::Local {
        return Err(local_backend_disabled());
    }
    Ok(())
}

#[cfg(not(feature = "local-embed"))]
fn local_backend_disabled() -> CorpusError {
    CorpusError::Config("the local embedding backend requires the 'local-embed' feature".to_string())
}

#[async_trait]
impl Embedder for EmbeddingClient {
    fn dimension(&self) -> usize {
        self.local_dimension().unwrap_or(self.cfg.dim)
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.embed_batch(texts).await
    }

    fn model_name(&self) -> &str {
        &self.cfg.model
    }
}

/// Vectors from an OpenAI-style `{"data": [{"index": i, "embedding": [...]}]}` body,
/// ordered by `index`.
pub fn parse_openai_embeddings(resp: &serde_json::Value) -> Result<Vec<Vec<f32>>> {
    let items = resp["data"].as_array().ok_or_else(|| {
        CorpusError::Embedding("embedding response has no 'data' array".to_string())
    })?;
    let mut indexed = Vec::with_capacity(items.len());
    for (pos, item) in items.iter().enumerate() {
        let index = item["index"].as_u64().map(|i| i as usize).unwrap_or(pos);
        indexed.push((index, parse_vector(&item["embedding"])?));
    }
    indexed.sort_by_key(|(i, _)| *i);
    Ok(indexed.into_iter().map(|(_, v)| v).collect())
}

fn parse_vector(value: &serde_json::Value) -> Result<Vec<f32>> {
    value
        .as_array()
        .ok_or_else(|| CorpusError::Embedding("embedding is not an array".to_string()))?
        .iter()
        .map(|v| {
            v.as_f64()
                .map(|f| f as f32)
                .ok_or_else(|| CorpusError::Embedding(format!("non-numeric embedding value: {v}")))
        })
        .collect()
}

fn l2_norm(v: &[f32]) -> f32 {
    let s: f32 = v.iter().map(|x| x * x).sum();
    s.sqrt().max(1e-10)
}

fn l2_normalize(v: &[f32]) -> Vec<f32> {
    let norm = l2_norm(v);
    v.iter().map(|x| x / norm).collect()
}

// ── Pipeline step: embed a corpus ─────────────────────────────────────────────

/// Outcome of [`embed_corpus`].
#[derive(Debug)]
pub struct EmbeddedCorpus {
    pub corpus:   AlignedCorpus,
    /// Records dropped because they could not be embedded.
    pub failures: usize,
}

async fn embed_with_timeout<E>(embedder: &E, texts: &[String], timeout: Duration) -> Result<Vec<Vec<f32>>>
where
    E: Embedder + ?Sized,
{
    let vectors = tokio::time::timeout(timeout, embedder.embed(texts))
        .await
        .map_err(|_| CorpusError::Embedding(format!("embedding timed out after {timeout:?}")))??;
    if vectors.len() != texts.len() {
        return Err(CorpusError::Embedding(format!(
            "embedder returned {} vectors for {} texts",
            vectors.len(),
            texts.len()
        )));
    }
    Ok(vectors)
}

/// Embed `records` in order and pair each with its vector.
///
/// A failed or timed-out batch is retried one record at a time; a record that
/// still fails is dropped and counted. A vector of the wrong dimension aborts
/// the step, as does a corpus in which nothing could be embedded.
#[instrument(skip(records, embedder), fields(n = records.len(), model = embedder.model_name()))]
pub async fn embed_corpus<E>(
    records: Vec<NormalizedRecord>,
    embedder: &E,
    batch_size: usize,
    timeout: Duration,
) -> Result<EmbeddedCorpus>
where
    E: Embedder + ?Sized,
{
    if records.is_empty() {
        return Err(CorpusError::EmptyBatch("no records to embed".to_string()));
    }
    let mut corpus = AlignedCorpus::new(embedder.dimension());
    let mut failures = 0usize;
    let total = records.len();

    for batch in records.chunks(batch_size.max(1)) {
        let texts: Vec<String> = batch.iter().map(|r| r.combined_text.clone()).collect();

        match embed_with_timeout(embedder, &texts, timeout).await {
            Ok(vectors) => {
                for (record, vector) in batch.iter().zip(&vectors) {
                    corpus.push(record.clone(), vector)?;
                }
            }
            Err(e) => {
                warn!(error = %e, size = batch.len(), "Embedding batch failed, retrying per record");
                for (record, text) in batch.iter().zip(texts) {
                    match embed_with_timeout(embedder, std::slice::from_ref(&text), timeout).await {
                        Ok(vectors) => corpus.push(record.clone(), &vectors[0])?,
                        Err(e) => {
                            warn!(id = %record.id, error = %e, "Record could not be embedded, dropped");
                            failures += 1;
                        }
                    }
                }
            }
        }
        debug!(embedded = corpus.len(), total, "Embedding progress");
    }

    if corpus.is_empty() {
        return Err(CorpusError::EmptyBatch(format!(
            "none of {total} records could be embedded"
        )));
    }
    info!(embedded = corpus.len(), failures, dim = corpus.dim(), "Embedding step complete");
    Ok(EmbeddedCorpus { corpus, failures })
}

// ── Tests ─────────────────────────────────────────────────────────────────────

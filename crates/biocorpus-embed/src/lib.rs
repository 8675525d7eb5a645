//! Biocorpus local embedding backend.
//!
//! Runs a BERT-family sentence-embedding model with Candle, downloading the
//! weights from the Hugging Face Hub on first use. Sentence vectors are
//! mean-pooled over non-padding tokens and L2-normalised.
//!
//! # Example
//! ```no_run
//! use biocorpus_common::Embedder;
//! use biocorpus_embed::{LocalEmbedConfig, SentenceEmbedder};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let embedder = SentenceEmbedder::load(LocalEmbedConfig::cpu()).await?;
//! let vectors = embedder.embed(&["EGFR mutations in lung adenocarcinoma".to_string()]).await?;
//! assert_eq!(vectors[0].len(), embedder.dimension());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod embedder;
pub mod error;
pub mod pooling;

pub use config::LocalEmbedConfig;
pub use embedder::SentenceEmbedder;
pub use error::{EmbedError, Result};
pub use pooling::PoolingStrategy;

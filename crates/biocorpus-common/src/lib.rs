//! biocorpus-common: Shared error type and collaborator traits used across all Biocorpus crates.

pub mod embedder;
pub mod error;

pub use embedder::Embedder;
pub use error::{CorpusError, Result};

//! Configuration loading for biocorpus.
//! Reads biocorpus.toml from the current directory or the path in the
//! BIOCORPUS_CONFIG env var. Every field has a default, so the file and any of
//! its sections may be omitted.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use biocorpus_ingestion::embedding::{EmbeddingBackend, EmbeddingConfig};
use biocorpus_ingestion::normalise::web::WebDefaults;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const CONFIG_ENV: &str = "BIOCORPUS_CONFIG";
pub const API_KEY_ENV: &str = "BIOCORPUS_EMBEDDING_API_KEY";
const DEFAULT_CONFIG_FILE: &str = "biocorpus.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub embedding: EmbeddingSection,
    #[serde(default)]
    pub web: WebSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "default_xml_dir")]
    pub xml_dir: PathBuf,
    #[serde(default = "default_index")]
    pub index: PathBuf,
    #[serde(default = "default_metadata")]
    pub metadata: PathBuf,
    #[serde(default = "default_web_batch")]
    pub web_batch: PathBuf,
    #[serde(default = "default_backup")]
    pub backup: PathBuf,
}

fn default_xml_dir()   -> PathBuf { PathBuf::from("data/PMC_XML_Files") }
fn default_index()     -> PathBuf { PathBuf::from("data/lung_corpus.index") }
fn default_metadata()  -> PathBuf { PathBuf::from("data/lung_metadata.json") }
fn default_web_batch() -> PathBuf { PathBuf::from("data/lung_metadata_web_fetched.json") }
fn default_backup()    -> PathBuf { PathBuf::from("data/lung_metadata_backup.json") }

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            xml_dir:   default_xml_dir(),
            index:     default_index(),
            metadata:  default_metadata(),
            web_batch: default_web_batch(),
            backup:    default_backup(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingSection {
    #[serde(default = "default_backend")]
    pub backend: EmbeddingBackend,
    #[serde(default = "default_embed_model")]
    pub model: String,
    #[serde(default = "default_dim")]
    pub dim: usize,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_embed_timeout")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub normalize: bool,
}

fn default_backend()       -> EmbeddingBackend { EmbeddingBackend::Local }
fn default_embed_model()   -> String { "NeuML/pubmedbert-base-embeddings".to_string() }
fn default_dim()           -> usize  { 768 }
fn default_batch_size()    -> usize  { 32 }
fn default_embed_timeout() -> u64    { 120 }

impl Default for EmbeddingSection {
    fn default() -> Self {
        Self {
            backend:      default_backend(),
            model:        default_embed_model(),
            dim:          default_dim(),
            batch_size:   default_batch_size(),
            timeout_secs: default_embed_timeout(),
            base_url:     None,
            api_key:      None,
            normalize:    false,
        }
    }
}

impl EmbeddingSection {
    /// Client config; an empty or missing api_key falls back to BIOCORPUS_EMBEDDING_API_KEY.
    pub fn to_client_config(&self) -> EmbeddingConfig {
        let api_key = self
            .api_key
            .clone()
            .filter(|k| !k.is_empty())
            .or_else(|| std::env::var(API_KEY_ENV).ok().filter(|k| !k.is_empty()));
        EmbeddingConfig {
            backend:      self.backend,
            api_key,
            model:        self.model.clone(),
            dim:          self.dim,
            batch_size:   self.batch_size.max(1),
            base_url:     self.base_url.clone(),
            timeout_secs: self.timeout_secs,
            normalize:    self.normalize,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebSection {
    #[serde(default)]
    pub urls: Vec<String>,
    #[serde(default = "default_web_keywords")]
    pub keywords: Vec<String>,
    #[serde(default = "default_web_year")]
    pub year: String,
    #[serde(default = "default_max_paragraphs")]
    pub max_paragraphs: usize,
    #[serde(default = "default_web_timeout")]
    pub timeout_secs: u64,
}

fn default_web_keywords()   -> Vec<String> { WebDefaults::default().keywords }
fn default_web_year()       -> String { WebDefaults::default().year }
fn default_max_paragraphs() -> usize  { 10 }
fn default_web_timeout()    -> u64    { 10 }

impl Default for WebSection {
    fn default() -> Self {
        Self {
            urls:           Vec::new(),
            keywords:       default_web_keywords(),
            year:           default_web_year(),
            max_paragraphs: default_max_paragraphs(),
            timeout_secs:   default_web_timeout(),
        }
    }
}

impl WebSection {
    pub fn defaults(&self) -> WebDefaults {
        WebDefaults {
            year: self.year.clone(),
            keywords: self.keywords.clone(),
            max_paragraphs: self.max_paragraphs,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

mod tests;

impl Config {
    /// Load configuration.
    ///
    /// An explicit path (flag or BIOCORPUS_CONFIG) must exist; the implicit
    /// ./biocorpus.toml falls back to defaults when absent.
    pub fn load(explicit: Option<&Path>) -> anyhow::Result<Self> {
        let from_env = std::env::var(CONFIG_ENV).ok().map(PathBuf::from);
        match explicit.map(Path::to_path_buf).or(from_env) {
            Some(path) => Self::load_from(&path),
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => Self::load_from(Path::new(DEFAULT_CONFIG_FILE)),
            None => {
                debug!("No {DEFAULT_CONFIG_FILE} found, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            anyhow::bail!(
                "Config file not found: {}\n\
                 Copy biocorpus.example.toml to biocorpus.toml and edit it.",
                path.display()
            );
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn parse(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }
}

//! End-to-end pipeline commands.
//!
//! - `build`:   BioC folder → Corpus → embed → index + metadata artifacts
//! - `reindex`: metadata artifact → embed → both artifacts rewritten
//! - `scrape`:  URL list → web records → web batch artifact
//! - `inspect`: load the aligned artifact pair and report on it
//!
//! Every command that writes does so only after its inputs produced at least
//! one record, so a failed run never leaves empty artifacts behind.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use biocorpus_common::{CorpusError, Embedder, Result};
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::aligned::AlignedCorpus;
use crate::artifacts::{metadata_digest, read_metadata, write_metadata};
use crate::corpus::build_corpus;
use crate::embedding::embed_corpus;
use crate::models::RecordStatus;
use crate::sources::web::WebFetcher;

/// Where the aligned artifact pair lives.
#[derive(Debug, Clone, Serialize)]
pub struct ArtifactPaths {
    pub index: PathBuf,
    pub metadata: PathBuf,
}

/// How the embedding step is driven.
#[derive(Debug, Clone, Copy)]
pub struct EmbedSettings {
    pub batch_size: usize,
    pub timeout: Duration,
}

impl Default for EmbedSettings {
    fn default() -> Self {
        Self { batch_size: 32, timeout: Duration::from_secs(120) }
    }
}

// ── Reports ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct BuildReport {
    pub files_seen: usize,
    pub parse_failures: usize,
    pub recovered_files: usize,
    pub documents: usize,
    pub filtered: usize,
    pub records: usize,
    pub embed_failures: usize,
    pub dim: usize,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReindexReport {
    pub loaded: usize,
    pub excluded: usize,
    pub records: usize,
    pub embed_failures: usize,
    pub dim: usize,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScrapeReport {
    pub urls: usize,
    pub ok: usize,
    pub filtered: usize,
    pub fetch_errors: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct InspectReport {
    pub records: usize,
    pub dim: usize,
    pub metadata_digest: String,
}

// ── Commands ──────────────────────────────────────────────────────────────────

/// Build the aligned corpus from a folder of BioC files and persist it.
#[instrument(skip(embedder, settings), fields(model = embedder.model_name()))]
pub async fn run_build<E>(
    xml_dir: &Path,
    paths: &ArtifactPaths,
    embedder: &E,
    settings: EmbedSettings,
) -> Result<BuildReport>
where
    E: Embedder + ?Sized,
{
    let start = Instant::now();
    let (records, corpus_report) = build_corpus(xml_dir)?;

    let embedded = embed_corpus(records, embedder, settings.batch_size, settings.timeout).await?;
    embedded.corpus.save(&paths.index, &paths.metadata)?;

    let report = BuildReport {
        files_seen: corpus_report.files_seen,
        parse_failures: corpus_report.parse_failures,
        recovered_files: corpus_report.recovered_files,
        documents: corpus_report.documents,
        filtered: corpus_report.filtered,
        records: embedded.corpus.len(),
        embed_failures: embedded.failures,
        dim: embedded.corpus.dim(),
        duration_ms: start.elapsed().as_millis() as u64,
    };
    info!(?report, "Build complete");
    Ok(report)
}

/// Re-embed the metadata artifact and rewrite both artifacts from it.
///
/// Only `ok` records with enough text are kept; the previous metadata is
/// copied to `backup` before anything is overwritten.
#[instrument(skip(embedder, settings), fields(model = embedder.model_name()))]
pub async fn run_reindex<E>(
    paths: &ArtifactPaths,
    backup: &Path,
    embedder: &E,
    settings: EmbedSettings,
) -> Result<ReindexReport>
where
    E: Embedder + ?Sized,
{
    let start = Instant::now();
    let loaded = read_metadata(&paths.metadata)?;
    let total = loaded.len();

    let mut records = Vec::with_capacity(total);
    for record in loaded {
        if record.is_indexable() {
            records.push(record);
        } else {
            warn!(id = %record.id, status = record.status.as_str(), "Record excluded from index");
        }
    }
    let excluded = total - records.len();
    if records.is_empty() {
        return Err(CorpusError::EmptyBatch(format!(
            "none of {total} records in {} can be indexed",
            paths.metadata.display()
        )));
    }

    let embedded = embed_corpus(records, embedder, settings.batch_size, settings.timeout).await?;

    std::fs::copy(&paths.metadata, backup).map_err(|source| CorpusError::Backup {
        path: backup.to_path_buf(),
        source,
    })?;
    info!(backup = %backup.display(), "Backup created");
    embedded.corpus.save(&paths.index, &paths.metadata)?;

    let report = ReindexReport {
        loaded: total,
        excluded,
        records: embedded.corpus.len(),
        embed_failures: embedded.failures,
        dim: embedded.corpus.dim(),
        duration_ms: start.elapsed().as_millis() as u64,
    };
    info!(?report, "Reindex complete");
    Ok(report)
}

/// Fetch every URL and write the records, error records included, as a batch.
#[instrument(skip(fetcher, urls), fields(n = urls.len()))]
pub async fn run_scrape(fetcher: &WebFetcher, urls: &[String], out: &Path) -> Result<ScrapeReport> {
    if urls.is_empty() {
        return Err(CorpusError::EmptyBatch("no URLs to scrape".to_string()));
    }
    let records = fetcher.fetch_all(urls).await;
    let count = |status: RecordStatus| records.iter().filter(|r| r.status == status).count();
    let report = ScrapeReport {
        urls: urls.len(),
        ok: count(RecordStatus::Ok),
        filtered: count(RecordStatus::Filtered),
        fetch_errors: count(RecordStatus::FetchError),
    };
    write_metadata(out, &records)?;
    info!(?report, out = %out.display(), "Web batch written");
    Ok(report)
}

/// Load the artifact pair, failing if it is misaligned.
pub fn inspect(paths: &ArtifactPaths) -> Result<InspectReport> {
    let corpus = AlignedCorpus::load(&paths.index, &paths.metadata)?;
    Ok(InspectReport {
        records: corpus.len(),
        dim: corpus.dim(),
        metadata_digest: metadata_digest(corpus.records()),
    })
}

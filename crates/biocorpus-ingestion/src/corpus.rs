//! Corpus Builder: normalises a folder of BioC files into an ordered record
//! sequence.
//!
//! Files are visited in lexicographic path order and records keep their
//! in-file order. A file with no readable root element contributes nothing
//! and is counted as a parse failure; a file damaged after its root opened
//! contributes the documents that closed before the damage and is counted as
//! recovered. Records failing the length filter are counted and dropped.

use std::path::{Path, PathBuf};

use biocorpus_common::{CorpusError, Result};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::models::{NormalizedRecord, RecordStatus};
use crate::normalise::bioc::normalize_document;
use crate::sources::bioc::{parse_bioc_xml, read_bioc_file, BiocCollection};

pub const SOURCE_EXTENSION: &str = ".xml";

/// Records kept from one source file.
#[derive(Debug, Clone, Default)]
pub struct ParsedFile {
    pub documents: usize,
    pub records: Vec<NormalizedRecord>,
    pub filtered: usize,
    /// Why reading stopped early, when it did.
    pub damage: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct CorpusReport {
    pub files_seen: usize,
    pub parse_failures: usize,
    pub recovered_files: usize,
    pub documents: usize,
    pub filtered: usize,
    pub records: usize,
}

fn normalize_documents(collection: BiocCollection) -> ParsedFile {
    let mut parsed = ParsedFile {
        documents: collection.documents.len(),
        damage: collection.damage,
        ..Default::default()
    };
    for doc in &collection.documents {
        let record = normalize_document(doc);
        if record.status == RecordStatus::Ok {
            parsed.records.push(record);
        } else {
            debug!(id = %record.id, chars = record.combined_text.chars().count(), "Record below length threshold, dropped");
            parsed.filtered += 1;
        }
    }
    parsed
}

/// Normalise every document of an in-memory BioC collection.
pub fn normalize_collection(xml: &str) -> Result<ParsedFile> {
    Ok(normalize_documents(parse_bioc_xml(xml)?))
}

fn normalize_file(path: &Path) -> Result<ParsedFile> {
    Ok(normalize_documents(read_bioc_file(path)?))
}

/// Source files in `dir`, sorted. Non-matching extensions and directories are skipped.
pub fn list_source_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(CorpusError::MissingInput(dir.to_path_buf()));
    }
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let matches = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.ends_with(SOURCE_EXTENSION))
            .unwrap_or(false);
        if matches && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Build the ordered corpus from every source file in `dir`.
///
/// Fails with `EmptyBatch` when no record survives, so nothing downstream
/// writes artifacts for an empty corpus.
#[instrument]
pub fn build_corpus(dir: &Path) -> Result<(Vec<NormalizedRecord>, CorpusReport)> {
    let files = list_source_files(dir)?;
    if files.is_empty() {
        warn!(dir = %dir.display(), "No source files found");
    } else {
        info!(count = files.len(), "Found source files to parse");
    }

    let mut report = CorpusReport { files_seen: files.len(), ..Default::default() };
    let mut records = Vec::new();

    for file in &files {
        match normalize_file(file) {
            Ok(parsed) => {
                if let Some(damage) = &parsed.damage {
                    warn!(file = %file.display(), damage = %damage, kept = parsed.documents, "Source file damaged, kept documents read before the damage");
                    report.recovered_files += 1;
                }
                report.documents += parsed.documents;
                report.filtered += parsed.filtered;
                records.extend(parsed.records);
            }
            Err(e) => {
                warn!(file = %file.display(), error = %e, "Failed to parse source file");
                report.parse_failures += 1;
            }
        }
    }

    report.records = records.len();
    if records.is_empty() {
        warn!(?report, "No valid records found");
        return Err(CorpusError::EmptyBatch(format!(
            "no records survived from {} file(s) in {}",
            report.files_seen,
            dir.display()
        )));
    }

    info!(
        records = report.records,
        filtered = report.filtered,
        parse_failures = report.parse_failures,
        recovered_files = report.recovered_files,
        "Corpus built"
    );
    Ok((records, report))
}

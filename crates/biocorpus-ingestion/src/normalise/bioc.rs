//! Structured-document normaliser: one BioC document to one record.
//!
//! Sections accumulate into the record text fields; bibliographic infons
//! (journal, year, doi, keywords, authors, pages) are read from every passage.

use tracing::debug;

use crate::author::AuthorName;
use crate::models::{NormalizedRecord, SectionType, UNKNOWN};
use crate::sources::bioc::{BiocDocument, BiocPassage};

use super::clean_text;

/// Titles this short or shorter are treated as stray fragments.
const MIN_TITLE_CHARS: usize = 5;

/// Normalise one document. The returned record's `status` tells whether it
/// passed the length filter; callers decide what to do with filtered ones.
pub fn normalize_document(doc: &BiocDocument) -> NormalizedRecord {
    let id = doc
        .id
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(UNKNOWN);
    let mut record = NormalizedRecord::empty(id);

    for passage in &doc.passages {
        apply_section(&mut record, passage);
        for (key, value) in &passage.infons {
            apply_infon(&mut record, key, value);
        }
    }

    record.finalize();
    record
}

fn apply_section(record: &mut NormalizedRecord, passage: &BiocPassage) {
    let text = clean_text(&passage.text);
    if text.is_empty() {
        return;
    }
    let Some(section) = SectionType::classify(passage.infon("section_type").unwrap_or("")) else {
        return;
    };

    let target = match section {
        SectionType::Title => {
            if text.chars().count() > MIN_TITLE_CHARS {
                record.title = text;
            }
            return;
        }
        SectionType::Abstract => &mut record.abstract_text,
        SectionType::Introduction => &mut record.introduction,
        SectionType::Methods => &mut record.methods,
        SectionType::Results => &mut record.results,
    };
    target.push_str(&text);
    target.push(' ');
}

fn apply_infon(record: &mut NormalizedRecord, key: &str, value: &str) {
    let key = key.to_lowercase();
    let value = value.trim();

    match key.as_str() {
        "journal-title" => record.journal = value.to_string(),
        "year" => {
            if !value.is_empty() && value.chars().all(|c| c.is_ascii_digit()) {
                record.year = value.to_string();
            }
        }
        "article-id_doi" => record.doi = value.to_string(),
        "kwd" => record.keywords.extend(value.split_whitespace().map(String::from)),
        "fpage" => record.set_first_page(value),
        "lpage" => record.set_last_page(value),
        k if k.starts_with("name_") => match AuthorName::parse(value) {
            Ok(name) => record.authors.push(name.to_string()),
            Err(e) => debug!(id = %record.id, key = k, error = %e, "Ignoring malformed author infon"),
        },
        _ => {}
    }
}

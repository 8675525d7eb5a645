//! Web-page normaliser: one fetched page (or fetch failure) to one record.

use anyhow::anyhow;
use biocorpus_common::{CorpusError, Result};
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use url::Url;

use crate::models::{NormalizedRecord, RecordStatus};

const NO_TITLE: &str = "No Title";
const NO_ABSTRACT: &str = "No abstract found.";
const FETCH_ERROR_TITLE: &str = "Error fetching page";

/// Fixed field values stamped on every web record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebDefaults {
    pub year: String,
    pub keywords: Vec<String>,
    /// How many leading paragraphs make up `combined_text`.
    pub max_paragraphs: usize,
}

impl Default for WebDefaults {
    fn default() -> Self {
        Self {
            year: "2025".to_string(),
            keywords: vec!["lung cancer".to_string(), "screening".to_string(), "web".to_string()],
            max_paragraphs: 10,
        }
    }
}

/// First 10 hex characters of the SHA-256 of the URL.
pub fn url_record_id(url: &str) -> String {
    let digest = format!("{:x}", Sha256::digest(url.as_bytes()));
    digest[..10].to_string()
}

/// Host (with port, when explicit) of the URL; empty when it does not parse.
pub fn url_host(url: &str) -> String {
    let Ok(parsed) = Url::parse(url) else {
        return String::new();
    };
    match (parsed.host_str(), parsed.port()) {
        (Some(host), Some(port)) => format!("{host}:{port}"),
        (Some(host), None) => host.to_string(),
        _ => String::new(),
    }
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| CorpusError::Other(anyhow!("invalid selector {css}: {e}")))
}

fn base_record(url: &str, defaults: &WebDefaults) -> NormalizedRecord {
    NormalizedRecord {
        id: url_record_id(url),
        title: String::new(),
        abstract_text: String::new(),
        introduction: String::new(),
        methods: String::new(),
        results: String::new(),
        year: defaults.year.clone(),
        journal: url_host(url),
        doi: String::new(),
        authors: Vec::new(),
        keywords: defaults.keywords.clone(),
        pages: String::new(),
        combined_text: String::new(),
        url: Some(url.to_string()),
        status: RecordStatus::Ok,
    }
}

/// Build a record from a page's raw HTML.
pub fn normalize_page(url: &str, html: &str, defaults: &WebDefaults) -> Result<NormalizedRecord> {
    let document = Html::parse_document(html);
    let title_sel = selector("title")?;
    let para_sel = selector("p")?;

    let mut record = base_record(url, defaults);

    record.title = document
        .select(&title_sel)
        .next()
        .map(|t| t.text().collect::<String>().trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| NO_TITLE.to_string());

    // each text node trimmed, empty ones dropped, the rest concatenated
    let paragraphs: Vec<String> = document
        .select(&para_sel)
        .map(|p| p.text().map(str::trim).filter(|s| !s.is_empty()).collect())
        .collect();

    record.abstract_text = paragraphs
        .first()
        .cloned()
        .unwrap_or_else(|| NO_ABSTRACT.to_string());
    record.combined_text = paragraphs
        .iter()
        .take(defaults.max_paragraphs)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join("\n\n");
    record.status = RecordStatus::assess(&record.combined_text);

    Ok(record)
}

/// Record standing in for a page that could not be fetched.
pub fn fetch_error_record(url: &str, error: &str, defaults: &WebDefaults) -> NormalizedRecord {
    let mut record = base_record(url, defaults);
    record.title = FETCH_ERROR_TITLE.to_string();
    record.abstract_text = error.to_string();
    record.keywords = vec!["error".to_string()];
    record.status = RecordStatus::FetchError;
    record
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<html><head><title>
        Lung Cancer Screening (PDQ) </title></head>
        <body>
          <p>  Lung cancer screening uses <b>low-dose</b> CT scans to find cancer early in adults who smoke. </p>
          <p>Second paragraph.</p>
          <p>Third paragraph.</p>
        </body></html>"#;

    #[test]
    fn test_record_id_is_stable_prefix() {
        let id = url_record_id("https://www.cancer.gov/types/lung");
        assert_eq!(id.len(), 10);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(id, url_record_id("https://www.cancer.gov/types/lung"));
        assert_ne!(id, url_record_id("https://www.cancer.gov/types/breast"));
    }

    #[test]
    fn test_url_host() {
        assert_eq!(url_host("https://www.lung.org/blog/x"), "www.lung.org");
        assert_eq!(url_host("http://localhost:8080/p"), "localhost:8080");
        assert_eq!(url_host("not a url"), "");
    }

    #[test]
    fn test_normalize_page_fields() {
        let url = "https://www.cancer.gov/types/lung/patient/lung-screening-pdq";
        let record = normalize_page(url, PAGE, &WebDefaults::default()).unwrap();

        assert_eq!(record.title, "Lung Cancer Screening (PDQ)");
        assert_eq!(
            record.abstract_text,
            "Lung cancer screening useslow-doseCT scans to find cancer early in adults who smoke."
        );
        assert!(record.combined_text.ends_with("\n\nSecond paragraph.\n\nThird paragraph."));
        assert_eq!(record.journal, "www.cancer.gov");
        assert_eq!(record.year, "2025");
        assert_eq!(record.keywords, vec!["lung cancer", "screening", "web"]);
        assert!(record.authors.is_empty());
        assert_eq!(record.pages, "");
        assert_eq!(record.url.as_deref(), Some(url));
        assert_eq!(record.status, RecordStatus::Ok);
    }

    #[test]
    fn test_paragraph_limit() {
        let html: String = (0..15).map(|i| format!("<p>paragraph {i}</p>")).collect();
        let defaults = WebDefaults { max_paragraphs: 3, ..Default::default() };
        let record = normalize_page("https://example.org/", &html, &defaults).unwrap();
        assert_eq!(record.combined_text, "paragraph 0\n\nparagraph 1\n\nparagraph 2");
        assert_eq!(record.status, RecordStatus::Filtered);
    }

    #[test]
    fn test_page_without_title_or_paragraphs() {
        let record = normalize_page("https://example.org/", "<html><body>hi</body></html>", &WebDefaults::default()).unwrap();
        assert_eq!(record.title, "No Title");
        assert_eq!(record.abstract_text, "No abstract found.");
        assert_eq!(record.combined_text, "");
    }

    #[test]
    fn test_fetch_error_record() {
        let record = fetch_error_record("https://www.lung.org/x", "connection refused", &WebDefaults::default());
        assert_eq!(record.title, "Error fetching page");
        assert_eq!(record.abstract_text, "connection refused");
        assert_eq!(record.keywords, vec!["error"]);
        assert_eq!(record.combined_text, "");
        assert_eq!(record.journal, "www.lung.org");
        assert_eq!(record.status, RecordStatus::FetchError);
        assert!(!record.is_indexable());
    }
}

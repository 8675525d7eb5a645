//! Data model for normalised corpus records.

use serde::{Deserialize, Deserializer, Serialize};

/// Sentinel for bibliographic fields the source never supplied.
pub const UNKNOWN: &str = "Unknown";

/// Records whose combined text has this many characters or fewer are not indexed.
pub const MIN_COMBINED_CHARS: usize = 50;

/// Passage sections that contribute to a record's text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionType {
    Title,
    Abstract,
    Introduction,
    Methods,
    Results,
}

impl SectionType {
    /// Classify a BioC `section_type` value. Stems are matched as
    /// case-insensitive substrings; the first match in priority order wins.
    pub fn classify(section_type: &str) -> Option<Self> {
        let s = section_type.to_lowercase();
        if s.contains("title") {
            Some(SectionType::Title)
        } else if s.contains("abstract") {
            Some(SectionType::Abstract)
        } else if s.contains("intro") {
            Some(SectionType::Introduction)
        } else if s.contains("method") {
            Some(SectionType::Methods)
        } else if s.contains("result") {
            Some(SectionType::Results)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SectionType::Title => "title",
            SectionType::Abstract => "abstract",
            SectionType::Introduction => "introduction",
            SectionType::Methods => "methods",
            SectionType::Results => "results",
        }
    }
}

/// Where a record stands with respect to the index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    #[default]
    Ok,
    /// Combined text too short to be worth embedding.
    Filtered,
    /// The page could not be fetched; the record only carries the error.
    FetchError,
}

impl RecordStatus {
    /// Status implied by the length rule alone.
    pub fn assess(combined_text: &str) -> Self {
        if combined_text.chars().count() > MIN_COMBINED_CHARS {
            RecordStatus::Ok
        } else {
            RecordStatus::Filtered
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RecordStatus::Ok => "ok",
            RecordStatus::Filtered => "filtered",
            RecordStatus::FetchError => "fetch_error",
        }
    }
}

/// The canonical unit of the corpus, shared by structured and web sources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRecord {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(rename = "abstract", default)]
    pub abstract_text: String,
    #[serde(default)]
    pub introduction: String,
    #[serde(default)]
    pub methods: String,
    #[serde(default)]
    pub results: String,
    #[serde(default = "unknown", deserialize_with = "null_as_unknown")]
    pub year: String,
    #[serde(default = "unknown", deserialize_with = "null_as_unknown")]
    pub journal: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub doi: String,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub pages: String,
    #[serde(default)]
    pub combined_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default)]
    pub status: RecordStatus,
}

impl NormalizedRecord {
    /// A structured-source record before any passage has been applied.
    pub fn empty(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: String::new(),
            abstract_text: String::new(),
            introduction: String::new(),
            methods: String::new(),
            results: String::new(),
            year: UNKNOWN.to_string(),
            journal: UNKNOWN.to_string(),
            doi: String::new(),
            authors: Vec::new(),
            keywords: Vec::new(),
            pages: format!("{UNKNOWN}-{UNKNOWN}"),
            combined_text: String::new(),
            url: None,
            status: RecordStatus::Ok,
        }
    }

    /// Recompute `combined_text` and `status` from the text fields.
    ///
    /// A `FetchError` status is sticky: the error record keeps its empty text.
    pub fn finalize(&mut self) {
        if self.status == RecordStatus::FetchError {
            return;
        }
        self.combined_text = compose_combined_text(
            &self.title,
            &self.abstract_text,
            &self.introduction,
            &self.methods,
            &self.results,
        );
        self.status = RecordStatus::assess(&self.combined_text);
    }

    /// True when the record may enter a corpus and the vector index.
    pub fn is_indexable(&self) -> bool {
        self.status == RecordStatus::Ok && RecordStatus::assess(&self.combined_text) == RecordStatus::Ok
    }

    pub fn set_first_page(&mut self, first: &str) {
        let last = self.pages.rsplit('-').next().unwrap_or("").to_string();
        self.pages = format!("{first}-{last}");
    }

    pub fn set_last_page(&mut self, last: &str) {
        let first = self.pages.split('-').next().unwrap_or("").to_string();
        self.pages = format!("{first}-{last}");
    }
}

/// Title, abstract, introduction, methods and results, each trimmed, empty
/// ones skipped, joined by single spaces.
pub fn compose_combined_text(
    title: &str,
    abstract_text: &str,
    introduction: &str,
    methods: &str,
    results: &str,
) -> String {
    [title, abstract_text, introduction, methods, results]
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn unknown() -> String {
    UNKNOWN.to_string()
}

fn null_as_unknown<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_else(unknown))
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_priority_and_case() {
        assert_eq!(SectionType::classify("TITLE"), Some(SectionType::Title));
        assert_eq!(SectionType::classify("INTRO"), Some(SectionType::Introduction));
        assert_eq!(SectionType::classify("Materials and Methods"), Some(SectionType::Methods));
        // matches both "title" and "abstract": title comes first
        assert_eq!(SectionType::classify("abstract_title_1"), Some(SectionType::Title));
        assert_eq!(SectionType::classify("DISCUSS"), None);
        assert_eq!(SectionType::classify(""), None);
    }

    #[test]
    fn test_empty_record_sentinels() {
        let r = NormalizedRecord::empty("PMC1");
        assert_eq!(r.year, "Unknown");
        assert_eq!(r.journal, "Unknown");
        assert_eq!(r.pages, "Unknown-Unknown");
        assert!(r.doi.is_empty());
        assert!(r.title.is_empty());
    }

    #[test]
    fn test_combined_text_single_spaces() {
        let text = compose_combined_text("Title here", "Abstract one. ", "", "Methods text ", " Results.");
        assert_eq!(text, "Title here Abstract one. Methods text Results.");
    }

    #[test]
    fn test_status_assess_boundary() {
        assert_eq!(RecordStatus::assess(&"x".repeat(50)), RecordStatus::Filtered);
        assert_eq!(RecordStatus::assess(&"x".repeat(51)), RecordStatus::Ok);
        // counted in characters, not bytes
        assert_eq!(RecordStatus::assess(&"é".repeat(30)), RecordStatus::Filtered);
    }

    #[test]
    fn test_page_halves_preserve_each_other() {
        let mut r = NormalizedRecord::empty("x");
        r.set_last_page("120");
        assert_eq!(r.pages, "Unknown-120");
        r.set_first_page("101");
        assert_eq!(r.pages, "101-120");

        let mut only_first = NormalizedRecord::empty("y");
        only_first.set_first_page("7");
        assert_eq!(only_first.pages, "7-Unknown");
    }

    #[test]
    fn test_json_field_names() {
        let mut r = NormalizedRecord::empty("PMC2");
        r.abstract_text = "Some abstract".to_string();
        let value = serde_json::to_value(&r).unwrap();
        assert!(value.get("abstract").is_some());
        assert!(value.get("abstract_text").is_none());
        assert!(value.get("url").is_none());
        assert_eq!(value["status"], "ok");
    }

    #[test]
    fn test_reads_foreign_web_record() {
        let json = r#"{
            "id": "a1b2c3d4e5",
            "title": "Lung screening",
            "abstract": "First paragraph.",
            "year": "2025",
            "journal": "www.lung.org",
            "doi": null,
            "authors": [],
            "keywords": ["lung cancer", "screening", "web"],
            "pages": "",
            "combined_text": "First paragraph.",
            "url": "https://www.lung.org/x"
        }"#;
        let r: NormalizedRecord = serde_json::from_str(json).unwrap();
        assert_eq!(r.doi, "");
        assert!(r.introduction.is_empty());
        assert_eq!(r.status, RecordStatus::Ok);
        assert_eq!(r.url.as_deref(), Some("https://www.lung.org/x"));
        assert!(!r.is_indexable());
    }

    #[test]
    fn test_reads_sparse_record_with_sentinels() {
        let json = r#"{"id": "w1", "year": null, "combined_text": "text", "source_file": "a.xml"}"#;
        let r: NormalizedRecord = serde_json::from_str(json).unwrap();
        assert_eq!(r.year, UNKNOWN);
        assert_eq!(r.journal, UNKNOWN);
        assert!(r.title.is_empty());
        assert!(r.abstract_text.is_empty());
    }

    #[test]
    fn test_finalize_keeps_fetch_error() {
        let mut r = NormalizedRecord::empty("e");
        r.title = "Error fetching page".to_string();
        r.status = RecordStatus::FetchError;
        r.finalize();
        assert_eq!(r.combined_text, "");
        assert_eq!(r.status, RecordStatus::FetchError);
    }
}

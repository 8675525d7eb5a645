use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CorpusError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("XML parse error: {0}")]
    Xml(String),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Vector index error: {0}")]
    Index(String),

    /// The vector index and the metadata sequence no longer describe the same records.
    #[error("Index/metadata alignment broken: {0}")]
    AlignmentMismatch(String),

    #[error("Empty batch: {0}")]
    EmptyBatch(String),

    #[error("Input not found: {}", .0.display())]
    MissingInput(PathBuf),

    #[error("Backup of {} failed: {source}", path.display())]
    Backup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<quick_xml::Error> for CorpusError {
    fn from(e: quick_xml::Error) -> Self {
        CorpusError::Xml(e.to_string())
    }
}

impl From<bincode::error::EncodeError> for CorpusError {
    fn from(e: bincode::error::EncodeError) -> Self {
        CorpusError::Index(format!("encode: {e}"))
    }
}

impl From<bincode::error::DecodeError> for CorpusError {
    fn from(e: bincode::error::DecodeError) -> Self {
        CorpusError::Index(format!("decode: {e}"))
    }
}

pub type Result<T> = std::result::Result<T, CorpusError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backup_error_names_path() {
        let err = CorpusError::Backup {
            path: PathBuf::from("/tmp/meta_backup.json"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        let msg = err.to_string();
        assert!(msg.contains("meta_backup.json"));
        assert!(msg.contains("denied"));
    }

    #[test]
    fn test_xml_error_converts() {
        let mut reader = quick_xml::Reader::from_str("<a></b>");
        let xml_err = loop {
            match reader.read_event() {
                Ok(quick_xml::events::Event::Eof) => panic!("mismatched end tag was accepted"),
                Ok(_) => continue,
                Err(e) => break e,
            }
        };
        let err: CorpusError = xml_err.into();
        assert!(matches!(err, CorpusError::Xml(_)));
    }
}

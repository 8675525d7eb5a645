//! Parser for BioC `name_*` infon values.
//!
//! BioC encodes contributor names as `surname:Smith;given-names:John`. Only the
//! first two segments are read; the label before each colon is not checked.

use std::fmt;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorName {
    pub surname: String,
    pub given: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthorParseError {
    #[error("expected at least two ';'-separated segments, found {found}")]
    MissingSegment { found: usize },

    #[error("segment {segment} has no ':' separator")]
    MissingColon { segment: usize },
}

impl AuthorName {
    pub fn parse(value: &str) -> Result<Self, AuthorParseError> {
        let segments: Vec<&str> = value.split(';').collect();
        if segments.len() < 2 {
            return Err(AuthorParseError::MissingSegment { found: segments.len() });
        }
        let surname = segment_value(segments[0], 0)?;
        let given = segment_value(segments[1], 1)?;
        Ok(Self { surname, given })
    }
}

fn segment_value(segment: &str, index: usize) -> Result<String, AuthorParseError> {
    segment
        .split_once(':')
        .map(|(_, v)| v.trim().to_string())
        .ok_or(AuthorParseError::MissingColon { segment: index })
}

/// Renders as "Given Surname".
impl fmt::Display for AuthorName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.given, self.surname)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_standard_name() {
        let name = AuthorName::parse("surname:Smith;given-names:John A").unwrap();
        assert_eq!(name.surname, "Smith");
        assert_eq!(name.given, "John A");
        assert_eq!(name.to_string(), "John A Smith");
    }

    #[test]
    fn test_extra_segments_ignored() {
        let name = AuthorName::parse("surname:Lee;given-names:Min;suffix:Jr").unwrap();
        assert_eq!(name.to_string(), "Min Lee");
    }

    #[test]
    fn test_single_segment_rejected() {
        assert_eq!(
            AuthorName::parse("surname:Smith"),
            Err(AuthorParseError::MissingSegment { found: 1 })
        );
    }

    #[test]
    fn test_missing_colon_rejected() {
        assert_eq!(
            AuthorName::parse("surname:Smith;John"),
            Err(AuthorParseError::MissingColon { segment: 1 })
        );
        assert_eq!(
            AuthorName::parse("Smith;given-names:John"),
            Err(AuthorParseError::MissingColon { segment: 0 })
        );
    }

    #[test]
    fn test_value_after_first_colon_kept_whole() {
        let name = AuthorName::parse("surname:O:Brien;given-names: Pat ").unwrap();
        assert_eq!(name.surname, "O:Brien");
        assert_eq!(name.given, "Pat");
    }
}

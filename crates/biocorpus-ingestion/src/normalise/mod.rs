//! Record normalisers for structured (BioC) and web sources.

pub mod bioc;
pub mod web;

/// Replace line breaks and tabs with spaces and trim the result.
pub fn clean_text(text: &str) -> String {
    text.replace(['\n', '\r', '\t'], " ").trim().to_string()
}

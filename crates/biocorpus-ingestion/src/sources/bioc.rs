//! BioC XML reader.
//!
//! A BioC collection is a root element holding `<document>` children; each
//! document has an `<id>` and a sequence of `<passage>` elements whose direct
//! `<infon key="...">` children annotate the passage `<text>`. Nested
//! annotation elements are skipped.

use std::path::Path;

use biocorpus_common::{CorpusError, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

/// One annotated unit of text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BiocPassage {
    pub infons: Vec<(String, String)>,
    pub text: String,
}

impl BiocPassage {
    /// First infon value with exactly this key.
    pub fn infon(&self, key: &str) -> Option<&str> {
        self.infons
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BiocDocument {
    pub id: Option<String>,
    pub passages: Vec<BiocPassage>,
}

/// Which element's direct text is being collected.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Capture {
    Nothing,
    DocumentId,
    InfonValue,
    PassageText,
}

#[derive(Default)]
struct CollectionBuilder {
    documents: Vec<BiocDocument>,
    current_doc: Option<BiocDocument>,
    current_passage: Option<BiocPassage>,
    current_infon: Option<(String, String)>,
    id_buf: Option<String>,
    text_buf: Option<String>,
}

impl CollectionBuilder {
    /// Opens an element at `depth` (root = 1). Returns what to capture inside it.
    fn open(&mut self, depth: usize, e: &BytesStart<'_>) -> Result<Capture> {
        let capture = match (depth, e.name().as_ref()) {
            (2, b"document") => {
                self.current_doc = Some(BiocDocument::default());
                Capture::Nothing
            }
            (3, b"id") if self.current_doc.is_some() => {
                self.id_buf = Some(String::new());
                Capture::DocumentId
            }
            (3, b"passage") if self.current_doc.is_some() => {
                self.current_passage = Some(BiocPassage::default());
                Capture::Nothing
            }
            (4, b"infon") if self.current_passage.is_some() => {
                let key = match e.try_get_attribute("key").map_err(quick_xml::Error::from)? {
                    Some(attr) => attr.unescape_value()?.into_owned(),
                    None => String::new(),
                };
                self.current_infon = Some((key, String::new()));
                Capture::InfonValue
            }
            (4, b"text") if self.current_passage.is_some() => {
                self.text_buf = Some(String::new());
                Capture::PassageText
            }
            _ => Capture::Nothing,
        };
        Ok(capture)
    }

    fn push_text(&mut self, capture: Capture, text: &str) {
        let target = match capture {
            Capture::DocumentId => self.id_buf.as_mut(),
            Capture::InfonValue => self.current_infon.as_mut().map(|(_, v)| v),
            Capture::PassageText => self.text_buf.as_mut(),
            Capture::Nothing => None,
        };
        if let Some(buf) = target {
            buf.push_str(text);
        }
    }

    /// Closes the element `name` that was opened at `depth`.
    fn close(&mut self, depth: usize, name: &[u8]) {
        match (depth, name) {
            (2, b"document") => {
                if let Some(doc) = self.current_doc.take() {
                    self.documents.push(doc);
                }
            }
            (3, b"id") => {
                if let (Some(doc), Some(id)) = (self.current_doc.as_mut(), self.id_buf.take()) {
                    doc.id.get_or_insert(id);
                }
            }
            (3, b"passage") => {
                if let (Some(doc), Some(passage)) = (self.current_doc.as_mut(), self.current_passage.take()) {
                    doc.passages.push(passage);
                }
            }
            (4, b"infon") => {
                if let (Some(passage), Some(infon)) = (self.current_passage.as_mut(), self.current_infon.take()) {
                    passage.infons.push(infon);
                }
            }
            (4, b"text") => {
                if let (Some(passage), Some(text)) = (self.current_passage.as_mut(), self.text_buf.take()) {
                    // first <text> wins
                    if passage.text.is_empty() {
                        passage.text = text;
                    }
                }
            }
            _ => {}
        }
    }
}

/// Documents read from one BioC input.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BiocCollection {
    pub documents: Vec<BiocDocument>,
    /// Set when reading stopped early; `documents` then holds only the
    /// documents that closed before the damage.
    pub damage: Option<String>,
}

impl BiocCollection {
    pub fn is_recovered(&self) -> bool {
        self.damage.is_some()
    }
}

#[derive(Default)]
struct ParseState {
    builder: CollectionBuilder,
    // (element name, capture mode) for every open element
    stack: Vec<(Vec<u8>, Capture)>,
    root_seen: bool,
}

impl ParseState {
    fn enter_root_level(&mut self) -> Result<()> {
        if self.stack.is_empty() {
            if self.root_seen {
                return Err(CorpusError::Xml("content after the root element".to_string()));
            }
            self.root_seen = true;
        }
        Ok(())
    }

    fn read_events(&mut self, reader: &mut Reader<&[u8]>) -> Result<()> {
        loop {
            match reader.read_event()? {
                Event::Start(e) => {
                    self.enter_root_level()?;
                    let capture = self.builder.open(self.stack.len() + 1, &e)?;
                    self.stack.push((e.name().as_ref().to_vec(), capture));
                }
                Event::Empty(e) => {
                    self.enter_root_level()?;
                    let depth = self.stack.len() + 1;
                    self.builder.open(depth, &e)?;
                    self.builder.close(depth, e.name().as_ref());
                }
                Event::End(e) => {
                    let depth = self.stack.len();
                    self.stack.pop();
                    self.builder.close(depth, e.name().as_ref());
                }
                Event::Text(e) => {
                    let text = e.unescape()?;
                    match self.stack.last() {
                        Some((_, capture)) => self.builder.push_text(*capture, &text),
                        None if !text.trim().is_empty() => {
                            return Err(CorpusError::Xml("text outside the root element".to_string()));
                        }
                        None => {}
                    }
                }
                Event::CData(e) => {
                    if let Some((_, capture)) = self.stack.last() {
                        self.builder.push_text(*capture, &String::from_utf8_lossy(&e));
                    }
                }
                Event::Eof => return Ok(()),
                _ => {}
            }
        }
    }
}

/// Parse a BioC collection into its documents.
///
/// Fails only when no root element can be read. Once the root has opened, a
/// syntax error, mismatched or unclosed element, or content after the root
/// stops reading; documents that closed before that point are kept and the
/// collection is marked damaged.
pub fn parse_bioc_xml(xml: &str) -> Result<BiocCollection> {
    let mut reader = Reader::from_str(xml);
    let mut state = ParseState::default();

    let damage = match state.read_events(&mut reader) {
        Err(e) if state.root_seen => Some(e.to_string()),
        Err(e) => return Err(e),
        Ok(()) if !state.root_seen => {
            return Err(CorpusError::Xml("no root element".to_string()));
        }
        Ok(()) if !state.stack.is_empty() => Some(format!(
            "unexpected end of input: {} unclosed element(s)",
            state.stack.len()
        )),
        Ok(()) => None,
    };

    Ok(BiocCollection { documents: state.builder.documents, damage })
}

/// Read and parse a BioC file from disk.
pub fn read_bioc_file(path: &Path) -> Result<BiocCollection> {
    let xml = std::fs::read_to_string(path)?;
    parse_bioc_xml(&xml)
}

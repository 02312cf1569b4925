//! DOCX document store for the missive mail-merge pipeline.
//!
//! A `.docx` file is a zip archive whose main body lives in
//! `word/document.xml`. Formatted text is broken into runs, and the
//! character content of each run sits in a `<w:t>` element. Those run
//! texts are the *fragments* the merge engine scans and substitutes into:
//! the smallest unit of contiguous, identically-styled text.
//!
//! [`DocxDocument::open`] reads the whole archive into memory, parses the
//! body into an owned XML event list, and exposes every `<w:t>` text as a
//! mutable fragment. [`DocxDocument::save`] re-serializes the body and
//! rebuilds the archive in entry order, leaving every other part
//! byte-identical. Each handle is fully independent, so many copies of the
//! same template can be open and mutated concurrently.

use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::escape::unescape;
use quick_xml::events::{BytesText, Event};
use std::fs::File;
use std::io::{Cursor, Read, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// The archive entry holding the document body.
const BODY_PART: &str = "word/document.xml";

/// The element wrapping one run's character content.
const TEXT_TAG: &[u8] = b"w:t";

/// Error type for DOCX read/write operations.
#[derive(Error, Debug)]
pub enum DocxError {
    #[error("failed to read document archive: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("document has no '{0}' part")]
    MissingPart(&'static str),

    #[error("malformed document XML: {0}")]
    Xml(String),

    #[error("document text is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("fragment index {0} out of range")]
    BadFragment(usize),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// One archive entry, preserved in original order.
enum Part {
    /// Any part other than the body; written back verbatim.
    Raw { name: String, bytes: Vec<u8> },
    /// The body part; re-serialized from the event list on save.
    Body { name: String },
}

/// One `<w:t>` run text: indices into the event list plus the current
/// (unescaped) character content.
struct Fragment {
    start_event: usize,
    text_event: usize,
    content: String,
}

/// A writable handle to one DOCX file.
pub struct DocxDocument {
    path: PathBuf,
    parts: Vec<Part>,
    events: Vec<Event<'static>>,
    fragments: Vec<Fragment>,
}

impl DocxDocument {
    /// Opens a document, reading the full archive and parsing the body.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DocxError> {
        let path = path.as_ref().to_path_buf();
        let mut archive = ZipArchive::new(File::open(&path)?)?;

        let mut parts = Vec::with_capacity(archive.len());
        let mut body_xml: Option<String> = None;
        for i in 0..archive.len() {
            let mut entry = archive.by_index(i)?;
            let name = entry.name().to_string();
            if name == BODY_PART {
                let mut xml = String::new();
                entry.read_to_string(&mut xml)?;
                body_xml = Some(xml);
                parts.push(Part::Body { name });
            } else {
                let mut bytes = Vec::with_capacity(entry.size() as usize);
                entry.read_to_end(&mut bytes)?;
                parts.push(Part::Raw { name, bytes });
            }
        }
        let body_xml = body_xml.ok_or(DocxError::MissingPart(BODY_PART))?;

        let (events, fragments) = parse_body(&body_xml)?;
        Ok(Self { path, parts, events, fragments })
    }

    /// The path this handle was opened from and will save back to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of text fragments in document order.
    pub fn fragment_count(&self) -> usize {
        self.fragments.len()
    }

    /// The current text of one fragment.
    pub fn fragment_text(&self, index: usize) -> Option<&str> {
        self.fragments.get(index).map(|f| f.content.as_str())
    }

    /// All fragment texts in document order.
    pub fn fragment_texts(&self) -> impl Iterator<Item = &str> {
        self.fragments.iter().map(|f| f.content.as_str())
    }

    /// Replaces every occurrence of `needle` inside one fragment's text,
    /// leaving the surrounding text of the fragment untouched.
    pub fn replace_in_fragment(
        &mut self,
        index: usize,
        needle: &str,
        replacement: &str,
    ) -> Result<(), DocxError> {
        let fragment = self.fragments.get(index).ok_or(DocxError::BadFragment(index))?;
        if !fragment.content.contains(needle) {
            return Ok(());
        }
        let updated = fragment.content.replace(needle, replacement);
        self.set_fragment_text(index, updated)
    }

    /// Overwrites one fragment's text entirely.
    pub fn set_fragment_text(
        &mut self,
        index: usize,
        text: impl Into<String>,
    ) -> Result<(), DocxError> {
        let fragment = self.fragments.get_mut(index).ok_or(DocxError::BadFragment(index))?;
        fragment.content = text.into();
        self.events[fragment.text_event] =
            Event::Text(BytesText::new(&fragment.content).into_owned());

        // Word drops leading/trailing whitespace in runs unless the run is
        // marked with xml:space="preserve".
        let edges_whitespace = fragment
            .content
            .chars()
            .next()
            .is_some_and(char::is_whitespace)
            || fragment.content.chars().last().is_some_and(char::is_whitespace);
        if edges_whitespace {
            let start_event = fragment.start_event;
            self.preserve_space(start_event)?;
        }
        Ok(())
    }

    /// Persists the document back to its path, rebuilding the archive.
    pub fn save(&self) -> Result<(), DocxError> {
        let body = self.serialize_body()?;
        let mut writer = ZipWriter::new(File::create(&self.path)?);
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        for part in &self.parts {
            match part {
                Part::Raw { name, bytes } => {
                    writer.start_file(name.as_str(), options)?;
                    writer.write_all(bytes)?;
                }
                Part::Body { name } => {
                    writer.start_file(name.as_str(), options)?;
                    writer.write_all(&body)?;
                }
            }
        }
        writer.finish()?;
        Ok(())
    }

    fn serialize_body(&self) -> Result<Vec<u8>, DocxError> {
        let mut writer = Writer::new(Cursor::new(Vec::new()));
        for event in &self.events {
            writer
                .write_event(event.clone())
                .map_err(|e| DocxError::Xml(e.to_string()))?;
        }
        Ok(writer.into_inner().into_inner())
    }

    fn preserve_space(&mut self, start_event: usize) -> Result<(), DocxError> {
        if let Event::Start(e) = &self.events[start_event] {
            let already = e
                .attributes()
                .flatten()
                .any(|a| a.key.as_ref() == b"xml:space");
            if !already {
                let mut marked = e.to_owned();
                marked.push_attribute(("xml:space", "preserve"));
                self.events[start_event] = Event::Start(marked);
            }
        }
        Ok(())
    }
}

/// Parses the body XML into an owned event list plus the fragment table.
///
/// Character content inside a `<w:t>` element (text, CDATA, entity
/// references) is coalesced into a single owned text event so each run
/// maps to exactly one mutable fragment.
fn parse_body(xml: &str) -> Result<(Vec<Event<'static>>, Vec<Fragment>), DocxError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);

    let mut events: Vec<Event<'static>> = Vec::new();
    let mut fragments = Vec::new();
    // (start event index, collected content) while inside a <w:t>
    let mut open: Option<(usize, String)> = None;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| DocxError::Xml(e.to_string()))?;
        match event {
            Event::Eof => break,
            Event::Start(e) if e.name().as_ref() == TEXT_TAG => {
                events.push(Event::Start(e.to_owned()));
                open = Some((events.len() - 1, String::new()));
            }
            Event::End(e) if e.name().as_ref() == TEXT_TAG => {
                if let Some((start_event, content)) = open.take() {
                    events.push(Event::Text(BytesText::new(&content).into_owned()));
                    fragments.push(Fragment {
                        start_event,
                        text_event: events.len() - 1,
                        content,
                    });
                }
                events.push(Event::End(e.into_owned()));
            }
            Event::Text(e) => match open {
                Some((_, ref mut content)) => {
                    let raw = std::str::from_utf8(e.as_ref())?;
                    let text = unescape(raw).map_err(|e| DocxError::Xml(e.to_string()))?;
                    content.push_str(&text);
                }
                None => events.push(Event::Text(e.into_owned())),
            },
            Event::CData(e) => match open {
                Some((_, ref mut content)) => {
                    content.push_str(std::str::from_utf8(e.as_ref())?);
                }
                None => events.push(Event::CData(e.into_owned())),
            },
            Event::GeneralRef(e) => match open {
                Some((_, ref mut content)) => {
                    content.push_str(&resolve_reference(e.as_ref())?);
                }
                None => events.push(Event::GeneralRef(e.into_owned())),
            },
            other => events.push(other.into_owned()),
        }
    }

    Ok((events, fragments))
}

/// Resolves a general entity reference (the payload between `&` and `;`).
fn resolve_reference(raw: &[u8]) -> Result<String, DocxError> {
    let name = std::str::from_utf8(raw)?;
    let resolved = match name {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        _ => {
            let code = name
                .strip_prefix("#x")
                .or_else(|| name.strip_prefix("#X"))
                .map(|hex| u32::from_str_radix(hex, 16))
                .or_else(|| name.strip_prefix('#').map(str::parse))
                .transpose()
                .ok()
                .flatten();
            return code
                .and_then(char::from_u32)
                .map(String::from)
                .ok_or_else(|| DocxError::Xml(format!("unresolvable entity reference '&{name};'")));
        }
    };
    Ok(resolved.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const CONTENT_TYPES: &str = concat!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
        r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#,
        r#"<Default Extension="xml" ContentType="application/xml"/></Types>"#,
    );

    fn write_docx(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        let mut writer = ZipWriter::new(File::create(&path).unwrap());
        let options = SimpleFileOptions::default();
        writer.start_file("[Content_Types].xml", options).unwrap();
        writer.write_all(CONTENT_TYPES.as_bytes()).unwrap();
        writer.start_file(BODY_PART, options).unwrap();
        let xml = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{body}</w:body></w:document>"#
        );
        writer.write_all(xml.as_bytes()).unwrap();
        writer.finish().unwrap();
        path
    }

    #[test]
    fn test_open_exposes_run_texts_in_order() {
        let dir = TempDir::new().unwrap();
        let path = write_docx(
            dir.path(),
            "t.docx",
            "<w:p><w:r><w:t>Dear #name#,</w:t></w:r><w:r><w:t>from #city#</w:t></w:r></w:p>",
        );
        let doc = DocxDocument::open(&path).unwrap();
        let texts: Vec<&str> = doc.fragment_texts().collect();
        assert_eq!(texts, vec!["Dear #name#,", "from #city#"]);
    }

    #[test]
    fn test_replace_preserves_surrounding_text() {
        let dir = TempDir::new().unwrap();
        let path = write_docx(dir.path(), "t.docx", "<w:p><w:r><w:t>A#x#B#y#C</w:t></w:r></w:p>");
        let mut doc = DocxDocument::open(&path).unwrap();
        doc.replace_in_fragment(0, "#x#", "1").unwrap();
        doc.replace_in_fragment(0, "#y#", "2").unwrap();
        assert_eq!(doc.fragment_text(0), Some("A1B2C"));
    }

    #[test]
    fn test_save_round_trips_mutation() {
        let dir = TempDir::new().unwrap();
        let path = write_docx(dir.path(), "t.docx", "<w:p><w:r><w:t>Hello #who#</w:t></w:r></w:p>");
        let mut doc = DocxDocument::open(&path).unwrap();
        doc.replace_in_fragment(0, "#who#", "World").unwrap();
        doc.save().unwrap();

        let reopened = DocxDocument::open(&path).unwrap();
        assert_eq!(reopened.fragment_text(0), Some("Hello World"));
    }

    #[test]
    fn test_escaped_text_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = write_docx(
            dir.path(),
            "t.docx",
            "<w:p><w:r><w:t>Smith &amp; Sons: #name#</w:t></w:r></w:p>",
        );
        let mut doc = DocxDocument::open(&path).unwrap();
        assert_eq!(doc.fragment_text(0), Some("Smith & Sons: #name#"));
        doc.replace_in_fragment(0, "#name#", "<Anna>").unwrap();
        doc.save().unwrap();

        let reopened = DocxDocument::open(&path).unwrap();
        assert_eq!(reopened.fragment_text(0), Some("Smith & Sons: <Anna>"));
    }

    #[test]
    fn test_whitespace_edged_replacement_marks_preserve() {
        let dir = TempDir::new().unwrap();
        let path = write_docx(dir.path(), "t.docx", "<w:p><w:r><w:t>#v#</w:t></w:r></w:p>");
        let mut doc = DocxDocument::open(&path).unwrap();
        doc.replace_in_fragment(0, "#v#", " padded ").unwrap();
        doc.save().unwrap();

        let mut archive = ZipArchive::new(File::open(&path).unwrap()).unwrap();
        let mut xml = String::new();
        archive.by_name(BODY_PART).unwrap().read_to_string(&mut xml).unwrap();
        assert!(xml.contains(r#"xml:space="preserve""#));
        let reopened = DocxDocument::open(&path).unwrap();
        assert_eq!(reopened.fragment_text(0), Some(" padded "));
    }

    #[test]
    fn test_missing_body_part() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.docx");
        let mut writer = ZipWriter::new(File::create(&path).unwrap());
        writer
            .start_file("[Content_Types].xml", SimpleFileOptions::default())
            .unwrap();
        writer.write_all(CONTENT_TYPES.as_bytes()).unwrap();
        writer.finish().unwrap();

        assert!(matches!(
            DocxDocument::open(&path),
            Err(DocxError::MissingPart(BODY_PART))
        ));
    }
}

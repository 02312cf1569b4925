//! Read-only XLSX tabular store for the missive mail-merge pipeline.
//!
//! An `.xlsx` file is a zip archive; the first worksheet lives under
//! `xl/worksheets/` and string-valued cells usually reference the
//! deduplicated table in `xl/sharedStrings.xml` by integer index.
//!
//! [`XlsxTable::open`] reads the first worksheet into typed [`Cell`] rows
//! (numeric, shared-string reference, or other) without resolving any
//! values: resolution, including the shared-string indirection, is the
//! merge engine's job. The first row is the header; the remaining rows are
//! data. Rows are padded to the header's width so a column index bound
//! against the header is always valid for every data row.

use missive_types::{Cell, CellKind, DataRow, SharedStrings};
use quick_xml::Reader;
use quick_xml::escape::unescape;
use quick_xml::events::Event;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use thiserror::Error;
use zip::ZipArchive;

const SHARED_STRINGS_PART: &str = "xl/sharedStrings.xml";
const FIRST_SHEET_PART: &str = "xl/worksheets/sheet1.xml";
const SHEET_PREFIX: &str = "xl/worksheets/sheet";

/// Error type for XLSX read operations.
#[derive(Error, Debug)]
pub enum XlsxError {
    #[error("failed to read workbook archive: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("workbook contains no worksheet part")]
    MissingSheet,

    #[error("malformed workbook XML: {0}")]
    Xml(String),

    #[error("workbook text is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// The header row, data rows, and shared-string table of one workbook's
/// first worksheet. Immutable once opened.
pub struct XlsxTable {
    header: DataRow,
    rows: Vec<DataRow>,
    shared: SharedStrings,
}

impl XlsxTable {
    /// Opens a workbook read-only and loads its first worksheet.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, XlsxError> {
        let mut archive = ZipArchive::new(File::open(path.as_ref())?)?;

        let shared = match read_part(&mut archive, SHARED_STRINGS_PART)? {
            Some(xml) => parse_shared_strings(&xml)?,
            None => SharedStrings::default(),
        };

        let sheet_part = first_sheet_part(&archive)?;
        let sheet_xml = read_part(&mut archive, &sheet_part)?.ok_or(XlsxError::MissingSheet)?;
        let mut all_rows = parse_sheet(&sheet_xml)?;

        let header = if all_rows.is_empty() { Vec::new() } else { all_rows.remove(0) };
        let width = header.len();
        let rows = all_rows
            .into_iter()
            .filter(|row| !row.is_empty())
            .map(|mut row| {
                if row.len() < width {
                    row.resize(width, Cell::other());
                }
                row
            })
            .collect();

        Ok(Self { header, rows, shared })
    }

    /// The first row of the worksheet, holding the column names.
    pub fn header(&self) -> &[Cell] {
        &self.header
    }

    /// All data rows (every row after the header), padded to header width.
    pub fn rows(&self) -> &[DataRow] {
        &self.rows
    }

    pub fn shared_strings(&self) -> &SharedStrings {
        &self.shared
    }

    /// Decomposes the table for hand-off into the pipeline context.
    pub fn into_parts(self) -> (DataRow, Vec<DataRow>, SharedStrings) {
        (self.header, self.rows, self.shared)
    }
}

fn read_part<R: Read + std::io::Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
) -> Result<Option<String>, XlsxError> {
    match archive.by_name(name) {
        Ok(mut entry) => {
            let mut xml = String::new();
            entry.read_to_string(&mut xml)?;
            Ok(Some(xml))
        }
        Err(zip::result::ZipError::FileNotFound) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Picks the worksheet part to read: `sheet1.xml` when present, otherwise
/// the lexicographically first `xl/worksheets/sheet*.xml` entry.
fn first_sheet_part<R: Read + std::io::Seek>(
    archive: &ZipArchive<R>,
) -> Result<String, XlsxError> {
    let mut candidates: Vec<&str> = archive
        .file_names()
        .filter(|name| name.starts_with(SHEET_PREFIX) && name.ends_with(".xml"))
        .collect();
    if candidates.iter().any(|name| *name == FIRST_SHEET_PART) {
        return Ok(FIRST_SHEET_PART.to_string());
    }
    candidates.sort_unstable();
    candidates
        .first()
        .map(|name| name.to_string())
        .ok_or(XlsxError::MissingSheet)
}

/// Parses `xl/sharedStrings.xml`. Rich-text runs inside one `<si>` are
/// concatenated; phonetic guide runs (`<rPh>`) are skipped.
fn parse_shared_strings(xml: &str) -> Result<SharedStrings, XlsxError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);

    let mut entries = Vec::new();
    let mut current: Option<String> = None;
    let mut in_text = false;
    let mut in_phonetic = false;

    loop {
        match reader.read_event().map_err(|e| XlsxError::Xml(e.to_string()))? {
            Event::Eof => break,
            Event::Start(e) => match e.local_name().as_ref() {
                b"si" => current = Some(String::new()),
                b"rPh" => in_phonetic = true,
                b"t" if !in_phonetic => in_text = true,
                _ => {}
            },
            Event::End(e) => match e.local_name().as_ref() {
                b"si" => {
                    if let Some(text) = current.take() {
                        entries.push(text);
                    }
                }
                b"rPh" => in_phonetic = false,
                b"t" => in_text = false,
                _ => {}
            },
            Event::Text(e) if in_text => {
                if let Some(ref mut text) = current {
                    let raw = std::str::from_utf8(e.as_ref())?;
                    text.push_str(&unescape(raw).map_err(|e| XlsxError::Xml(e.to_string()))?);
                }
            }
            Event::GeneralRef(e) if in_text => {
                if let Some(ref mut text) = current {
                    text.push_str(&resolve_reference(e.as_ref())?);
                }
            }
            _ => {}
        }
    }

    Ok(SharedStrings::new(entries))
}

/// Parses one worksheet's `<sheetData>` into typed cell rows.
///
/// Cell positions come from the `r="B3"`-style reference so gaps left by
/// omitted cells are filled with untyped empty cells.
fn parse_sheet(xml: &str) -> Result<Vec<DataRow>, XlsxError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);

    let mut rows: Vec<DataRow> = Vec::new();
    let mut current: Option<DataRow> = None;
    // (column index, kind) of the cell being read
    let mut cell: Option<(usize, CellKind)> = None;
    let mut in_value = false;
    let mut raw = String::new();

    loop {
        match reader.read_event().map_err(|e| XlsxError::Xml(e.to_string()))? {
            Event::Eof => break,
            Event::Start(e) if e.local_name().as_ref() == b"row" => {
                current = Some(Vec::new());
            }
            Event::Empty(e) if e.local_name().as_ref() == b"row" => {
                rows.push(Vec::new());
            }
            Event::Start(e) if e.local_name().as_ref() == b"c" => {
                if let Some(ref row) = current {
                    cell = Some(cell_position_and_kind(&e, row.len())?);
                    raw.clear();
                }
            }
            Event::Empty(e) if e.local_name().as_ref() == b"c" => {
                if let Some(row) = current.as_mut() {
                    let (column, kind) = cell_position_and_kind(&e, row.len())?;
                    if row.len() < column {
                        row.resize(column, Cell::other());
                    }
                    row.push(Cell { kind, raw: String::new() });
                }
            }
            Event::Start(e) if e.local_name().as_ref() == b"v" => {
                in_value = cell.is_some();
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"v" => in_value = false,
                b"c" => {
                    if let (Some(row), Some((column, kind))) = (current.as_mut(), cell.take()) {
                        if row.len() < column {
                            row.resize(column, Cell::other());
                        }
                        row.push(Cell { kind, raw: std::mem::take(&mut raw) });
                    }
                }
                b"row" => {
                    if let Some(row) = current.take() {
                        rows.push(row);
                    }
                }
                _ => {}
            },
            Event::Text(e) if in_value => {
                let text = std::str::from_utf8(e.as_ref())?;
                raw.push_str(&unescape(text).map_err(|e| XlsxError::Xml(e.to_string()))?);
            }
            Event::GeneralRef(e) if in_value => {
                raw.push_str(&resolve_reference(e.as_ref())?);
            }
            _ => {}
        }
    }

    Ok(rows)
}

/// Reads a `<c>` element's column position and stored kind.
fn cell_position_and_kind(
    e: &quick_xml::events::BytesStart,
    next_column: usize,
) -> Result<(usize, CellKind), XlsxError> {
    let mut column = next_column;
    let mut kind = CellKind::Number;
    for attr in e.attributes() {
        let attr = attr.map_err(|e| XlsxError::Xml(e.to_string()))?;
        match attr.key.as_ref() {
            b"r" => {
                let reference = std::str::from_utf8(&attr.value)?;
                if let Some(parsed) = column_index(reference) {
                    column = parsed;
                }
            }
            b"t" => {
                kind = match attr.value.as_ref() {
                    b"s" => CellKind::Shared,
                    b"n" => CellKind::Number,
                    _ => CellKind::Other,
                };
            }
            _ => {}
        }
    }
    Ok((column, kind))
}

/// Zero-based column index of an `A1`-style cell reference.
fn column_index(reference: &str) -> Option<usize> {
    let letters = reference
        .chars()
        .take_while(|c| c.is_ascii_alphabetic())
        .collect::<String>();
    if letters.is_empty() {
        return None;
    }
    let index = letters
        .bytes()
        .fold(0usize, |acc, b| acc * 26 + usize::from(b.to_ascii_uppercase() - b'A') + 1);
    Some(index - 1)
}

/// Resolves a general entity reference (the payload between `&` and `;`).
fn resolve_reference(payload: &[u8]) -> Result<String, XlsxError> {
    let name = std::str::from_utf8(payload)?;
    let resolved = match name {
        "amp" => "&",
        "lt" => "<",
        "gt" => ">",
        "quot" => "\"",
        "apos" => "'",
        _ => {
            return name
                .strip_prefix("#x")
                .or_else(|| name.strip_prefix("#X"))
                .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                .or_else(|| name.strip_prefix('#').and_then(|dec| dec.parse().ok()))
                .and_then(char::from_u32)
                .map(String::from)
                .ok_or_else(|| XlsxError::Xml(format!("unresolvable entity reference '&{name};'")));
        }
    };
    Ok(resolved.to_string())
}

//! Foundation types for the missive mail-merge pipeline.
//!
//! This crate holds the tabular cell model shared between the spreadsheet
//! reader and the merge engine: typed cells, data rows, and the
//! shared-string lookup table used by spreadsheet formats that store
//! repeated strings once and reference them by integer index.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for cell value resolution.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CellError {
    #[error("shared string reference '{0}' is not a valid index")]
    MalformedSharedRef(String),

    #[error("shared string index {index} out of range (table holds {len} entries)")]
    SharedRefOutOfRange { index: usize, len: usize },
}

/// The stored kind of a tabular cell.
///
/// Anything that is neither numeric nor a shared-string reference is
/// `Other` and resolves to an empty display string.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CellKind {
    /// The raw stored text is the display value.
    Number,
    /// The raw stored text is an integer index into the shared-string table.
    Shared,
    #[default]
    Other,
}

/// A single tabular cell: its stored kind plus the raw stored text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    pub kind: CellKind,
    pub raw: String,
}

impl Cell {
    /// A numeric-typed cell whose raw text is the display value.
    pub fn number(raw: impl Into<String>) -> Self {
        Self { kind: CellKind::Number, raw: raw.into() }
    }

    /// A shared-string cell referencing an index into the shared table.
    pub fn shared(index: usize) -> Self {
        Self { kind: CellKind::Shared, raw: index.to_string() }
    }

    /// An untyped cell; resolves to the empty string.
    pub fn other() -> Self {
        Self::default()
    }
}

/// An ordered sequence of cells, as read from one spreadsheet row.
pub type DataRow = Vec<Cell>;

/// The deduplicated string table referenced by [`CellKind::Shared`] cells.
///
/// Built once when the data source is opened and read-only thereafter, so
/// it can be shared across concurrent row tasks without locking.
#[derive(Debug, Clone, Default)]
pub struct SharedStrings {
    entries: Vec<String>,
}

impl SharedStrings {
    pub fn new(entries: Vec<String>) -> Self {
        Self { entries }
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.entries.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolve a raw shared-string reference to its table entry.
    pub fn resolve(&self, raw: &str) -> Result<&str, CellError> {
        let index: usize = raw
            .trim()
            .parse()
            .map_err(|_| CellError::MalformedSharedRef(raw.to_string()))?;
        self.get(index).ok_or(CellError::SharedRefOutOfRange {
            index,
            len: self.entries.len(),
        })
    }
}

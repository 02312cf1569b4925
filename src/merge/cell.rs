// src/merge/cell.rs
use missive_types::{Cell, CellError, CellKind, SharedStrings};

/// Resolves a cell's display string.
///
/// Numeric cells display their raw stored text; shared-string cells follow
/// the integer reference into the shared table; any other kind resolves to
/// the empty string (a documented default, not a failure).
///
/// `column` must be valid for `row` — the binding step guarantees this for
/// every bound index, and rows are padded to header width when the data
/// source is opened. An out-of-range index is a caller bug and panics
/// rather than being clamped.
pub fn display_value(
    row: &[Cell],
    column: usize,
    shared: &SharedStrings,
) -> Result<String, CellError> {
    let cell = &row[column];
    match cell.kind {
        CellKind::Number => Ok(cell.raw.clone()),
        CellKind::Shared => Ok(shared.resolve(&cell.raw)?.to_string()),
        CellKind::Other => Ok(String::new()),
    }
}

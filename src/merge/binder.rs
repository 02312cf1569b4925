// src/merge/binder.rs
use crate::error::MergeError;
use crate::merge::cell::display_value;
use missive_types::{Cell, SharedStrings};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Placeholder name (lower-cased) mapped to its zero-based column index.
/// Built once per run, read-only thereafter.
pub type ColumnIndexMap = HashMap<String, usize>;

/// Binds every distinct placeholder name to a header column, eagerly and
/// before any generation starts, so a single typo aborts the whole run up
/// front rather than mid-batch.
///
/// Comparison is case-insensitive. Header cells are scanned left to right
/// and the first match wins; a later duplicate header is unreachable,
/// which is accepted rather than treated as an error. Names are checked in
/// sorted order so the name reported by a failure is deterministic.
pub fn bind_columns(
    names: &BTreeSet<String>,
    header: &[Cell],
    shared: &SharedStrings,
) -> Result<ColumnIndexMap, MergeError> {
    let mut header_names = Vec::with_capacity(header.len());
    for column in 0..header.len() {
        header_names.push(display_value(header, column, shared)?.to_lowercase());
    }

    let mut bindings = ColumnIndexMap::with_capacity(names.len());
    for name in names {
        let wanted = name.to_lowercase();
        let column = header_names
            .iter()
            .position(|header_name| *header_name == wanted)
            .ok_or_else(|| MergeError::MissingColumn(name.clone()))?;
        bindings.insert(wanted, column);
    }
    Ok(bindings)
}

/// The bindings in a stable order, for diagnostics.
pub fn describe_bindings(bindings: &ColumnIndexMap) -> BTreeMap<&str, usize> {
    bindings.iter().map(|(name, column)| (name.as_str(), *column)).collect()
}

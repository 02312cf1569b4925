// src/pipeline/context.rs
use crate::merge::{ColumnIndexMap, PlaceholderScanner};
use missive_types::SharedStrings;
use std::path::PathBuf;

/// A container for all shared, read-only state of one merge run.
///
/// Created once by the builder and handed to every row task behind an
/// `Arc`. Row tasks receive the template path, the bindings, and the
/// shared-string table through this context explicitly — never as ambient
/// captured handles — so nothing here is mutated once the batch starts.
pub struct MergeContext {
    /// The template file; opened read-only for discovery and copied, never
    /// mutated in place.
    pub template_path: PathBuf,
    /// Directory that receives the generated artifacts.
    pub destination: PathBuf,
    pub scanner: PlaceholderScanner,
    /// Placeholder name (lower-cased) to column index; immutable after
    /// binding, safe to read concurrently.
    pub bindings: ColumnIndexMap,
    pub shared_strings: SharedStrings,
}

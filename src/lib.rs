//! missive: a bulk mail-merge document generation engine.
//!
//! A DOCX template carries inline `#name#` placeholder tokens; an XLSX
//! data source provides one row per document. For each row the engine
//! creates a private copy of the template, replaces every placeholder
//! occurrence with the row's cell value for the case-insensitively bound
//! column, and delivers the result into the destination directory —
//! optionally converted to PDF through headless LibreOffice.
//!
//! The pieces:
//!
//! - [`merge`]: placeholder scanning, column binding, cell resolution
//! - [`pipeline`]: the bounded-concurrency batch engine and its builder
//! - [`docx`] / [`xlsx`]: the document and tabular stores
//! - [`convert`]: the external-converter collaborator
//!
//! All placeholder binding happens before the first row is touched, so a
//! template typo aborts the run immediately instead of mid-batch. Once
//! the batch starts, a row failure is contained to that row and the rest
//! of the batch keeps going.

pub mod error;
pub mod merge;
pub mod pipeline;

pub use error::MergeError;
pub use pipeline::{
    BatchSummary, GenerationResult, MergeConfig, MergePipeline, MergePipelineBuilder, RowStatus,
};

// Re-export the collaborator crates for embedders.
pub use missive_convert as convert;
pub use missive_docx as docx;
pub use missive_types as types;
pub use missive_xlsx as xlsx;

// src/error.rs
use missive_convert::ConvertError;
use missive_docx::DocxError;
use missive_types::CellError;
use missive_xlsx::XlsxError;
use thiserror::Error;

/// A comprehensive error type for the entire merge pipeline.
///
/// Everything surfacing out of [`crate::MergePipelineBuilder::build`] is
/// fatal and pre-batch; errors inside a row task are contained at the row
/// boundary and reported as that row's failure.
#[derive(Error, Debug)]
pub enum MergeError {
    #[error("invalid run configuration: {0}")]
    Config(String),

    #[error("placeholder '{0}' has no matching column in the header row")]
    MissingColumn(String),

    #[error("document error: {0}")]
    Docx(#[from] DocxError),

    #[error("data source error: {0}")]
    Xlsx(#[from] XlsxError),

    #[error("cell value error: {0}")]
    Cell(#[from] CellError),

    #[error("conversion failed: {0}")]
    Convert(#[from] ConvertError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

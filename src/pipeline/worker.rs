// src/pipeline/worker.rs
//! The per-row unit of work.
//!
//! One row runs Generating (private template copy, re-scan, substitute,
//! save) and then either Converting (external converter into the
//! destination, intermediate deleted) or a plain move into the
//! destination. Everything fallible is returned as this row's result;
//! nothing propagates to sibling rows.

use crate::error::MergeError;
use crate::merge::display_value;
use crate::pipeline::api::GenerationResult;
use crate::pipeline::context::MergeContext;
use log::{debug, warn};
use missive_convert::FormatConverter;
use missive_docx::DocxDocument;
use missive_types::DataRow;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

/// Derives the artifact file stem for a row from its first-column value.
///
/// Path separators and other characters that are unsafe in file names are
/// replaced; a hint that sanitizes away entirely falls back to the row
/// number so the artifact name is never empty.
pub(crate) fn artifact_stem(hint: &str, row_number: usize) -> String {
    let cleaned: String = hint
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    if cleaned.chars().all(|c| c == '_' || c == '.') {
        format!("row-{row_number}")
    } else {
        cleaned
    }
}

/// Runs one row end to end and reports its terminal state.
pub(crate) async fn process_row(
    context: Arc<MergeContext>,
    converter: Option<Arc<dyn FormatConverter>>,
    row: DataRow,
    row_number: usize,
    staging_root: PathBuf,
) -> GenerationResult {
    // The row's identity is its first column's resolved value; if even
    // that fails, the row fails under a positional key.
    let key = match display_value(&row, 0, &context.shared_strings) {
        Ok(value) => value,
        Err(e) => return GenerationResult::failed(format!("row-{row_number}"), e),
    };

    match run_row(&context, converter, &row, &key, row_number, &staging_root).await {
        Ok(artifact) => GenerationResult::completed(key, artifact),
        Err(e) => GenerationResult::failed(key, e),
    }
}

async fn run_row(
    context: &Arc<MergeContext>,
    converter: Option<Arc<dyn FormatConverter>>,
    row: &DataRow,
    key: &str,
    row_number: usize,
    staging_root: &Path,
) -> Result<PathBuf, MergeError> {
    let start = Instant::now();

    // Per-row staging subdirectory: duplicate naming hints must not
    // collide while both copies are in flight.
    let staging = staging_root.join(format!("row-{row_number}"));
    tokio::fs::create_dir_all(&staging).await?;
    let stem = artifact_stem(key, row_number);

    // Generating: blocking file work off the async runtime.
    let generated = {
        let context = Arc::clone(context);
        let row = row.clone();
        let staging = staging.clone();
        tokio::task::spawn_blocking(move || instantiate_row(&context, &row, &stem, &staging))
            .await
            .map_err(|e| MergeError::Config(format!("row task aborted: {e}")))??
    };
    debug!("[ROW {row_number}] generated '{}' in {:.2?}", generated.display(), start.elapsed());

    match converter {
        Some(converter) => {
            let converted = converter.convert(&generated, &context.destination).await;
            // The intermediate is removed no matter how conversion went:
            // the destination must never end up with the unconverted
            // duplicate next to the converted file.
            if let Err(e) = tokio::fs::remove_file(&generated).await {
                warn!(
                    "[ROW {row_number}] could not remove intermediate '{}': {e}",
                    generated.display()
                );
            }
            Ok(converted?)
        }
        None => {
            let file_name = generated.file_name().unwrap_or_default();
            let target = context.destination.join(file_name);
            move_file(&generated, &target).await?;
            Ok(target)
        }
    }
}

/// Creates the private template copy for one row and substitutes every
/// placeholder occurrence with the row's cell values.
///
/// Occurrences are re-derived from the copy being mutated, never reused
/// from the discovery scan or another instance. Multiple tokens in one
/// fragment are each replaced; the fragment's surrounding text stays
/// intact.
pub(crate) fn instantiate_row(
    context: &MergeContext,
    row: &DataRow,
    stem: &str,
    staging: &Path,
) -> Result<PathBuf, MergeError> {
    let extension = context
        .template_path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("docx");
    let copy_path = staging.join(format!("{stem}.{extension}"));
    std::fs::copy(&context.template_path, &copy_path)?;

    let mut document = DocxDocument::open(&copy_path)?;
    let occurrences = context.scanner.scan_texts(document.fragment_texts());
    for occurrence in &occurrences {
        let name = occurrence.token.name.to_lowercase();
        let column = context.bindings.get(&name).copied().ok_or_else(|| {
            MergeError::Config(format!("placeholder '{}' is unbound", occurrence.token.name))
        })?;
        let value = display_value(row, column, &context.shared_strings)?;
        document.replace_in_fragment(occurrence.fragment, &occurrence.token.literal, &value)?;
    }
    document.save()?;
    Ok(copy_path)
}

/// Moves a generated artifact into the destination, falling back to
/// copy-and-delete when the destination sits on another filesystem.
async fn move_file(from: &Path, to: &Path) -> Result<(), MergeError> {
    if tokio::fs::rename(from, to).await.is_ok() {
        return Ok(());
    }
    tokio::fs::copy(from, to).await?;
    tokio::fs::remove_file(from).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artifact_stem_keeps_plain_hints() {
        assert_eq!(artifact_stem("Anna Smith", 3), "Anna Smith");
    }

    #[test]
    fn test_artifact_stem_sanitizes_path_characters() {
        assert_eq!(artifact_stem("a/b\\c:d", 1), "a_b_c_d");
    }

    #[test]
    fn test_artifact_stem_falls_back_for_empty_hints() {
        assert_eq!(artifact_stem("", 7), "row-7");
        assert_eq!(artifact_stem("   ", 8), "row-8");
        assert_eq!(artifact_stem("..", 9), "row-9");
    }
}

pub mod fixtures;

use missive_docx::DocxDocument;
use std::path::Path;

pub type TestResult = Result<(), Box<dyn std::error::Error>>;

/// Reads all run texts of a generated document, in document order.
pub fn document_texts(path: &Path) -> Vec<String> {
    let document = DocxDocument::open(path).expect("generated document opens");
    document.fragment_texts().map(str::to_string).collect()
}

/// File names (not paths) currently present in a directory, sorted.
pub fn dir_entries(path: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(path)
        .expect("directory is readable")
        .flatten()
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

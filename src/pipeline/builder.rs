// src/pipeline/builder.rs
use crate::error::MergeError;
use crate::merge::binder::{bind_columns, describe_bindings};
use crate::merge::scanner::PlaceholderScanner;
use crate::pipeline::config::MergeConfig;
use crate::pipeline::context::MergeContext;
use crate::pipeline::orchestrator::MergePipeline;
use log::{debug, info};
use missive_convert::{FormatConverter, SofficeConverter};
use missive_docx::DocxDocument;
use missive_xlsx::XlsxTable;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A builder for creating a [`MergePipeline`].
///
/// `build` performs every fatal pre-batch check: input existence and
/// extensions, template readability, data-source readability, and the
/// eager binding of all placeholders. Once it returns `Ok`, the only
/// errors left are per-row ones.
#[derive(Default)]
pub struct MergePipelineBuilder {
    template: Option<PathBuf>,
    data: Option<PathBuf>,
    destination: Option<PathBuf>,
    config: MergeConfig,
    converter: Option<Arc<dyn FormatConverter>>,
}

impl MergePipelineBuilder {
    pub fn new() -> Self {
        Default::default()
    }

    /// The DOCX template containing the placeholder tokens.
    pub fn with_template_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.template = Some(path.as_ref().to_path_buf());
        self
    }

    /// The XLSX data source; its first worksheet row is the header.
    pub fn with_data_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.data = Some(path.as_ref().to_path_buf());
        self
    }

    /// The existing directory that receives the generated files.
    pub fn with_destination<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.destination = Some(path.as_ref().to_path_buf());
        self
    }

    /// Enables or disables fixed-layout conversion of every artifact.
    pub fn with_convert(mut self, convert: bool) -> Self {
        self.config.convert = convert;
        self
    }

    /// Overrides the admission-slot count (minimum 1).
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.config.concurrency = concurrency.max(1);
        self
    }

    /// Overrides the placeholder delimiter character.
    pub fn with_marker(mut self, marker: char) -> Self {
        self.config.marker = marker;
        self
    }

    /// Injects a converter implementation (and turns conversion on).
    /// Without this, conversion uses headless LibreOffice from `PATH`.
    pub fn with_converter(mut self, converter: Arc<dyn FormatConverter>) -> Self {
        self.converter = Some(converter);
        self.config.convert = true;
        self
    }

    /// Consumes the builder, validates the run, and binds all columns.
    pub fn build(self) -> Result<MergePipeline, MergeError> {
        let template = self
            .template
            .ok_or_else(|| MergeError::Config("no template file configured".to_string()))?;
        require_input_file(&template, "docx", "template")?;
        let data = self
            .data
            .ok_or_else(|| MergeError::Config("no data file configured".to_string()))?;
        require_input_file(&data, "xlsx", "data")?;
        let destination = self
            .destination
            .ok_or_else(|| MergeError::Config("no destination directory configured".to_string()))?;
        if !destination.is_dir() {
            return Err(MergeError::Config(format!(
                "destination '{}' is not an existing directory",
                destination.display()
            )));
        }

        // Discovery scan against the pristine template, read-only. The
        // template stays untouched for the whole run; every row works on
        // its own copy.
        let scanner = PlaceholderScanner::new(self.config.marker);
        let template_document = DocxDocument::open(&template)?;
        let names: BTreeSet<String> = scanner
            .names(template_document.fragment_texts())
            .into_iter()
            .collect();
        drop(template_document);

        let table = XlsxTable::open(&data)?;
        let (header, rows, shared_strings) = table.into_parts();
        let bindings = bind_columns(&names, &header, &shared_strings)?;
        info!(
            "[SCAN] {} distinct placeholders bound against {} header columns, {} data rows",
            names.len(),
            header.len(),
            rows.len()
        );
        debug!("[SCAN] bindings: {:?}", describe_bindings(&bindings));

        let converter: Option<Arc<dyn FormatConverter>> = if self.config.convert {
            Some(
                self.converter
                    .unwrap_or_else(|| Arc::new(SofficeConverter::new())),
            )
        } else {
            None
        };

        let context = Arc::new(MergeContext {
            template_path: template,
            destination,
            scanner,
            bindings,
            shared_strings,
        });
        Ok(MergePipeline::new(context, rows, converter, self.config.concurrency))
    }
}

fn require_input_file(path: &Path, extension: &str, role: &str) -> Result<(), MergeError> {
    if !path.is_file() {
        return Err(MergeError::Config(format!(
            "{role} file '{}' does not exist",
            path.display()
        )));
    }
    let actual = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    if !actual.eq_ignore_ascii_case(extension) {
        return Err(MergeError::Config(format!(
            "{role} file '{}' must have the .{extension} extension",
            path.display()
        )));
    }
    Ok(())
}

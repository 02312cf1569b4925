// src/pipeline/config.rs

/// Default admission-slot count.
///
/// The bound caps simultaneously open document copies and converter
/// subprocesses; the work is I/O-bound, so this is not a CPU-core count.
pub const DEFAULT_CONCURRENCY: usize = 6;

/// Default placeholder delimiter character.
pub const DEFAULT_MARKER: char = '#';

/// Tunables for one merge run.
#[derive(Debug, Clone)]
pub struct MergeConfig {
    /// Number of rows that may be generating or converting at once.
    pub concurrency: usize,
    /// Placeholder delimiter character.
    pub marker: char,
    /// Convert every generated document to fixed-layout output.
    pub convert: bool,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            marker: DEFAULT_MARKER,
            convert: false,
        }
    }
}

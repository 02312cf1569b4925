//! Fixed-layout conversion via an external converter subprocess.
//!
//! The merge pipeline treats conversion as an injectable collaborator: a
//! [`FormatConverter`] turns one instantiated document into a fixed-layout
//! file in the destination directory, or fails for that row only. The real
//! implementation, [`SofficeConverter`], shells out to a headless
//! LibreOffice. Tests and dry-runs can substitute [`StubConverter`] or
//! their own fake without spawning any process.

use async_trait::async_trait;
use log::debug;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::process::Command;

/// Error type for conversion operations.
#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("converter '{program}' could not be spawned: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[error("converter exited with status {0}")]
    ExitStatus(i32),

    #[error("converter was terminated by a signal")]
    Terminated,

    #[error("converter produced no output file at '{}'", .0.display())]
    MissingOutput(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Converts one document into a fixed-layout file inside `out_dir`.
///
/// Implementations must tolerate concurrent invocations; any per-run
/// scratch state has to be private to the call.
#[async_trait]
pub trait FormatConverter: Send + Sync {
    /// The file extension of produced output (without the dot).
    fn output_extension(&self) -> &str;

    /// Converts `input`, returning the path of the produced file.
    async fn convert(&self, input: &Path, out_dir: &Path) -> Result<PathBuf, ConvertError>;
}

/// Headless LibreOffice (`soffice`) subprocess converter.
///
/// Every invocation gets a fresh `-env:UserInstallation` profile directory
/// so concurrent conversions cannot trample each other's lock files; the
/// directory is removed again no matter how the subprocess exits.
pub struct SofficeConverter {
    program: PathBuf,
    filter: String,
}

impl SofficeConverter {
    pub fn new() -> Self {
        Self::with_program("soffice")
    }

    /// Uses a specific converter binary instead of `soffice` from `PATH`.
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            filter: "pdf".to_string(),
        }
    }
}

impl Default for SofficeConverter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FormatConverter for SofficeConverter {
    fn output_extension(&self) -> &str {
        &self.filter
    }

    async fn convert(&self, input: &Path, out_dir: &Path) -> Result<PathBuf, ConvertError> {
        let profile = tempfile::Builder::new().prefix("missive-profile-").tempdir()?;
        let profile_url = format!("file://{}", profile.path().display());
        debug!(
            "[CONVERT] {} -> {} (profile {})",
            input.display(),
            out_dir.display(),
            profile.path().display()
        );

        let status = Command::new(&self.program)
            .arg("--headless")
            .arg(format!("-env:UserInstallation={profile_url}"))
            .arg("--convert-to")
            .arg(&self.filter)
            .arg("--outdir")
            .arg(out_dir)
            .arg(input)
            .status()
            .await
            .map_err(|source| ConvertError::Spawn {
                program: self.program.display().to_string(),
                source,
            })?;

        // The profile is scratch state; remove it before judging the exit
        // status so failed conversions do not leak directories.
        profile.close()?;

        if !status.success() {
            return Err(match status.code() {
                Some(code) => ConvertError::ExitStatus(code),
                None => ConvertError::Terminated,
            });
        }

        let output = expected_output(input, out_dir, &self.filter);
        if !output.exists() {
            return Err(ConvertError::MissingOutput(output));
        }
        Ok(output)
    }
}

/// A process-free converter that copies the input into the destination
/// with the target extension. Useful in tests and dry runs.
pub struct StubConverter {
    extension: String,
}

impl StubConverter {
    pub fn new(extension: impl Into<String>) -> Self {
        Self {
            extension: extension.into(),
        }
    }
}

#[async_trait]
impl FormatConverter for StubConverter {
    fn output_extension(&self) -> &str {
        &self.extension
    }

    async fn convert(&self, input: &Path, out_dir: &Path) -> Result<PathBuf, ConvertError> {
        let output = expected_output(input, out_dir, &self.extension);
        tokio::fs::copy(input, &output).await?;
        Ok(output)
    }
}

/// Converted files keep the input's base name with the target extension.
fn expected_output(input: &Path, out_dir: &Path, extension: &str) -> PathBuf {
    let stem = input.file_stem().unwrap_or_default();
    out_dir.join(stem).with_extension(extension)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    fn fake_converter(dir: &Path, script_body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.join("fake-soffice");
        std::fs::write(&path, format!("#!/bin/sh\n{script_body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_successful_conversion_returns_output_path() {
        let dir = tempfile::tempdir().unwrap();
        // args: --headless -env:... --convert-to pdf --outdir <dir> <input>
        let program = fake_converter(dir.path(), r#"touch "$6/$(basename "$7" .docx).pdf""#);
        let input = dir.path().join("letter.docx");
        std::fs::write(&input, b"stub").unwrap();

        let converter = SofficeConverter::with_program(&program);
        let output = converter.convert(&input, dir.path()).await.unwrap();
        assert_eq!(output, dir.path().join("letter.pdf"));
        assert!(output.exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_nonzero_exit_surfaces_the_code() {
        let dir = tempfile::tempdir().unwrap();
        let program = fake_converter(dir.path(), "exit 77");
        let input = dir.path().join("letter.docx");
        std::fs::write(&input, b"stub").unwrap();

        let converter = SofficeConverter::with_program(&program);
        let err = converter.convert(&input, dir.path()).await.unwrap_err();
        assert!(matches!(err, ConvertError::ExitStatus(77)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_silent_converter_reports_missing_output() {
        let dir = tempfile::tempdir().unwrap();
        let program = fake_converter(dir.path(), "exit 0");
        let input = dir.path().join("letter.docx");
        std::fs::write(&input, b"stub").unwrap();

        let converter = SofficeConverter::with_program(&program);
        let err = converter.convert(&input, dir.path()).await.unwrap_err();
        assert!(matches!(err, ConvertError::MissingOutput(_)));
    }

    #[tokio::test]
    async fn test_stub_converter_copies_with_extension() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("letter.docx");
        std::fs::write(&input, b"stub").unwrap();

        let converter = StubConverter::new("pdf");
        let output = converter.convert(&input, dir.path()).await.unwrap();
        assert_eq!(output, dir.path().join("letter.pdf"));
        assert!(output.exists());
    }
}

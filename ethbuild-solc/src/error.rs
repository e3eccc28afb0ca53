use crate::artifacts::Diagnostic;
use std::{io, path::PathBuf};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SolcError>;

/// Various error types
#[derive(Debug, Error)]
pub enum SolcError {
    /// A source file referenced by the project does not exist
    #[error("Source file not found: \"{0}\"")]
    FileNotFound(PathBuf),
    /// An import statement that could not be mapped to any file on disk
    #[error("Failed to resolve import \"{specifier}\" imported from \"{from}\"")]
    ImportNotFound { specifier: String, from: PathBuf },
    /// A library import names a package whose referenced file is missing
    #[error("Library \"{library}\" is installed but does not contain \"{specifier}\"")]
    LibraryFileNotFound { library: String, specifier: String },
    /// Two distinct files on disk claim the same logical source name
    #[error(
        "Source name \"{source_name}\" is claimed by two different files: \"{}\" and \"{}\"",
        first.display(),
        second.display()
    )]
    NonUniqueSourceName { source_name: String, first: PathBuf, second: PathBuf },
    /// The compiler reported at least one error-severity diagnostic.
    ///
    /// Carries *all* diagnostics of the run, warnings included, so callers
    /// can report them together.
    #[error("Compilation failed:\n{}", render_diagnostics(.0))]
    CompilerDiagnostics(Vec<Diagnostic>),
    /// Invoking the compiler itself failed
    #[error("Solc error: {0}")]
    Solc(String),
    /// Deserialization error
    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),
    /// Filesystem IO error
    #[error(transparent)]
    Io(#[from] SolcIoError),
    /// General purpose message
    #[error("{0}")]
    Message(String),
}

impl SolcError {
    pub(crate) fn io(err: io::Error, path: impl Into<PathBuf>) -> Self {
        SolcIoError::new(err, path).into()
    }

    pub(crate) fn solc(msg: impl Into<String>) -> Self {
        SolcError::Solc(msg.into())
    }
}

fn render_diagnostics(diagnostics: &[Diagnostic]) -> String {
    diagnostics.iter().map(|d| d.to_string()).collect::<Vec<_>>().join("\n")
}

#[derive(Debug, Error)]
#[error("\"{}\": {io}", self.path.display())]
pub struct SolcIoError {
    io: io::Error,
    path: PathBuf,
}

impl SolcIoError {
    pub fn new(io: io::Error, path: impl Into<PathBuf>) -> Self {
        Self { io, path: path.into() }
    }
}

impl From<SolcIoError> for io::Error {
    fn from(err: SolcIoError) -> Self {
        err.io
    }
}

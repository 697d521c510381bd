//! Error types.
//!
//! Internally the crate uses `anyhow` (`Res<T>`) and attaches context as errors bubble up. At the
//! public boundary, commands convert those into an `Error` that carries an `ErrorType`, so that a
//! caller can tell a validation problem apart from a locked file or a failed email.

use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Display, Formatter};
use std::path::{Path, PathBuf};

/// The internal result type.
pub(crate) type Res<T> = anyhow::Result<T>;

/// The public result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Broad classification of what went wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorType {
    /// The input was malformed or violated a rule, e.g. a negative unit price.
    Validation,
    /// A document could not be written because another program holds it open, or permission was
    /// denied.
    FileInUse,
    /// Any other file system failure.
    Io,
    /// The home directory or `config.json` is missing or invalid.
    Config,
    /// The requested project does not exist.
    NotFound,
    /// Notifications could not be attempted at all, e.g. the SMTP secret is missing.
    Notification,
}

serde_plain::derive_display_from_serialize!(ErrorType);
serde_plain::derive_fromstr_from_deserialize!(ErrorType);

/// The public error type.
pub struct Error {
    error_type: ErrorType,
    inner: anyhow::Error,
}

impl Error {
    pub(crate) fn new(error_type: ErrorType, inner: anyhow::Error) -> Self {
        Self { error_type, inner }
    }

    pub fn error_type(&self) -> ErrorType {
        self.error_type
    }
}

impl Debug for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} error: {:?}", self.error_type, self.inner)
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#}", self.inner)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.inner.source()
    }
}

/// Converts an internal result into a public one.
pub(crate) trait IntoResult<T> {
    /// Wraps the error with `error_type`. If a `FileInUse` error is anywhere in the chain it wins,
    /// regardless of what the caller passed.
    fn pub_result(self, error_type: ErrorType) -> Result<T>;
}

impl<T, E> IntoResult<T> for std::result::Result<T, E>
where
    E: Into<anyhow::Error>,
{
    fn pub_result(self, error_type: ErrorType) -> Result<T> {
        self.map_err(|e| {
            let inner: anyhow::Error = e.into();
            let error_type = if inner.chain().any(|c| c.is::<FileInUse>()) {
                ErrorType::FileInUse
            } else {
                error_type
            };
            Error::new(error_type, inner)
        })
    }
}

/// Raised when a document cannot be replaced because it is locked or not writable.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct FileInUse {
    path: PathBuf,
}

impl FileInUse {
    pub(crate) fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Display for FileInUse {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "The file '{}' is in use or is not writable. If it is open in a spreadsheet program, \
            close it and try again",
            self.path.display()
        )
    }
}

impl std::error::Error for FileInUse {}

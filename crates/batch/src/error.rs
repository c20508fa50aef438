//! Batch Error Types
//!
//! Only failures that abort the whole run live here. Per-image and per-size
//! failures are values ([`ConversionResult`](crate::ConversionResult)), not errors.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A batch error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for batch operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The source root does not exist, is not a directory, or cannot be listed.
    #[display("source path is not a readable directory: {}", _0.display())]
    SourcePathInvalid(#[error(not(source))] PathBuf),
    /// The requested output format is not one of png, jpg, jpeg, webp, bmp, gif.
    #[display("unsupported output format: {_0}")]
    UnsupportedFormat(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        false
    }
}

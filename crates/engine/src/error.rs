//! Engine Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use std::path::PathBuf;
use std::time::Duration;

/// An engine error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
/// Every variant is cheap to clone so batch results can keep a copy of the
/// failure after the [`Error`] tree itself has been logged and dropped.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Neither `magick` nor `convert` could be found on `PATH`.
    #[display("ImageMagick not detected on your system (looked for: magick, convert)")]
    EngineNotFound,
    /// An explicit engine path was given but it does not point at a file.
    #[display("engine is not invocable: {}", _0.display())]
    EngineNotInvocable(#[error(not(source))] PathBuf),
    /// The engine process could not be started at all.
    #[display("failed to start engine: {_0}")]
    Spawn(#[error(not(source))] String),
    /// The engine did not exit within the configured time limit and was killed.
    #[display("engine timed out after {}s", _0.as_secs_f32())]
    Timeout(#[error(not(source))] Duration),
    /// The engine exited with a non-zero (or no, when killed by a signal) exit code.
    #[display("engine exited with {}", exit_code(code))]
    NonZeroExit { code: Option<i32>, stderr: String },
    /// The engine reported success but the destination file is missing.
    #[display("output file was not created: {}", _0.display())]
    OutputNotCreated(#[error(not(source))] PathBuf),
    /// The dimension query answered with something other than two positive integers.
    #[display("invalid dimensions reported by engine: {_0:?}")]
    InvalidDimensions(#[error(not(source))] String),
    /// The batch was cancelled before this invocation started.
    #[display("cancelled before the engine was invoked")]
    Cancelled,
    /// Local filesystem work around the invocation failed (e.g. creating the output directory).
    #[display("I/O error: {_0}")]
    Io(#[error(not(source))] String),
}

fn exit_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("code {code}"),
        None => "no exit code".to_string(),
    }
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    ///
    /// Non-zero exits are treated as deterministic: feeding the same file to
    /// the same engine again will fail the same way.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorKind::Spawn(_) | ErrorKind::Timeout(_))
    }

    /// Diagnostic output captured from the engine, if any.
    pub fn diagnostics(&self) -> Option<&str> {
        match self {
            ErrorKind::NonZeroExit { stderr, .. } if !stderr.trim().is_empty() => Some(stderr.trim()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(ErrorKind::NonZeroExit { code: Some(1), stderr: String::new() }, "engine exited with code 1")]
    #[case(ErrorKind::NonZeroExit { code: None, stderr: String::new() }, "engine exited with no exit code")]
    #[case(ErrorKind::Timeout(Duration::from_secs(5)), "engine timed out after 5s")]
    #[case(ErrorKind::InvalidDimensions(String::new()), "invalid dimensions reported by engine: \"\"")]
    #[case(ErrorKind::Cancelled, "cancelled before the engine was invoked")]
    fn error_kind_display(#[case] kind: ErrorKind, #[case] expected: &str) {
        assert_eq!(kind.to_string(), expected);
    }

    #[test]
    fn error_kind_retryable() {
        assert!(ErrorKind::Spawn("resource temporarily unavailable".to_string()).is_retryable());
        assert!(ErrorKind::Timeout(Duration::from_secs(1)).is_retryable());
        assert!(!ErrorKind::NonZeroExit { code: Some(1), stderr: String::new() }.is_retryable());
        assert!(!ErrorKind::OutputNotCreated(PathBuf::from("a.png")).is_retryable());
        assert!(!ErrorKind::Cancelled.is_retryable());
    }

    #[test]
    fn diagnostics_only_for_non_empty_stderr() {
        let kind = ErrorKind::NonZeroExit { code: Some(1), stderr: "  convert: no decode delegate\n".to_string() };
        assert_eq!(kind.diagnostics(), Some("convert: no decode delegate"));
        let kind = ErrorKind::NonZeroExit { code: Some(1), stderr: "\n".to_string() };
        assert_eq!(kind.diagnostics(), None);
        assert_eq!(ErrorKind::Io("disk full".to_string()).diagnostics(), None);
    }
}

//! CLI Error Types
//!
//! Everything that reaches `main` is fatal and ends the process with exit
//! status 1. Per-image failures never get this far.

use derive_more::{Display, Error};
use thumbs_batch::error::{Error as BatchError, ErrorKind as BatchErrorKind};
use thumbs_config::error::{Error as ConfigError, ErrorKind as ConfigErrorKind};
use thumbs_engine::error::{Error as EngineError, ErrorKind as EngineErrorKind};

/// A fatal error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for CLI operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("configuration error: {_0}")]
    Config(ConfigErrorKind),
    #[display("{_0}")]
    Engine(EngineErrorKind),
    #[display("{_0}")]
    Batch(BatchErrorKind),
}

impl ErrorKind {
    /// Wrap a lower-level error, preserving its `Exn` frame as a child in
    /// this error tree.
    #[track_caller]
    pub fn config(err: ConfigError) -> Error {
        let inner = (*err).clone();
        err.raise(ErrorKind::Config(inner))
    }

    #[track_caller]
    pub fn engine(err: EngineError) -> Error {
        let inner = (*err).clone();
        err.raise(ErrorKind::Engine(inner))
    }

    #[track_caller]
    pub fn batch(err: BatchError) -> Error {
        let inner = (*err).clone();
        err.raise(ErrorKind::Batch(inner))
    }
}

//! Discovery and invocation of the external image-processing engine.
//!
//! All pixel work is delegated to ImageMagick. This crate knows how to find
//! it ([`ImageMagick::locate`]), how to describe a command line
//! ([`Invocation`]), and how to run one with a time limit ([`Engine::run`]).
//! What the command lines *mean* is decided by the caller.
//!
//! The [`Engine`] trait is the seam for tests: enable the `mock` feature for
//! an in-memory [`MockEngine`] that answers dimension queries and "writes"
//! thumbnails without ImageMagick installed.

pub mod error;
mod invocation;
mod magick;
#[cfg(feature = "mock")]
mod mock;

use crate::error::{ErrorKind, Result};
pub use crate::invocation::{Dimensions, Invocation, Output};
pub use crate::magick::ImageMagick;
#[cfg(feature = "mock")]
pub use crate::mock::{MockEngine, MockFailure};
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;

#[async_trait]
pub trait Engine: Send + Sync {
    /// Absolute path of the engine executable; the program of every
    /// [`Invocation`] built for this engine.
    fn program(&self) -> &Path;

    /// Runs the invocation to completion.
    ///
    /// Implementations must fail with [`ErrorKind::NonZeroExit`] when the
    /// process does not exit successfully, and [`ErrorKind::Spawn`] when it
    /// cannot be started.
    async fn execute(&self, invocation: &Invocation) -> Result<Output>;

    /// Runs the invocation, giving up with [`ErrorKind::Timeout`] once `limit`
    /// has elapsed. The engine process is killed when the limit is hit.
    async fn run(&self, invocation: &Invocation, limit: Duration) -> Result<Output> {
        match tokio::time::timeout(limit, self.execute(invocation)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(command = %invocation, limit = ?limit, "Engine timed out; process killed");
                exn::bail!(ErrorKind::Timeout(limit))
            },
        }
    }
}

//! Thumbnail batch orchestration.
//!
//! A run is a pipeline of small, separately testable stages:
//!
//! 1. [`discover`] source images (skipping thumbnails from earlier runs),
//! 2. [`plan`] the sizes each image needs from its dimensions,
//! 3. build a [`ConversionJob`] per size, whose destination comes from
//!    [`output_path`] and whose engine arguments come from a [`FormatProfile`],
//! 4. [`Executor::convert`] each job into a [`ConversionResult`],
//! 5. fold results into [`ImageReport`]s and a [`BatchSummary`].
//!
//! [`run`] drives all of it as a stream of [`BatchEvent`]s. Only problems that
//! make the whole run pointless are errors; everything else is a result.

mod discover;
pub mod error;
mod execute;
mod format;
mod job;
mod path;
mod plan;
mod report;
mod stream;

pub use crate::discover::{Discovery, LEGACY_EXTENSIONS, SUPPORTED_EXTENSIONS, discover, is_derivative};
pub use crate::execute::{Executor, Options};
pub use crate::format::FormatProfile;
pub use crate::job::{ConversionJob, ConversionResult, Failure, SourceImage};
pub use crate::path::output_path;
pub use crate::plan::{TARGET_SIZES, TargetSize, plan};
pub use crate::report::{BatchSummary, ImageReport, Outcome};
pub use crate::stream::{BatchEvent, run};

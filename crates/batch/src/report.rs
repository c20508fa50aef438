use crate::job::{ConversionResult, Failure};
use std::fmt::{self, Display, Formatter};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thumbs_engine::Dimensions;

/// How an image fared, as a whole.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// Every planned thumbnail was created.
    Done,
    /// The image is no larger than the smallest size; nothing to do.
    Skipped,
    /// A legacy format that is listed but never converted.
    Unsupported,
    /// The dimension query or at least one conversion failed.
    Failed,
}

/// Everything that happened to one source image.
#[derive(Clone, Debug)]
pub struct ImageReport {
    pub path: PathBuf,
    /// `None` when the dimension query failed (or was never made).
    pub dimensions: Option<Dimensions>,
    /// Thumbnails confirmed on disk, largest first.
    pub created: Vec<PathBuf>,
    pub failures: Vec<Failure>,
    unsupported: bool,
}

impl ImageReport {
    pub fn from_results(path: &Path, dimensions: Dimensions, results: Vec<ConversionResult>) -> Self {
        let mut report = Self::empty(path);
        report.dimensions = Some(dimensions);
        for result in results {
            match result {
                ConversionResult::Created { output } => report.created.push(output),
                ConversionResult::Failed(failure) => report.failures.push(failure),
            }
        }
        report
    }

    /// The image couldn't even be measured.
    pub fn invalid(path: &Path, failure: Failure) -> Self {
        let mut report = Self::empty(path);
        report.failures.push(failure);
        report
    }

    pub fn unsupported(path: &Path) -> Self {
        Self { unsupported: true, ..Self::empty(path) }
    }

    fn empty(path: &Path) -> Self {
        Self { path: path.to_path_buf(), dimensions: None, created: Vec::new(), failures: Vec::new(), unsupported: false }
    }

    pub fn outcome(&self) -> Outcome {
        if self.unsupported {
            Outcome::Unsupported
        } else if !self.failures.is_empty() {
            Outcome::Failed
        } else if self.created.is_empty() {
            Outcome::Skipped
        } else {
            Outcome::Done
        }
    }
}

fn thumbnails(n: usize) -> &'static str {
    if n == 1 { "thumbnail" } else { "thumbnails" }
}

impl Display for ImageReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let path = self.path.display();
        let created = self.created.len();
        match self.outcome() {
            Outcome::Done => writeln!(f, "{path}: DONE — created {created} {}", thumbnails(created)),
            Outcome::Skipped => writeln!(f, "{path}: SKIPPED — no thumbnails needed"),
            Outcome::Unsupported => {
                let extension = self.path.extension().map(|e| e.to_string_lossy().to_lowercase()).unwrap_or_default();
                writeln!(f, "{path}: SKIPPED — unsupported format ({extension})")
            },
            Outcome::Failed => {
                match self.dimensions {
                    Some(_) => {
                        let planned = created + self.failures.len();
                        writeln!(f, "{path}: FAILED — created {created} of {planned} {}", thumbnails(planned))?
                    },
                    None => writeln!(f, "{path}: FAILED — could not determine dimensions")?,
                }
                for failure in &self.failures {
                    write!(f, "{failure}")?;
                }
                match self.dimensions {
                    Some(dimensions) => writeln!(f, "    original dimensions: {dimensions}"),
                    None => writeln!(f, "    original dimensions: unknown"),
                }
            },
        }
    }
}

/// Totals for a whole run, folded from [`ImageReport`]s.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BatchSummary {
    /// Supported images found by discovery.
    pub images: usize,
    /// Thumbnails confirmed on disk. Failures never count.
    pub thumbnails: usize,
    pub done: usize,
    pub skipped: usize,
    pub failed: usize,
    pub unsupported: usize,
    /// Images never started because the run was cancelled.
    pub cancelled: usize,
    pub elapsed: Duration,
}

impl BatchSummary {
    pub fn record(&mut self, report: &ImageReport) {
        match report.outcome() {
            Outcome::Unsupported => {
                self.unsupported += 1;
                return;
            },
            Outcome::Done => self.done += 1,
            Outcome::Skipped => self.skipped += 1,
            Outcome::Failed => self.failed += 1,
        }
        self.images += 1;
        self.thumbnails += report.created.len();
    }
}

impl<'a> FromIterator<&'a ImageReport> for BatchSummary {
    fn from_iter<I: IntoIterator<Item = &'a ImageReport>>(iter: I) -> Self {
        let mut summary = Self::default();
        iter.into_iter().for_each(|report| summary.record(report));
        summary
    }
}

impl Display for BatchSummary {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "Elapsed time:       {:.2}s", self.elapsed.as_secs_f64())?;
        writeln!(f, "Images found:       {}", self.images)?;
        writeln!(f, "Thumbnails created: {}", self.thumbnails)?;
        write!(f, "Done: {}, skipped: {}, failed: {}", self.done, self.skipped, self.failed)?;
        if self.unsupported > 0 {
            write!(f, ", unsupported: {}", self.unsupported)?;
        }
        if self.cancelled > 0 {
            write!(f, ", cancelled: {}", self.cancelled)?;
        }
        writeln!(f)
    }
}

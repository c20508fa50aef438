use crate::format::FormatProfile;
use crate::job::{ConversionJob, ConversionResult, Failure, SourceImage};
use crate::path::ensure_parent;
use crate::plan::plan;
use crate::report::ImageReport;
use exn::ResultExt;
use std::sync::Arc;
use std::time::Duration;
use thumbs_engine::error::{ErrorKind as EngineErrorKind, Result as EngineResult};
use thumbs_engine::{Dimensions, Engine, Invocation, Output};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

/// Limits applied to every engine invocation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Options {
    /// Engine processes allowed to run at once.
    pub concurrency: usize,
    /// Time limit for a single invocation.
    pub timeout: Duration,
    /// Extra attempts for retryable failures (spawn errors, timeouts).
    pub retries: u32,
    /// Delay before the first retry; doubles with every attempt.
    pub retry_backoff: Duration,
}

/// The strictly sequential baseline: one engine process at a time and no
/// retries. The CLI builds its options from `thumbs_config::Config` instead,
/// which defaults to available parallelism and two retries.
impl Default for Options {
    fn default() -> Self {
        Self {
            concurrency: 1,
            timeout: Duration::from_secs(300),
            retries: 0,
            retry_backoff: Duration::from_millis(250),
        }
    }
}

/// Runs jobs against an engine, turning every failure into a value.
///
/// Nothing here returns an error: a failed dimension query fails one image,
/// a failed conversion fails one size of one image, and the batch carries on.
pub struct Executor {
    engine: Arc<dyn Engine>,
    options: Options,
    permits: Semaphore,
    cancel: CancellationToken,
}

impl Executor {
    pub fn new(engine: Arc<dyn Engine>, options: Options) -> Self {
        let permits = Semaphore::new(options.concurrency.max(1));
        Self { engine, options, permits, cancel: CancellationToken::new() }
    }

    /// Uses `token` to stop jobs that haven't started yet. Jobs already
    /// running in the engine are left to finish.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Queries dimensions, plans sizes, and converts every planned size.
    #[instrument(skip_all, fields(image = %image.path().display()))]
    pub async fn process(&self, image: SourceImage, profile: FormatProfile) -> ImageReport {
        let dimensions = match self.dimensions(&image).await {
            Ok(dimensions) => dimensions,
            Err(failure) => {
                tracing::debug!(error = %failure.error, "Dimension query failed");
                return ImageReport::invalid(image.path(), failure);
            },
        };
        let jobs: Vec<_> = plan(dimensions).into_iter().map(|size| ConversionJob::new(&image, profile, size)).collect();
        tracing::debug!(dimensions = %dimensions, jobs = jobs.len(), "Planned thumbnails");
        // Each job waits for its own permit, so this is only as parallel as `concurrency` allows.
        let results = futures::future::join_all(jobs.iter().map(|job| self.convert(job))).await;
        ImageReport::from_results(image.path(), dimensions, results)
    }

    pub async fn dimensions(&self, image: &SourceImage) -> Result<Dimensions, Failure> {
        let invocation = Invocation::dimensions(self.engine.program(), image.path());
        let failure = |error: &EngineErrorKind| Failure {
            size: None,
            error: error.clone(),
            command: invocation.to_string(),
        };
        let output = self.invoke(&invocation).await.map_err(|e| failure(&*e))?;
        output.stdout.parse::<Dimensions>().map_err(|e| failure(&*e))
    }

    /// Converts one job. Success requires a zero exit status *and* the
    /// destination file existing afterwards.
    pub async fn convert(&self, job: &ConversionJob<'_>) -> ConversionResult {
        let invocation = job.invocation(self.engine.program());
        let failed = |error: EngineErrorKind| {
            tracing::debug!(size = %job.size, error = %error, "Conversion failed");
            ConversionResult::Failed(Failure { size: Some(job.size), error, command: invocation.to_string() })
        };
        if self.is_cancelled() {
            return failed(EngineErrorKind::Cancelled);
        }
        if let Err(e) = ensure_parent(&job.destination).await {
            return failed(EngineErrorKind::Io(format!("could not create output directory: {e}")));
        }
        if let Err(e) = self.invoke(&invocation).await {
            return failed((*e).clone());
        }
        match tokio::fs::try_exists(&job.destination).await {
            Ok(true) => ConversionResult::Created { output: job.destination.clone() },
            _ => failed(EngineErrorKind::OutputNotCreated(job.destination.clone())),
        }
    }

    /// Runs an invocation, retrying retryable failures with exponential backoff.
    async fn invoke(&self, invocation: &Invocation) -> EngineResult<Output> {
        let mut attempt: u32 = 0;
        loop {
            let result = self.invoke_once(invocation).await;
            let retryable = matches!(&result, Err(e) if e.is_retryable());
            if !retryable || attempt >= self.options.retries || self.is_cancelled() {
                return result;
            }
            let delay = self.options.retry_backoff.saturating_mul(2u32.saturating_pow(attempt));
            attempt += 1;
            tracing::warn!(command = %invocation, attempt, delay = ?delay, "Retrying engine invocation");
            tokio::select! {
                _ = self.cancel.cancelled() => return result,
                _ = tokio::time::sleep(delay) => {},
            }
        }
    }

    async fn invoke_once(&self, invocation: &Invocation) -> EngineResult<Output> {
        let _permit = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => exn::bail!(EngineErrorKind::Cancelled),
            permit = self.permits.acquire() => permit.or_raise(|| EngineErrorKind::Cancelled)?,
        };
        self.engine.run(invocation, self.options.timeout).await
    }
}

mod cli;
mod error;

use crate::cli::Cli;
use crate::error::{ErrorKind, Result};
use clap::Parser;
use futures::StreamExt;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use thumbs_batch::{BatchEvent, Executor, FormatProfile, Options};
use thumbs_config::Config;
use thumbs_engine::ImageMagick;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

/// Conventional exit status for a process interrupted by SIGINT.
const EXIT_CANCELLED: u8 = 130;

enum Completion {
    Finished,
    Cancelled,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.log_level());
    let result = run(cli).await;
    if let Err(e) = &result {
        tracing::debug!("{e:?}");
        let kind: &ErrorKind = e;
        eprintln!("error: {kind}");
    }
    ExitCode::from(exit_status(&result))
}

/// Process exit status for the outcome of a run. Per-image failures still
/// count as a finished run; only fatal errors exit with 1.
fn exit_status(result: &Result<Completion>) -> u8 {
    match result {
        Ok(Completion::Finished) => 0,
        Ok(Completion::Cancelled) => EXIT_CANCELLED,
        Err(_) => 1,
    }
}

fn init_logging(level: LevelFilter) {
    // `RUST_LOG` wins over the verbosity flags when set.
    let filter = EnvFilter::builder().with_default_directive(level.into()).from_env_lossy();
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

async fn run(cli: Cli) -> Result<Completion> {
    let config = Config::load(cli.config.as_deref(), cli.overrides()).map_err(ErrorKind::config)?;
    let profile: FormatProfile = cli.format.parse().map_err(ErrorKind::batch)?;
    let engine = ImageMagick::locate(config.engine.as_deref()).map_err(ErrorKind::engine)?;
    engine.probe().await;
    tracing::info!(
        source = %cli.source.display(),
        format = %profile,
        concurrency = config.concurrency,
        "Starting batch"
    );

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!("Interrupted; waiting for running conversions to finish...");
                cancel.cancel();
            }
        }
    });

    let options = Options {
        concurrency: config.concurrency,
        timeout: config.timeout(),
        retries: config.retries,
        retry_backoff: config.retry_backoff(),
    };
    let executor = Executor::new(Arc::new(engine), options).with_cancellation(cancel);
    drive(&executor, &cli.source, profile).await
}

/// Runs the batch to completion, printing a line per image and the summary.
async fn drive(executor: &Executor, source: &Path, profile: FormatProfile) -> Result<Completion> {
    let mut events = std::pin::pin!(thumbs_batch::run(executor, source, profile));
    let mut processed = 0;
    let mut total = 0;
    while let Some(event) = events.next().await {
        match event.map_err(ErrorKind::batch)? {
            BatchEvent::Started => tracing::debug!("Discovering images"),
            BatchEvent::DiscoveryComplete { images: 0, unsupported } => {
                println!("Nothing to do: no images found in {}", source.display());
                total = unsupported;
            },
            BatchEvent::DiscoveryComplete { images, unsupported } => {
                println!("Found {images} images in {}", source.display());
                total = images + unsupported;
            },
            BatchEvent::Reported(report) => {
                processed += 1;
                print!("[{processed}/{total}] {report}");
            },
            BatchEvent::Complete(summary) => {
                println!();
                print!("{summary}");
            },
        }
    }
    Ok(if executor.is_cancelled() { Completion::Cancelled } else { Completion::Finished })
}

#[cfg(test)]
mod tests {
    use super::*;
    use thumbs_batch::error::ErrorKind as BatchErrorKind;
    use thumbs_engine::error::ErrorKind as EngineErrorKind;
    use thumbs_engine::{MockEngine, MockFailure};

    fn executor(engine: MockEngine) -> Executor {
        Executor::new(Arc::new(engine), Options::default())
    }

    fn touch(root: &Path, name: &str) {
        std::fs::write(root.join(name), b"").unwrap();
    }

    fn cli(args: &[&str]) -> Cli {
        Cli::parse_from(std::iter::once("thumbs").chain(args.iter().copied()))
    }

    #[tokio::test]
    async fn empty_tree_exits_successfully() {
        let dir = tempfile::tempdir().unwrap();
        let result = drive(&executor(MockEngine::new()), dir.path(), FormatProfile::Png).await;
        assert_eq!(exit_status(&result), 0);
    }

    #[tokio::test]
    async fn image_failures_still_exit_successfully() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "a.png");
        touch(dir.path(), "b.png");
        let engine = MockEngine::new()
            .with_image("a.png", 800, 600)
            .with_image("b.png", 800, 600)
            .fail("b-500px", MockFailure::Exit(1, "boom".to_string()));
        let result = drive(&executor(engine), dir.path(), FormatProfile::Png).await;
        assert_eq!(exit_status(&result), 0);
        assert!(dir.path().join("PNG/500px/a-500px.png").is_file());
    }

    #[tokio::test]
    async fn invalid_source_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing");
        let result = drive(&executor(MockEngine::new()), &missing, FormatProfile::Png).await;
        assert_eq!(exit_status(&result), 1);
        let err = result.err().unwrap();
        assert!(matches!(&*err, ErrorKind::Batch(BatchErrorKind::SourcePathInvalid(_))));
    }

    #[tokio::test]
    async fn cancelled_run_exits_with_130() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "a.png");
        let token = CancellationToken::new();
        token.cancel();
        let executor = executor(MockEngine::new().with_image("a.png", 800, 600)).with_cancellation(token);
        let result = drive(&executor, dir.path(), FormatProfile::Png).await;
        assert_eq!(exit_status(&result), EXIT_CANCELLED);
        assert!(!dir.path().join("PNG").exists());
    }

    #[tokio::test]
    async fn unsupported_format_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let result = run(cli(&[dir.path().to_str().unwrap(), "tiff"])).await;
        assert_eq!(exit_status(&result), 1);
        let err = result.err().unwrap();
        assert!(matches!(&*err, ErrorKind::Batch(BatchErrorKind::UnsupportedFormat(_))));
    }

    #[tokio::test]
    async fn unusable_engine_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let engine = dir.path().join("magick");
        let source = dir.path().to_str().unwrap();
        let result = run(cli(&[source, "png", "--engine", engine.to_str().unwrap()])).await;
        assert_eq!(exit_status(&result), 1);
        let err = result.err().unwrap();
        assert!(matches!(&*err, ErrorKind::Engine(EngineErrorKind::EngineNotInvocable(_))));
    }
}

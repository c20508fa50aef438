use crate::discover::discover;
use crate::error::Result;
use crate::execute::Executor;
use crate::format::FormatProfile;
use crate::report::{BatchSummary, ImageReport};
use async_stream::stream;
use futures::stream::FuturesUnordered;
use futures::{Stream, StreamExt};
use std::collections::VecDeque;
use std::path::Path;
use std::time::Instant;

/// Progress events emitted by [`run`].
///
/// Events follow a strict ordering:
/// 1. [`Started`](Self::Started): exactly once.
/// 2. [`DiscoveryComplete`](Self::DiscoveryComplete): exactly once.
/// 3. [`Reported`](Self::Reported): once per discovered file, unsupported
///    files first, then images in completion order.
/// 4. [`Complete`](Self::Complete): exactly once, carrying the summary.
///
/// A discovery failure terminates the stream early with an `Err`, in which
/// case nothing after it is emitted.
pub enum BatchEvent {
    Started,
    DiscoveryComplete { images: usize, unsupported: usize },
    Reported(Box<ImageReport>),
    Complete(BatchSummary),
}

/// Generates `profile` thumbnails for every image beneath `root`.
///
/// Up to `concurrency` images are in flight at a time, and their engine
/// invocations share the executor's `concurrency` permits. Once the executor
/// is cancelled no further images are started; those left over are counted
/// in [`BatchSummary::cancelled`].
pub fn run<'a>(
    executor: &'a Executor,
    root: &'a Path,
    profile: FormatProfile,
) -> impl Stream<Item = Result<BatchEvent>> + 'a {
    // `rustfmt` does not format macros that use braces. Wrap in parentheses!
    stream!({
        let started = Instant::now();
        yield Ok(BatchEvent::Started);

        let discovery = match discover(root).await {
            Ok(discovery) => discovery,
            Err(e) => {
                yield Err(e);
                return;
            },
        };
        yield Ok(BatchEvent::DiscoveryComplete {
            images: discovery.images.len(),
            unsupported: discovery.unsupported.len(),
        });

        let mut summary = BatchSummary::default();
        for path in &discovery.unsupported {
            let report = ImageReport::unsupported(path);
            summary.record(&report);
            yield Ok(BatchEvent::Reported(Box::new(report)));
        }

        let mut pending: VecDeque<_> =
            discovery.images.into_iter().map(|image| executor.process(image, profile)).collect();
        let mut processing = FuturesUnordered::new();
        let in_flight = executor.options().concurrency.max(1);
        processing.extend(pending.drain(..in_flight.min(pending.len())));
        while let Some(report) = processing.next().await {
            summary.record(&report);
            yield Ok(BatchEvent::Reported(Box::new(report)));
            if executor.is_cancelled() {
                continue;
            }
            if let Some(next) = pending.pop_front() {
                processing.push(next);
            }
        }
        if !pending.is_empty() {
            tracing::info!(remaining = pending.len(), "Run cancelled; remaining images were not started");
        }
        summary.cancelled = pending.len();
        summary.elapsed = started.elapsed();
        yield Ok(BatchEvent::Complete(summary));
    })
}

//! Progress notifications for batch runs.
//!
//! The processor reports through an injected [`ProgressSink`] so front ends
//! (progress bars, logs, tests) stay decoupled from the engine.

use crate::stt::transcriber::TranscriptionOutcome;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// A batch is about to be dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchStarted {
    /// Zero-based batch number.
    pub batch_index: usize,
    pub batch_count: usize,
    /// Number of requests in this batch.
    pub size: usize,
}

/// One request reached its outcome.
#[derive(Debug, Clone, Copy)]
pub struct ProgressUpdate<'a> {
    pub identifier: &'a str,
    pub outcome: &'a TranscriptionOutcome,
    /// Requests completed so far in this run, including this one.
    pub completed: usize,
    pub total: usize,
}

/// Receives progress notifications from the batch processor.
///
/// Called from the dispatcher only, never concurrently for one run.
pub trait ProgressSink: Send + Sync {
    /// A run over `total` requests is starting.
    fn run_started(&self, _total: usize) {}

    fn batch_started(&self, _batch: BatchStarted) {}

    fn item_completed(&self, update: &ProgressUpdate<'_>);

    /// The run finished; every request has an outcome.
    fn run_finished(&self) {}
}

impl<T: ProgressSink + ?Sized> ProgressSink for Arc<T> {
    fn run_started(&self, total: usize) {
        (**self).run_started(total)
    }

    fn batch_started(&self, batch: BatchStarted) {
        (**self).batch_started(batch)
    }

    fn item_completed(&self, update: &ProgressUpdate<'_>) {
        (**self).item_completed(update)
    }

    fn run_finished(&self) {
        (**self).run_finished()
    }
}

/// Discards all notifications.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn item_completed(&self, _update: &ProgressUpdate<'_>) {}
}

/// Logs notifications through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogProgress;

impl ProgressSink for LogProgress {
    fn batch_started(&self, batch: BatchStarted) {
        tracing::info!(
            "Processing batch {}/{} ({} files)",
            batch.batch_index + 1,
            batch.batch_count,
            batch.size
        );
    }

    fn item_completed(&self, update: &ProgressUpdate<'_>) {
        match update.outcome.failure_info() {
            None => tracing::info!(
                "[{}/{}] Successfully processed: {}",
                update.completed,
                update.total,
                update.identifier
            ),
            Some(failure) => tracing::warn!(
                "[{}/{}] Failed to process: {} - {}",
                update.completed,
                update.total,
                update.identifier,
                failure
            ),
        }
    }
}

/// Observable count of completed requests in the current run.
///
/// Clone it before handing it to the processor; every clone reads the same
/// counter. The count resets when a new run starts.
#[derive(Debug, Clone, Default)]
pub struct CompletionCounter {
    completed: Arc<AtomicUsize>,
    total: Arc<AtomicUsize>,
}

impl CompletionCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    pub fn total(&self) -> usize {
        self.total.load(Ordering::SeqCst)
    }
}

impl ProgressSink for CompletionCounter {
    fn run_started(&self, total: usize) {
        self.completed.store(0, Ordering::SeqCst);
        self.total.store(total, Ordering::SeqCst);
    }

    fn item_completed(&self, update: &ProgressUpdate<'_>) {
        self.completed.store(update.completed, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completion_counter_tracks_and_resets() {
        let counter = CompletionCounter::new();
        let observer = counter.clone();
        let outcome = TranscriptionOutcome::success("text");

        counter.run_started(3);
        counter.item_completed(&ProgressUpdate {
            identifier: "a",
            outcome: &outcome,
            completed: 2,
            total: 3,
        });
        assert_eq!(observer.completed(), 2);
        assert_eq!(observer.total(), 3);

        counter.run_started(5);
        assert_eq!(observer.completed(), 0);
        assert_eq!(observer.total(), 5);
    }

    /// Log sink for capturing formatted `tracing` output.
    #[derive(Clone, Default)]
    struct SharedBuffer(Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_log_progress_writes_batch_and_item_lines() {
        let buffer = SharedBuffer::default();
        let writer = buffer.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::INFO)
            .finish();

        let ok = TranscriptionOutcome::success("hello");
        let failed = TranscriptionOutcome::failure(
            crate::stt::transcriber::ErrorKind::ServiceError,
            "quota exceeded",
        );
        tracing::subscriber::with_default(subscriber, || {
            LogProgress.batch_started(BatchStarted {
                batch_index: 0,
                batch_count: 2,
                size: 2,
            });
            LogProgress.item_completed(&ProgressUpdate {
                identifier: "a.mp3",
                outcome: &ok,
                completed: 1,
                total: 2,
            });
            LogProgress.item_completed(&ProgressUpdate {
                identifier: "b.mp3",
                outcome: &failed,
                completed: 2,
                total: 2,
            });
        });

        let logs = String::from_utf8(buffer.0.lock().unwrap().clone()).unwrap();
        assert!(logs.contains("Processing batch 1/2 (2 files)"));
        assert!(logs.contains("INFO") && logs.contains("[1/2] Successfully processed: a.mp3"));
        assert!(logs.contains("WARN"));
        assert!(logs.contains("[2/2] Failed to process: b.mp3 - service_error: quota exceeded"));
    }

    #[test]
    fn test_arc_sink_forwards() {
        let counter = CompletionCounter::new();
        let shared: Arc<dyn ProgressSink> = Arc::new(counter.clone());
        shared.run_started(7);
        assert_eq!(counter.total(), 7);
    }
}

//! Bounded-concurrency batch processor.
//!
//! Requests are split into consecutive batches. Batches run one after the
//! other; inside a batch at most `concurrency` transcriber calls are in
//! flight. Each call's outcome is written into a slot reserved by input
//! index, so the result keeps input order no matter when calls finish.

use crate::batch::progress::{BatchStarted, NoProgress, ProgressSink, ProgressUpdate};
use crate::batch::types::{BatchEntry, BatchRunResult, TranscriptionRequest};
use crate::error::{BatchscribeError, Result};
use crate::stt::transcriber::{
    ErrorKind, Transcriber, TranscriptionConfig, TranscriptionFailure, TranscriptionOutcome,
    validate_audio,
};
use bytes::Bytes;
use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::ops::Range;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::{self, JoinError, JoinSet};

/// Split `len` items into consecutive index ranges of at most `batch_size`.
///
/// The last range may be shorter. Returns no ranges for `len == 0`.
///
/// # Panics
/// Panics if `batch_size` is zero.
pub fn partition_batches(len: usize, batch_size: usize) -> Vec<Range<usize>> {
    assert!(batch_size > 0, "batch_size must be at least 1");
    (0..len)
        .step_by(batch_size)
        .map(|start| start..(start + batch_size).min(len))
        .collect()
}

/// Number of batches needed for `len` items.
pub fn batch_count(len: usize, batch_size: usize) -> usize {
    len.div_ceil(batch_size.max(1))
}

/// Runs transcription requests through a shared [`Transcriber`].
///
/// Holds no per-run state; one processor can serve any number of runs.
pub struct BatchProcessor {
    transcriber: Arc<dyn Transcriber>,
    progress: Arc<dyn ProgressSink>,
    call_timeout: Option<Duration>,
    max_audio_bytes: Option<u64>,
}

/// Per-run bookkeeping, owned by the dispatcher.
struct RunState {
    slots: Vec<Option<TranscriptionOutcome>>,
    completed: usize,
}

impl BatchProcessor {
    pub fn new(transcriber: Arc<dyn Transcriber>) -> Self {
        Self {
            transcriber,
            progress: Arc::new(NoProgress),
            call_timeout: None,
            max_audio_bytes: None,
        }
    }

    /// Report progress to `sink`.
    pub fn with_progress(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.progress = sink;
        self
    }

    /// Abort any single call that takes longer than `timeout`.
    ///
    /// The call is recorded as a `timeout` failure and its slot is freed.
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = Some(timeout);
        self
    }

    /// Reject audio larger than `max` bytes before dispatch.
    pub fn with_max_audio_bytes(mut self, max: u64) -> Self {
        self.max_audio_bytes = Some(max);
        self
    }

    /// Transcribe every request and return one outcome per request.
    ///
    /// Item failures are recorded in the result; they never make the run
    /// fail.
    ///
    /// # Errors
    /// Returns an error only for misuse: `batch_size` or `concurrency` of
    /// zero, or a repeated identifier.
    pub async fn run(
        &self,
        requests: &[TranscriptionRequest],
        batch_size: usize,
        concurrency: usize,
    ) -> Result<BatchRunResult> {
        if batch_size == 0 {
            return Err(BatchscribeError::InvalidBatchSize);
        }
        if concurrency == 0 {
            return Err(BatchscribeError::InvalidConcurrency);
        }
        ensure_unique_identifiers(requests)?;
        if requests.is_empty() {
            return Ok(BatchRunResult::default());
        }

        let total = requests.len();
        let batches = partition_batches(total, batch_size);
        tracing::info!(
            model = self.transcriber.model_name(),
            "Starting batch processing of {} file(s) in {} batch(es) with {} concurrent workers",
            total,
            batches.len(),
            concurrency
        );

        let started = Instant::now();
        self.progress.run_started(total);
        let mut state = RunState {
            slots: (0..total).map(|_| None).collect(),
            completed: 0,
        };

        for (batch_index, range) in batches.iter().enumerate() {
            self.progress.batch_started(BatchStarted {
                batch_index,
                batch_count: batches.len(),
                size: range.len(),
            });
            self.run_batch(requests, range.clone(), concurrency, &mut state)
                .await;
        }

        let entries: Vec<BatchEntry> = requests
            .iter()
            .zip(state.slots)
            .map(|(request, slot)| BatchEntry {
                identifier: request.identifier.clone(),
                outcome: slot.unwrap_or_else(|| {
                    TranscriptionOutcome::failure(
                        ErrorKind::Internal,
                        "Transcription task did not report a result",
                    )
                }),
            })
            .collect();
        let result = BatchRunResult::from_entries(entries);

        self.progress.run_finished();
        tracing::info!(
            succeeded = result.success_count(),
            failed = result.failure_count(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Batch processing finished"
        );
        Ok(result)
    }

    /// Drain one batch, keeping at most `concurrency` calls in flight.
    async fn run_batch(
        &self,
        requests: &[TranscriptionRequest],
        range: Range<usize>,
        concurrency: usize,
        state: &mut RunState,
    ) {
        let mut pending = range;
        let mut in_flight: JoinSet<TranscriptionOutcome> = JoinSet::new();
        let mut task_index: HashMap<task::Id, usize> = HashMap::with_capacity(concurrency);

        loop {
            while in_flight.len() < concurrency {
                let Some(index) = pending.next() else {
                    break;
                };
                let request = &requests[index];
                if let Err(failure) = validate_audio(&request.audio, self.max_audio_bytes) {
                    self.record(state, requests, index, TranscriptionOutcome::Failure(failure));
                    continue;
                }
                let handle = in_flight.spawn(call_transcriber(
                    self.transcriber.clone(),
                    request.audio.clone(),
                    request.config,
                    self.call_timeout,
                ));
                task_index.insert(handle.id(), index);
            }

            // Empty set here means nothing is left to dispatch either.
            let (id, outcome) = match in_flight.join_next_with_id().await {
                Some(Ok((id, outcome))) => (id, outcome),
                Some(Err(e)) => (e.id(), join_error_outcome(e)),
                None => break,
            };
            match task_index.remove(&id) {
                Some(index) => self.record(state, requests, index, outcome),
                None => tracing::error!("Finished transcription task {id} has no request"),
            }
        }
    }

    fn record(
        &self,
        state: &mut RunState,
        requests: &[TranscriptionRequest],
        index: usize,
        outcome: TranscriptionOutcome,
    ) {
        let identifier = requests[index].identifier.as_str();
        if let Some(failure) = outcome.failure_info() {
            tracing::debug!(identifier, kind = %failure.kind, "{}", failure.message);
        }

        let total = state.slots.len();
        state.completed += 1;
        let outcome = state.slots[index].insert(outcome);
        self.progress.item_completed(&ProgressUpdate {
            identifier,
            outcome,
            completed: state.completed,
            total,
        });
    }
}

fn ensure_unique_identifiers(requests: &[TranscriptionRequest]) -> Result<()> {
    let mut seen = HashSet::with_capacity(requests.len());
    for request in requests {
        if !seen.insert(request.identifier.as_str()) {
            return Err(BatchscribeError::DuplicateIdentifier {
                identifier: request.identifier.clone(),
            });
        }
    }
    Ok(())
}

/// One worker: a single transcriber call, bounded by the optional timeout.
async fn call_transcriber(
    transcriber: Arc<dyn Transcriber>,
    audio: Bytes,
    config: TranscriptionConfig,
    timeout: Option<Duration>,
) -> TranscriptionOutcome {
    let call = transcriber.transcribe(audio, &config);
    let result = match timeout {
        Some(limit) => tokio::time::timeout(limit, call).await.unwrap_or_else(|_| {
            Err(TranscriptionFailure::new(
                ErrorKind::Timeout,
                format!("Transcription exceeded the {limit:?} timeout"),
            ))
        }),
        None => call.await,
    };
    TranscriptionOutcome::from(result)
}

/// A worker that panicked or was cancelled fails its own item only.
fn join_error_outcome(error: JoinError) -> TranscriptionOutcome {
    let message = if error.is_panic() {
        let panic = error.into_panic();
        format!("Transcription task panicked: {}", panic_message(&*panic))
    } else {
        format!("Transcription task did not complete: {error}")
    };
    tracing::error!("{message}");
    TranscriptionOutcome::failure(ErrorKind::Internal, message)
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&str>() {
        *message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.as_str()
    } else {
        "unknown panic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::progress::CompletionCounter;
    use crate::stt::transcriber::MockTranscriber;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn request(id: &str, audio: &[u8]) -> TranscriptionRequest {
        TranscriptionRequest::new(
            id,
            Bytes::copy_from_slice(audio),
            TranscriptionConfig::default(),
        )
    }

    fn processor(transcriber: impl Transcriber + 'static) -> BatchProcessor {
        BatchProcessor::new(Arc::new(transcriber))
    }

    /// Counts calls that actually reach the transcriber.
    struct CountingTranscriber {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Transcriber for CountingTranscriber {
        async fn transcribe(
            &self,
            audio: Bytes,
            _config: &TranscriptionConfig,
        ) -> std::result::Result<String, TranscriptionFailure> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(String::from_utf8_lossy(&audio).into_owned())
        }

        fn model_name(&self) -> &str {
            "counting"
        }
    }

    struct PanickingTranscriber;

    #[async_trait]
    impl Transcriber for PanickingTranscriber {
        async fn transcribe(
            &self,
            audio: Bytes,
            _config: &TranscriptionConfig,
        ) -> std::result::Result<String, TranscriptionFailure> {
            if audio == b"boom"[..] {
                panic!("decoder exploded");
            }
            Ok("fine".to_string())
        }

        fn model_name(&self) -> &str {
            "panicking"
        }
    }

    /// Remembers where each payload it receives lives in memory.
    #[derive(Default)]
    struct AddressRecorder {
        addresses: std::sync::Mutex<Vec<usize>>,
    }

    #[async_trait]
    impl Transcriber for AddressRecorder {
        async fn transcribe(
            &self,
            audio: Bytes,
            _config: &TranscriptionConfig,
        ) -> std::result::Result<String, TranscriptionFailure> {
            self.addresses.lock().unwrap().push(audio.as_ptr() as usize);
            Ok(String::new())
        }

        fn model_name(&self) -> &str {
            "address"
        }
    }

    #[test]
    fn test_partition_batches_sizes() {
        let sizes: Vec<usize> = partition_batches(23, 10).iter().map(|r| r.len()).collect();
        assert_eq!(sizes, vec![10, 10, 3]);
        assert_eq!(partition_batches(23, 10)[2], 20..23);
    }

    #[test]
    fn test_partition_batches_edges() {
        assert!(partition_batches(0, 5).is_empty());
        assert_eq!(partition_batches(3, 10), vec![0..3]);
        assert_eq!(partition_batches(3, 1), vec![0..1, 1..2, 2..3]);
    }

    #[test]
    fn test_batch_count() {
        assert_eq!(batch_count(0, 10), 0);
        assert_eq!(batch_count(10, 10), 1);
        assert_eq!(batch_count(11, 10), 2);
    }

    #[tokio::test]
    async fn test_zero_batch_size_is_rejected() {
        let result = processor(MockTranscriber::new("m"))
            .run(&[request("a", b"x")], 0, 1)
            .await;
        assert!(matches!(result, Err(BatchscribeError::InvalidBatchSize)));
    }

    #[tokio::test]
    async fn test_zero_concurrency_is_rejected() {
        let result = processor(MockTranscriber::new("m"))
            .run(&[request("a", b"x")], 1, 0)
            .await;
        assert!(matches!(result, Err(BatchscribeError::InvalidConcurrency)));
    }

    #[tokio::test]
    async fn test_duplicate_identifier_is_rejected() {
        let requests = [request("a.mp3", b"1"), request("a.mp3", b"2")];
        let result = processor(MockTranscriber::new("m"))
            .run(&requests, 10, 2)
            .await;
        assert!(matches!(
            result,
            Err(BatchscribeError::DuplicateIdentifier { identifier }) if identifier == "a.mp3"
        ));
    }

    #[tokio::test]
    async fn test_empty_input_returns_empty_result() {
        let result = processor(MockTranscriber::new("m"))
            .run(&[], 10, 10)
            .await
            .unwrap();
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_audio_never_reaches_transcriber() {
        let calls = Arc::new(AtomicUsize::new(0));
        let processor = BatchProcessor::new(Arc::new(CountingTranscriber {
            calls: calls.clone(),
        }))
        .with_max_audio_bytes(4);

        let requests = [
            request("empty", b""),
            request("ok", b"abc"),
            request("huge", b"abcdefgh"),
        ];
        let result = processor.run(&requests, 10, 10).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            result.get("empty").unwrap().failure_info().unwrap().kind,
            ErrorKind::InvalidInput
        );
        assert_eq!(
            result.get("huge").unwrap().failure_info().unwrap().kind,
            ErrorKind::InvalidInput
        );
        assert_eq!(result.get("ok").unwrap().transcript(), Some("abc"));
    }

    #[tokio::test]
    async fn test_call_timeout_records_timeout_failure() {
        let processor = processor(
            MockTranscriber::new("slow").with_delay(Duration::from_millis(500)),
        )
        .with_call_timeout(Duration::from_millis(20));

        let result = processor
            .run(&[request("slow.mp3", b"x")], 1, 1)
            .await
            .unwrap();
        let failure = result.get("slow.mp3").unwrap().failure_info().unwrap();
        assert_eq!(failure.kind, ErrorKind::Timeout);
    }

    #[tokio::test]
    async fn test_panic_is_isolated_to_its_item() {
        let requests = [
            request("a", b"ok"),
            request("b", b"boom"),
            request("c", b"ok"),
        ];
        let result = processor(PanickingTranscriber)
            .run(&requests, 3, 3)
            .await
            .unwrap();

        assert_eq!(result.success_count(), 2);
        let failure = result.get("b").unwrap().failure_info().unwrap();
        assert_eq!(failure.kind, ErrorKind::Internal);
        assert!(failure.message.contains("decoder exploded"));
    }

    #[tokio::test]
    async fn test_progress_counts_every_item() {
        let counter = CompletionCounter::new();
        let processor = processor(MockTranscriber::new("m").failing_on(b"bad"))
            .with_progress(Arc::new(counter.clone()));

        let requests = [
            request("a", b"1"),
            request("b", b"bad"),
            request("c", b""),
            request("d", b"4"),
        ];
        processor.run(&requests, 3, 2).await.unwrap();

        assert_eq!(counter.completed(), 4);
        assert_eq!(counter.total(), 4);
    }

    #[tokio::test]
    async fn test_transcriber_receives_shared_audio_buffer() {
        let recorder = Arc::new(AddressRecorder::default());
        let processor = BatchProcessor::new(recorder.clone());
        let requests = [request("a", b"first"), request("b", b"second")];

        processor.run(&requests, 2, 2).await.unwrap();

        let mut seen = recorder.addresses.lock().unwrap().clone();
        seen.sort_unstable();
        let mut expected: Vec<usize> = requests
            .iter()
            .map(|r| r.audio.as_ptr() as usize)
            .collect();
        expected.sort_unstable();
        assert_eq!(seen, expected);
    }

    #[tokio::test]
    async fn test_panicked_item_still_reports_progress() {
        let counter = CompletionCounter::new();
        let processor =
            processor(PanickingTranscriber).with_progress(Arc::new(counter.clone()));

        let requests = [request("a", b"boom"), request("b", b"ok")];
        let result = processor.run(&requests, 2, 2).await.unwrap();

        assert_eq!(counter.completed(), 2);
        assert_eq!(counter.total(), 2);
        assert_eq!(
            result.get("a").unwrap().failure_info().unwrap().kind,
            ErrorKind::Internal
        );
    }

    #[test]
    fn test_panic_message_variants() {
        let s: Box<dyn Any + Send> = Box::new("static");
        assert_eq!(panic_message(&*s), "static");
        let owned: Box<dyn Any + Send> = Box::new("owned".to_string());
        assert_eq!(panic_message(&*owned), "owned");
        let other: Box<dyn Any + Send> = Box::new(42u8);
        assert_eq!(panic_message(&*other), "unknown panic");
    }
}

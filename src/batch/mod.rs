//! Batch transcription engine.
//!
//! Fans requests out to a [`crate::stt::transcriber::Transcriber`] with a
//! fixed concurrency bound, batch by batch, and collects one outcome per
//! request in input order.

pub mod processor;
pub mod progress;
pub mod types;

pub use processor::{BatchProcessor, batch_count, partition_batches};
pub use progress::{
    BatchStarted, CompletionCounter, LogProgress, NoProgress, ProgressSink, ProgressUpdate,
};
pub use types::{BatchEntry, BatchRunResult, TranscriptionRequest};

//! batchscribe - Batch speech-to-text transcription
//!
//! Sends many audio files to a remote transcription API with bounded
//! concurrency and collects one outcome per file, in input order.

#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]

pub mod batch;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod defaults;
pub mod error;
pub mod input;
#[cfg(feature = "cli")]
pub mod logging;
pub mod output;
pub mod stt;

// Composition root - needs the HTTP client and the terminal layer
#[cfg(all(feature = "deepgram", feature = "cli"))]
pub mod app;

// Core traits (transcriber → processor → progress)
pub use batch::progress::ProgressSink;
pub use stt::transcriber::Transcriber;

// Batch engine
pub use batch::processor::BatchProcessor;
pub use batch::types::{BatchEntry, BatchRunResult, TranscriptionRequest};

// Transcription types
pub use stt::language::Language;
pub use stt::transcriber::{
    ErrorKind, MockTranscriber, TranscriptionConfig, TranscriptionFailure, TranscriptionOutcome,
};

#[cfg(feature = "deepgram")]
pub use stt::deepgram::{DeepgramOptions, DeepgramTranscriber};

// Error handling
pub use error::{BatchscribeError, Result};

// Config
pub use config::Config;

/// Build version string with optional git commit hash.
///
/// Returns `"0.1.0+abc1234"` when git hash is available, `"0.1.0"` otherwise.
pub fn version_string() -> String {
    let version = env!("CARGO_PKG_VERSION");
    match option_env!("GIT_HASH") {
        Some(hash) if !hash.is_empty() => format!("{}+{}", version, hash),
        _ => version.to_string(),
    }
}

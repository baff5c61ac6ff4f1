use crate::stt::language::Language;
use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Classification of a failed transcription call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Empty or oversized audio; never sent to the service.
    InvalidInput,
    /// The service rejected the credentials.
    AuthError,
    /// Network failure, connection reset, DNS failure.
    TransportError,
    /// The per-call timeout elapsed.
    Timeout,
    /// The service answered with a well-formed error.
    ServiceError,
    /// Success status but no transcript could be extracted.
    MalformedResponse,
    /// The worker running the call panicked or never reported back.
    Internal,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::AuthError => "auth_error",
            ErrorKind::TransportError => "transport_error",
            ErrorKind::Timeout => "timeout",
            ErrorKind::ServiceError => "service_error",
            ErrorKind::MalformedResponse => "malformed_response",
            ErrorKind::Internal => "internal",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified failure of a single transcription call.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{kind}: {message}")]
pub struct TranscriptionFailure {
    pub kind: ErrorKind,
    pub message: String,
}

impl TranscriptionFailure {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Language and formatting options shared by every call in a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptionConfig {
    pub language: Language,
    pub smart_format: bool,
    pub punctuate: bool,
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            language: Language::default(),
            smart_format: true,
            punctuate: true,
        }
    }
}

/// Final result of one request: a transcript or a classified failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TranscriptionOutcome {
    Success { transcript: String },
    Failure(TranscriptionFailure),
}

impl TranscriptionOutcome {
    pub fn success(transcript: impl Into<String>) -> Self {
        TranscriptionOutcome::Success {
            transcript: transcript.into(),
        }
    }

    pub fn failure(kind: ErrorKind, message: impl Into<String>) -> Self {
        TranscriptionOutcome::Failure(TranscriptionFailure::new(kind, message))
    }

    pub fn is_success(&self) -> bool {
        matches!(self, TranscriptionOutcome::Success { .. })
    }

    pub fn transcript(&self) -> Option<&str> {
        match self {
            TranscriptionOutcome::Success { transcript } => Some(transcript),
            TranscriptionOutcome::Failure(_) => None,
        }
    }

    pub fn failure_info(&self) -> Option<&TranscriptionFailure> {
        match self {
            TranscriptionOutcome::Success { .. } => None,
            TranscriptionOutcome::Failure(failure) => Some(failure),
        }
    }
}

impl From<std::result::Result<String, TranscriptionFailure>> for TranscriptionOutcome {
    fn from(result: std::result::Result<String, TranscriptionFailure>) -> Self {
        match result {
            Ok(transcript) => TranscriptionOutcome::Success { transcript },
            Err(failure) => TranscriptionOutcome::Failure(failure),
        }
    }
}

/// Check an audio payload before it is handed to a transcriber.
///
/// `max_bytes` of `None` disables the size limit.
pub fn validate_audio(
    audio: &[u8],
    max_bytes: Option<u64>,
) -> std::result::Result<(), TranscriptionFailure> {
    if audio.is_empty() {
        return Err(TranscriptionFailure::new(
            ErrorKind::InvalidInput,
            "Audio payload is empty",
        ));
    }
    if let Some(max) = max_bytes
        && audio.len() as u64 > max
    {
        return Err(TranscriptionFailure::new(
            ErrorKind::InvalidInput,
            format!(
                "Audio is too large ({:.2}MB). Max size is {:.2}MB.",
                audio.len() as f64 / (1024.0 * 1024.0),
                max as f64 / (1024.0 * 1024.0)
            ),
        ));
    }
    Ok(())
}

/// Trait for speech-to-text transcription.
///
/// One call per audio payload. Implementations hold no per-call state, so a
/// single instance is shared by every worker of a batch run.
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe one audio payload.
    ///
    /// # Arguments
    /// * `audio` - Encoded audio file contents (mp3, wav, ...). Cloning
    ///   `Bytes` is O(1), so the payload is shared, never copied.
    /// * `config` - Language and formatting options
    async fn transcribe(
        &self,
        audio: Bytes,
        config: &TranscriptionConfig,
    ) -> std::result::Result<String, TranscriptionFailure>;

    /// Name of the backend/model, for logging.
    fn model_name(&self) -> &str;
}

/// Implement Transcriber for Arc<T> to allow sharing across runs.
#[async_trait]
impl<T: Transcriber + ?Sized> Transcriber for Arc<T> {
    async fn transcribe(
        &self,
        audio: Bytes,
        config: &TranscriptionConfig,
    ) -> std::result::Result<String, TranscriptionFailure> {
        (**self).transcribe(audio, config).await
    }

    fn model_name(&self) -> &str {
        (**self).model_name()
    }
}

/// Mock transcriber for testing
#[derive(Debug, Clone)]
pub struct MockTranscriber {
    model_name: String,
    response: Option<String>,
    failure: Option<TranscriptionFailure>,
    fail_marker: Option<Vec<u8>>,
    delay: Option<Duration>,
}

impl MockTranscriber {
    /// Create a mock that echoes the audio bytes back as text.
    pub fn new(model_name: &str) -> Self {
        Self {
            model_name: model_name.to_string(),
            response: None,
            failure: None,
            fail_marker: None,
            delay: None,
        }
    }

    /// Return a fixed transcript instead of echoing the audio.
    pub fn with_response(mut self, response: &str) -> Self {
        self.response = Some(response.to_string());
        self
    }

    /// Fail every call with a `service_error`.
    pub fn with_failure(self) -> Self {
        self.with_failure_kind(ErrorKind::ServiceError)
    }

    /// Fail every call with the given kind.
    pub fn with_failure_kind(mut self, kind: ErrorKind) -> Self {
        self.failure = Some(TranscriptionFailure::new(kind, "mock transcription failure"));
        self
    }

    /// Fail only calls whose audio equals `marker`.
    pub fn failing_on(mut self, marker: &[u8]) -> Self {
        self.fail_marker = Some(marker.to_vec());
        self
    }

    /// Sleep before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[async_trait]
impl Transcriber for MockTranscriber {
    async fn transcribe(
        &self,
        audio: Bytes,
        _config: &TranscriptionConfig,
    ) -> std::result::Result<String, TranscriptionFailure> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(ref failure) = self.failure {
            return Err(failure.clone());
        }
        if self.fail_marker.as_deref() == Some(&audio[..]) {
            return Err(TranscriptionFailure::new(
                ErrorKind::ServiceError,
                "mock transcription failure",
            ));
        }
        Ok(match self.response {
            Some(ref response) => response.clone(),
            None => String::from_utf8_lossy(&audio).into_owned(),
        })
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

//! Deepgram pre-recorded transcription client.
//!
//! Sends the raw audio file to `POST /v1/listen` and extracts the first
//! alternative of the first channel. Every failure is classified into an
//! [`ErrorKind`] so the batch processor can record it per file.

use crate::defaults;
use crate::error::{BatchscribeError, Result};
use crate::stt::transcriber::{
    ErrorKind, Transcriber, TranscriptionConfig, TranscriptionFailure, validate_audio,
};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Url};
use serde::Deserialize;
use std::fmt;
use std::time::Duration;

/// Longest slice of an unparseable error body quoted in a failure message.
const ERROR_BODY_PREVIEW: usize = 200;

/// Connection settings for [`DeepgramTranscriber`].
#[derive(Clone)]
pub struct DeepgramOptions {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
}

impl DeepgramOptions {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: defaults::DEEPGRAM_BASE_URL.to_string(),
            model: defaults::DEEPGRAM_MODEL.to_string(),
            timeout: Duration::from_secs(defaults::TIMEOUT_SECS),
        }
    }
}

impl fmt::Debug for DeepgramOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeepgramOptions")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Transcriber backed by the Deepgram REST API.
pub struct DeepgramTranscriber {
    client: Client,
    listen_url: Url,
    api_key: String,
    model: String,
}

impl DeepgramTranscriber {
    /// Build a client. The API key is taken from `options` only.
    ///
    /// # Errors
    /// Returns an error if the base URL is invalid or the HTTP client cannot
    /// be constructed.
    pub fn new(options: DeepgramOptions) -> Result<Self> {
        let base = options.base_url.trim_end_matches('/');
        let listen_url =
            Url::parse(&format!("{base}/v1/listen")).map_err(|e| BatchscribeError::HttpClient {
                message: format!("Invalid base URL '{}': {e}", options.base_url),
            })?;

        let client = Client::builder()
            .timeout(options.timeout)
            .build()
            .map_err(|e| BatchscribeError::HttpClient {
                message: format!("Failed to create HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            listen_url,
            api_key: options.api_key,
            model: options.model,
        })
    }

    fn request_url(&self, config: &TranscriptionConfig) -> Url {
        let mut url = self.listen_url.clone();
        url.query_pairs_mut()
            .append_pair("model", &self.model)
            .append_pair("language", config.language.code())
            .append_pair("smart_format", bool_param(config.smart_format))
            .append_pair("punctuate", bool_param(config.punctuate));
        url
    }
}

#[async_trait]
impl Transcriber for DeepgramTranscriber {
    async fn transcribe(
        &self,
        audio: Bytes,
        config: &TranscriptionConfig,
    ) -> std::result::Result<String, TranscriptionFailure> {
        validate_audio(&audio, None)?;

        let url = self.request_url(config);
        tracing::debug!(%url, bytes = audio.len(), "sending transcription request");

        let response = self
            .client
            .post(url)
            .header(AUTHORIZATION, format!("Token {}", self.api_key))
            .header(CONTENT_TYPE, sniff_content_type(&audio))
            // `Bytes` hands the shared buffer to the body without copying.
            .body(audio)
            .send()
            .await
            .map_err(|e| classify_transport_error(&e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| classify_transport_error(&e))?;

        if !status.is_success() {
            return Err(classify_status(status.as_u16(), &body));
        }

        parse_transcript(&body)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

fn bool_param(value: bool) -> &'static str {
    if value { "true" } else { "false" }
}

/// Guess the MIME type of an encoded audio file from its magic bytes.
pub fn sniff_content_type(audio: &[u8]) -> &'static str {
    match audio {
        [b'I', b'D', b'3', ..] => "audio/mpeg",
        [0xFF, second, ..] if second & 0xE0 == 0xE0 => "audio/mpeg",
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'A', b'V', b'E', ..] => "audio/wav",
        [b'f', b'L', b'a', b'C', ..] => "audio/flac",
        [b'O', b'g', b'g', b'S', ..] => "audio/ogg",
        [_, _, _, _, b'f', b't', b'y', b'p', ..] => "audio/mp4",
        _ => "application/octet-stream",
    }
}

#[derive(Debug, Deserialize)]
struct ListenResponse {
    results: Option<ListenResults>,
}

#[derive(Debug, Deserialize)]
struct ListenResults {
    #[serde(default)]
    channels: Vec<Channel>,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(default)]
    alternatives: Vec<Alternative>,
}

#[derive(Debug, Deserialize)]
struct Alternative {
    transcript: String,
}

/// Extract the transcript from a successful response body.
pub fn parse_transcript(body: &str) -> std::result::Result<String, TranscriptionFailure> {
    let response: ListenResponse = serde_json::from_str(body).map_err(|e| {
        TranscriptionFailure::new(
            ErrorKind::MalformedResponse,
            format!("Failed to parse transcription response: {e}"),
        )
    })?;

    response
        .results
        .and_then(|results| results.channels.into_iter().next())
        .and_then(|channel| channel.alternatives.into_iter().next())
        .map(|alternative| alternative.transcript)
        .ok_or_else(|| {
            TranscriptionFailure::new(
                ErrorKind::MalformedResponse,
                "No transcription results returned from API",
            )
        })
}

/// Classify a non-2xx response.
pub fn classify_status(status: u16, body: &str) -> TranscriptionFailure {
    let detail = error_message(body).unwrap_or_else(|| {
        let preview: String = body.trim().chars().take(ERROR_BODY_PREVIEW).collect();
        if preview.is_empty() {
            format!("HTTP {status}")
        } else {
            format!("HTTP {status}: {preview}")
        }
    });

    match status {
        401 | 403 => TranscriptionFailure::new(
            ErrorKind::AuthError,
            format!("API authentication failed. Check your API key. ({detail})"),
        ),
        408 | 504 => TranscriptionFailure::new(
            ErrorKind::Timeout,
            format!("Request timeout. File may be too large or API is busy. ({detail})"),
        ),
        429 => TranscriptionFailure::new(
            ErrorKind::ServiceError,
            format!("Rate limit exceeded: {detail}"),
        ),
        _ => TranscriptionFailure::new(ErrorKind::ServiceError, detail),
    }
}

/// Pull a human-readable message out of a JSON error payload.
fn error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    ["err_msg", "message", "reason"]
        .iter()
        .find_map(|key| value.get(key).and_then(|v| v.as_str()))
        .map(str::to_string)
}

fn classify_transport_error(error: &reqwest::Error) -> TranscriptionFailure {
    if error.is_timeout() {
        TranscriptionFailure::new(
            ErrorKind::Timeout,
            format!("Request timeout. File may be too large or API is busy. ({error})"),
        )
    } else if error.is_connect() {
        TranscriptionFailure::new(
            ErrorKind::TransportError,
            format!("Connection failed: {error}"),
        )
    } else {
        TranscriptionFailure::new(ErrorKind::TransportError, format!("Request failed: {error}"))
    }
}

//! Speech-to-text clients.

#[cfg(feature = "deepgram")]
pub mod deepgram;
pub mod language;
pub mod transcriber;

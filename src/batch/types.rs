//! Request and result types for batch runs.

use crate::stt::transcriber::{TranscriptionConfig, TranscriptionFailure, TranscriptionOutcome};
use bytes::Bytes;
use serde::Serialize;

/// One audio payload to transcribe.
///
/// The audio is reference-counted `Bytes`, so handing a request to a worker
/// or to the HTTP body never copies it.
#[derive(Debug, Clone)]
pub struct TranscriptionRequest {
    /// Caller-chosen key, unique within a run (usually the file name).
    pub identifier: String,
    pub audio: Bytes,
    pub config: TranscriptionConfig,
}

impl TranscriptionRequest {
    pub fn new(
        identifier: impl Into<String>,
        audio: impl Into<Bytes>,
        config: TranscriptionConfig,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            audio: audio.into(),
            config,
        }
    }
}

/// Outcome of a single request, tagged with its identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchEntry {
    pub identifier: String,
    #[serde(flatten)]
    pub outcome: TranscriptionOutcome,
}

/// Every request's outcome, in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct BatchRunResult {
    entries: Vec<BatchEntry>,
}

impl BatchRunResult {
    pub(crate) fn from_entries(entries: Vec<BatchEntry>) -> Self {
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[BatchEntry] {
        &self.entries
    }

    pub fn iter(&self) -> std::slice::Iter<'_, BatchEntry> {
        self.entries.iter()
    }

    /// Outcome recorded for `identifier`, if it was part of the run.
    pub fn get(&self, identifier: &str) -> Option<&TranscriptionOutcome> {
        self.entries
            .iter()
            .find(|entry| entry.identifier == identifier)
            .map(|entry| &entry.outcome)
    }

    /// Successful entries as `(identifier, transcript)`, in input order.
    pub fn successes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().filter_map(|entry| {
            entry
                .outcome
                .transcript()
                .map(|transcript| (entry.identifier.as_str(), transcript))
        })
    }

    /// Failed entries as `(identifier, failure)`, in input order.
    pub fn failures(&self) -> impl Iterator<Item = (&str, &TranscriptionFailure)> {
        self.entries.iter().filter_map(|entry| {
            entry
                .outcome
                .failure_info()
                .map(|failure| (entry.identifier.as_str(), failure))
        })
    }

    pub fn success_count(&self) -> usize {
        self.successes().count()
    }

    pub fn failure_count(&self) -> usize {
        self.failures().count()
    }

    pub fn into_entries(self) -> Vec<BatchEntry> {
        self.entries
    }
}

impl<'a> IntoIterator for &'a BatchRunResult {
    type Item = &'a BatchEntry;
    type IntoIter = std::slice::Iter<'a, BatchEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

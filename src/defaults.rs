//! Default configuration constants for batchscribe.
//!
//! Shared by the config layer, the CLI and the batch processor so the
//! defaults only live in one place.

/// Number of files grouped into one batch.
///
/// A batch fully drains before the next one starts.
pub const BATCH_SIZE: usize = 10;

/// Maximum number of transcription calls in flight at once.
pub const CONCURRENCY: usize = 10;

/// Per-call timeout in seconds.
///
/// Long recordings can take minutes on the service side.
pub const TIMEOUT_SECS: u64 = 300;

/// Largest accepted audio payload in megabytes.
pub const MAX_AUDIO_MB: u64 = 2000;

/// Default language code for transcription.
pub const DEFAULT_LANGUAGE: &str = "en";

/// Default Deepgram API endpoint.
pub const DEEPGRAM_BASE_URL: &str = "https://api.deepgram.com";

/// Default Deepgram model.
pub const DEEPGRAM_MODEL: &str = "nova-3";

/// Default directory for written transcripts.
pub const OUTPUT_DIR: &str = "outputs";

/// File extension of written transcripts.
pub const TRANSCRIPT_EXTENSION: &str = "txt";

/// Audio file extensions picked up when scanning a directory.
pub const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "flac", "ogg", "m4a"];

/// Largest `max_audio_mb` whose byte count still fits in a `u64`.
pub const MAX_AUDIO_MB_LIMIT: u64 = u64::MAX / (1024 * 1024);

/// Convert a size in megabytes to bytes, saturating at `u64::MAX`.
pub const fn mb_to_bytes(mb: u64) -> u64 {
    mb.saturating_mul(1024 * 1024)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mb_to_bytes_converts() {
        assert_eq!(mb_to_bytes(1), 1_048_576);
        assert_eq!(mb_to_bytes(MAX_AUDIO_MB), 2_097_152_000);
    }

    #[test]
    fn mb_to_bytes_saturates() {
        assert_eq!(mb_to_bytes(u64::MAX), u64::MAX);
        assert_eq!(mb_to_bytes(MAX_AUDIO_MB_LIMIT + 1), u64::MAX);
    }
}

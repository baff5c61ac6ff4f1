//! Persisting and presenting batch results.
//!
//! Transcripts are written as one text file per successful request. The
//! terminal summary and progress bar are only built with the `cli` feature.

use crate::batch::types::BatchRunResult;
use crate::defaults;
use crate::error::{BatchscribeError, Result};
use serde::Serialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// A transcript that was written to disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WrittenTranscript {
    pub identifier: String,
    pub path: PathBuf,
}

/// Write one `.txt` file per successful entry into `dir`.
///
/// Files are named after the identifier's stem (`talk.mp3` → `talk.txt`).
/// When two stems collide the full identifier is used (`talk.wav.txt`).
/// Failed entries are skipped.
pub fn write_transcripts(result: &BatchRunResult, dir: &Path) -> Result<Vec<WrittenTranscript>> {
    fs::create_dir_all(dir).map_err(|e| BatchscribeError::Output {
        message: format!("Failed to create output directory {}: {e}", dir.display()),
    })?;

    let mut used = HashSet::new();
    let mut written = Vec::new();

    for (identifier, transcript) in result.successes() {
        let file_name = transcript_file_name(identifier, &mut used);
        let path = dir.join(file_name);
        fs::write(&path, transcript).map_err(|e| BatchscribeError::Output {
            message: format!("Failed to write {}: {e}", path.display()),
        })?;
        written.push(WrittenTranscript {
            identifier: identifier.to_string(),
            path,
        });
    }

    tracing::info!("Wrote {} transcript(s) to {}", written.len(), dir.display());
    Ok(written)
}

fn transcript_file_name(identifier: &str, used: &mut HashSet<String>) -> String {
    let ext = defaults::TRANSCRIPT_EXTENSION;
    let stem = Path::new(identifier)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| identifier.to_string());

    let mut candidates = vec![format!("{stem}.{ext}"), format!("{identifier}.{ext}")];
    let mut n = 2;
    loop {
        for candidate in candidates.drain(..) {
            if used.insert(candidate.clone()) {
                return candidate;
            }
        }
        candidates.push(format!("{identifier}-{n}.{ext}"));
        n += 1;
    }
}

/// Transcript files (`.txt`) directly inside `dir`, in name order.
fn transcript_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file()
            && path
                .extension()
                .is_some_and(|ext| ext == defaults::TRANSCRIPT_EXTENSION)
        {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Delete previously written transcripts (`.txt` files) from `dir`.
///
/// Other files are left alone. A missing directory counts as empty.
pub fn clear_transcripts(dir: &Path) -> Result<usize> {
    if !dir.is_dir() {
        return Ok(0);
    }

    let files = transcript_files(dir)?;
    for path in &files {
        fs::remove_file(path)?;
    }
    Ok(files.len())
}

/// Write the full result as pretty-printed JSON.
pub fn write_report(result: &BatchRunResult, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(result)?;
    fs::write(path, json)?;
    Ok(())
}

#[cfg(feature = "archive")]
pub use archive::{archive_name, archive_path, archive_transcripts};

#[cfg(feature = "archive")]
mod archive {
    use super::transcript_files;
    use crate::error::{BatchscribeError, Result};
    use std::fs::{self, File};
    use std::io;
    use std::path::{Path, PathBuf};
    use std::time::SystemTime;
    use zip::CompressionMethod;
    use zip::write::{SimpleFileOptions, ZipWriter};

    /// `transcriptions_<YYYY-MM-DD_HH-MM-SS>.zip` for `now` (UTC).
    pub fn archive_name(now: SystemTime) -> String {
        let stamp = humantime::format_rfc3339_seconds(now)
            .to_string()
            .trim_end_matches('Z')
            .replace('T', "_")
            .replace(':', "-");
        format!("transcriptions_{stamp}.zip")
    }

    /// Where to write the archive.
    ///
    /// No path means a timestamped name in the working directory; an
    /// existing directory gets a timestamped name inside it; anything else
    /// is used as the file path.
    pub fn archive_path(requested: Option<&Path>, now: SystemTime) -> PathBuf {
        match requested {
            None => PathBuf::from(archive_name(now)),
            Some(dir) if dir.is_dir() => dir.join(archive_name(now)),
            Some(path) => path.to_path_buf(),
        }
    }

    /// Pack every `.txt` file in `dir` into a deflated zip at `destination`.
    ///
    /// Entries are stored under their bare file names. Returns the number of
    /// files packed.
    ///
    /// # Errors
    /// Fails if `dir` is missing, holds no transcripts, or the archive
    /// cannot be written.
    pub fn archive_transcripts(dir: &Path, destination: &Path) -> Result<usize> {
        if !dir.is_dir() {
            return Err(archive_error(format!(
                "Input directory does not exist: {}",
                dir.display()
            )));
        }
        let files = transcript_files(dir)?;
        if files.is_empty() {
            return Err(archive_error(format!(
                "No .txt files found in {}",
                dir.display()
            )));
        }

        if let Some(parent) = destination.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        let mut zip = ZipWriter::new(File::create(destination)?);
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        for path in &files {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            zip.start_file(name, options)
                .map_err(|e| archive_error(e.to_string()))?;
            io::copy(&mut File::open(path)?, &mut zip)?;
        }
        zip.finish().map_err(|e| archive_error(e.to_string()))?;

        tracing::info!(
            "Packed {} transcript(s) into {}",
            files.len(),
            destination.display()
        );
        Ok(files.len())
    }

    fn archive_error(message: String) -> BatchscribeError {
        BatchscribeError::Output {
            message: format!("Failed to create archive: {message}"),
        }
    }
}

#[cfg(feature = "cli")]
pub use terminal::{BarProgress, render_summary};

#[cfg(feature = "cli")]
mod terminal {
    use super::WrittenTranscript;
    use crate::batch::progress::{BatchStarted, ProgressSink, ProgressUpdate};
    use crate::batch::types::BatchRunResult;
    use indicatif::{ProgressBar, ProgressStyle};
    use owo_colors::OwoColorize;

    /// Print the success/failure summary to stderr.
    pub fn render_summary(result: &BatchRunResult, written: &[WrittenTranscript]) {
        let succeeded = result.success_count();
        let failed = result.failure_count();

        if succeeded > 0 {
            eprintln!(
                "{}",
                format!("✓ Successfully transcribed {succeeded} file(s)").green()
            );
            for item in written {
                eprintln!("  {} → {}", item.identifier, item.path.display());
            }
        }

        if failed > 0 {
            eprintln!(
                "{}",
                format!("⚠ Failed to transcribe {failed} file(s)").yellow()
            );
            for (identifier, failure) in result.failures() {
                eprintln!("  {}: {}", identifier.bold(), failure);
            }
        }

        if succeeded == 0 {
            eprintln!("{}", "No files were successfully transcribed.".red());
        }
    }

    /// Terminal progress bar fed by the batch processor.
    pub struct BarProgress {
        bar: ProgressBar,
    }

    impl BarProgress {
        pub fn new() -> Self {
            let bar = ProgressBar::new(0);
            bar.set_style(
                // SAFETY: hardcoded template string, always valid
                #[allow(clippy::expect_used)]
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg} ({elapsed})")
                    .expect("hardcoded progress bar template")
                    .progress_chars("#>-"),
            );
            Self { bar }
        }

        /// A bar that draws nothing (quiet mode).
        pub fn hidden() -> Self {
            Self {
                bar: ProgressBar::hidden(),
            }
        }
    }

    impl Default for BarProgress {
        fn default() -> Self {
            Self::new()
        }
    }

    impl ProgressSink for BarProgress {
        fn run_started(&self, total: usize) {
            self.bar.set_length(total as u64);
            self.bar.set_position(0);
        }

        fn batch_started(&self, batch: BatchStarted) {
            self.bar.set_message(format!(
                "batch {}/{} ({} files)",
                batch.batch_index + 1,
                batch.batch_count,
                batch.size
            ));
        }

        fn item_completed(&self, update: &ProgressUpdate<'_>) {
            if let Some(failure) = update.outcome.failure_info() {
                self.bar
                    .println(format!("✗ {}: {}", update.identifier, failure));
            }
            self.bar.set_position(update.completed as u64);
        }

        fn run_finished(&self) {
            self.bar.finish_and_clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::types::BatchEntry;
    use crate::stt::transcriber::{ErrorKind, TranscriptionOutcome};
    use tempfile::TempDir;

    fn entry(identifier: &str, outcome: TranscriptionOutcome) -> BatchEntry {
        BatchEntry {
            identifier: identifier.to_string(),
            outcome,
        }
    }

    fn sample() -> BatchRunResult {
        BatchRunResult::from_entries(vec![
            entry("talk.mp3", TranscriptionOutcome::success("hello")),
            entry(
                "broken.mp3",
                TranscriptionOutcome::failure(ErrorKind::ServiceError, "bad audio"),
            ),
            entry("talk.wav", TranscriptionOutcome::success("again")),
        ])
    }

    #[test]
    fn test_write_transcripts_names_and_contents() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("outputs");

        let written = write_transcripts(&sample(), &out).unwrap();

        assert_eq!(written.len(), 2);
        assert_eq!(written[0].identifier, "talk.mp3");
        assert_eq!(written[0].path, out.join("talk.txt"));
        assert_eq!(written[1].path, out.join("talk.wav.txt"));
        assert_eq!(fs::read_to_string(out.join("talk.txt")).unwrap(), "hello");
        assert_eq!(fs::read_to_string(out.join("talk.wav.txt")).unwrap(), "again");
        assert!(!out.join("broken.txt").exists());
    }

    #[test]
    fn test_transcript_file_name_falls_back_to_counter() {
        let mut used = HashSet::new();
        used.insert("a.txt".to_string());
        used.insert("a.mp3.txt".to_string());
        assert_eq!(transcript_file_name("a.mp3", &mut used), "a.mp3-2.txt");
    }

    #[test]
    fn test_clear_transcripts_only_removes_txt() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.txt"), "x").unwrap();
        fs::write(dir.path().join("b.txt"), "y").unwrap();
        fs::write(dir.path().join("keep.mp3"), "z").unwrap();

        assert_eq!(clear_transcripts(dir.path()).unwrap(), 2);
        assert!(dir.path().join("keep.mp3").exists());
        assert!(!dir.path().join("a.txt").exists());
    }

    #[test]
    fn test_clear_transcripts_missing_dir() {
        assert_eq!(
            clear_transcripts(Path::new("/nonexistent/batchscribe/out")).unwrap(),
            0
        );
    }

    #[test]
    fn test_write_report_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("report.json");

        write_report(&sample(), &path).unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json.as_array().unwrap().len(), 3);
        assert_eq!(json[1]["identifier"], "broken.mp3");
        assert_eq!(json[1]["kind"], "service_error");
    }

    #[cfg(feature = "archive")]
    #[test]
    fn test_archive_packs_only_transcripts_flat() {
        use std::io::Read;

        let dir = TempDir::new().unwrap();
        let out = dir.path().join("outputs");
        write_transcripts(&sample(), &out).unwrap();
        fs::write(out.join("notes.md"), "skip").unwrap();
        let zip_path = dir.path().join("bundle").join("all.zip");

        assert_eq!(archive_transcripts(&out, &zip_path).unwrap(), 2);

        let mut archive = zip::ZipArchive::new(fs::File::open(&zip_path).unwrap()).unwrap();
        let mut names: Vec<String> = archive.file_names().map(str::to_string).collect();
        names.sort();
        assert_eq!(names, vec!["talk.txt", "talk.wav.txt"]);

        let mut entry = archive.by_name("talk.txt").unwrap();
        assert_eq!(entry.compression(), zip::CompressionMethod::Deflated);
        let mut text = String::new();
        entry.read_to_string(&mut text).unwrap();
        assert_eq!(text, "hello");
    }

    #[cfg(feature = "archive")]
    #[test]
    fn test_archive_without_transcripts_fails() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("keep.mp3"), "z").unwrap();
        let zip_path = dir.path().join("empty.zip");

        match archive_transcripts(dir.path(), &zip_path) {
            Err(BatchscribeError::Output { message }) => {
                assert!(message.contains("No .txt files found"))
            }
            other => panic!("expected Output error, got {other:?}"),
        }
        assert!(!zip_path.exists());
    }

    #[cfg(feature = "archive")]
    #[test]
    fn test_archive_name_and_path() {
        use std::time::{Duration, SystemTime};

        let now = SystemTime::UNIX_EPOCH + Duration::from_secs(1_000_000_000);
        let name = "transcriptions_2001-09-09_01-46-40.zip";
        assert_eq!(archive_name(now), name);
        assert_eq!(archive_path(None, now), PathBuf::from(name));

        let dir = TempDir::new().unwrap();
        assert_eq!(archive_path(Some(dir.path()), now), dir.path().join(name));
        let explicit = dir.path().join("mine.zip");
        assert_eq!(archive_path(Some(&explicit), now), explicit);
    }

    #[cfg(feature = "cli")]
    #[test]
    fn test_hidden_bar_accepts_updates() {
        use crate::batch::progress::{ProgressSink, ProgressUpdate};

        let bar = BarProgress::hidden();
        let outcome = TranscriptionOutcome::success("x");
        bar.run_started(1);
        bar.item_completed(&ProgressUpdate {
            identifier: "a",
            outcome: &outcome,
            completed: 1,
            total: 1,
        });
        bar.run_finished();
    }
}

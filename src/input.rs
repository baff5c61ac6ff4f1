//! Collects audio files from the command line and turns them into requests.

use crate::batch::types::TranscriptionRequest;
use crate::defaults;
use crate::error::{BatchscribeError, Result};
use crate::stt::transcriber::TranscriptionConfig;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Whether `path` has one of the supported audio extensions.
pub fn is_supported_audio(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            defaults::AUDIO_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

/// Expand files and directories into a list of audio files.
///
/// Directories are scanned non-recursively and contribute their supported
/// files in name order. Explicit files must have a supported extension.
/// A file named twice is kept once, at its first position.
pub fn collect_audio_files(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut seen = HashSet::new();

    for path in paths {
        let metadata = fs::metadata(path).map_err(|e| input_error(path, e.to_string()))?;

        let found = if metadata.is_dir() {
            let mut entries: Vec<PathBuf> = fs::read_dir(path)
                .map_err(|e| input_error(path, e.to_string()))?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|p| p.is_file() && is_supported_audio(p))
                .collect();
            entries.sort();
            entries
        } else if is_supported_audio(path) {
            vec![path.clone()]
        } else {
            return Err(input_error(
                path,
                format!(
                    "unsupported file type (expected one of: {})",
                    defaults::AUDIO_EXTENSIONS.join(", ")
                ),
            ));
        };

        for file in found {
            let key = fs::canonicalize(&file).unwrap_or_else(|_| file.clone());
            if seen.insert(key) {
                files.push(file);
            }
        }
    }

    Ok(files)
}

/// Read each file into a request.
///
/// The identifier is the file name; a name that repeats gets a numeric
/// suffix (`talk.mp3`, `talk-2.mp3`). Files larger than `max_bytes` are
/// rejected before anything is read.
pub fn load_requests(
    files: &[PathBuf],
    config: TranscriptionConfig,
    max_bytes: u64,
) -> Result<Vec<TranscriptionRequest>> {
    let mut used = HashSet::new();
    let mut requests = Vec::with_capacity(files.len());

    for path in files {
        let size = fs::metadata(path)
            .map_err(|e| input_error(path, e.to_string()))?
            .len();
        if size > max_bytes {
            return Err(input_error(
                path,
                format!(
                    "file is too large ({:.2}MB). Max size is {:.2}MB.",
                    size as f64 / (1024.0 * 1024.0),
                    max_bytes as f64 / (1024.0 * 1024.0)
                ),
            ));
        }

        let audio = fs::read(path).map_err(|e| input_error(path, e.to_string()))?;
        let identifier = unique_identifier(path, &mut used);
        requests.push(TranscriptionRequest::new(identifier, audio, config));
    }

    Ok(requests)
}

fn unique_identifier(path: &Path, used: &mut HashSet<String>) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    if used.insert(name.clone()) {
        return name;
    }

    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| name.clone());
    let ext = path.extension().map(|e| e.to_string_lossy().into_owned());

    let mut n = 2;
    loop {
        let candidate = match ext {
            Some(ref ext) => format!("{stem}-{n}.{ext}"),
            None => format!("{stem}-{n}"),
        };
        if used.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}

fn input_error(path: &Path, message: impl Into<String>) -> BatchscribeError {
    BatchscribeError::Input {
        path: path.display().to_string(),
        message: message.into(),
    }
}

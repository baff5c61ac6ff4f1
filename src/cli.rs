//! Command-line interface for batchscribe
//!
//! Provides argument parsing using clap derive macros.

use crate::stt::language::Language;
use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;
use std::time::Duration;

/// Batch transcription of audio files
#[derive(Parser, Debug)]
#[command(
    name = "batchscribe",
    version,
    about = "Batch transcription of audio files through a remote speech-to-text API"
)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Suppress output (quiet mode)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose output (-v: per-file log lines, -vv: request diagnostics)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Transcribe audio files (or every audio file in the given directories)
    Transcribe(TranscribeArgs),

    /// List supported languages
    Languages,

    /// Inspect configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

/// Options for `batchscribe transcribe`. Unset options fall back to the config file.
#[derive(Args, Debug)]
pub struct TranscribeArgs {
    /// Audio files or directories (mp3, wav, flac, ogg, m4a)
    #[arg(required = true, value_name = "PATH")]
    pub paths: Vec<PathBuf>,

    /// Language of the audio. Examples: en, pl, es, fr, de
    #[arg(long, short = 'l', value_name = "LANG", value_parser = parse_language)]
    pub language: Option<Language>,

    /// Disable smart formatting
    #[arg(long)]
    pub no_smart_format: bool,

    /// Disable punctuation
    #[arg(long)]
    pub no_punctuate: bool,

    /// Files per batch (a batch finishes before the next starts)
    #[arg(long, short = 'b', value_name = "N", value_parser = parse_positive)]
    pub batch_size: Option<usize>,

    /// Maximum concurrent requests within a batch
    #[arg(long, short = 'j', value_name = "N", value_parser = parse_positive)]
    pub concurrency: Option<usize>,

    /// Per-file request timeout. Examples: 90, 90s, 5m
    #[arg(long, short = 't', value_name = "DURATION", value_parser = parse_timeout)]
    pub timeout: Option<Duration>,

    /// Transcription model
    #[arg(long, value_name = "MODEL")]
    pub model: Option<String>,

    /// Directory for transcript files
    #[arg(long, short = 'o', value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Also write the full result as JSON to this path
    #[arg(long, value_name = "PATH")]
    pub report: Option<PathBuf>,

    /// Delete existing .txt transcripts in the output directory first
    #[arg(long)]
    pub clean: bool,

    /// Zip the transcripts when done. Without a value the archive is named
    /// `transcriptions_<timestamp>.zip` in the current directory; a
    /// directory value gets that name inside it.
    #[arg(long, value_name = "PATH", num_args = 0..=1, require_equals = true)]
    pub archive: Option<Option<PathBuf>>,
}

/// Config subcommands
#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum ConfigAction {
    /// Print the config file location
    Path,
    /// Print the effective configuration (API key redacted)
    Show,
}

fn parse_language(s: &str) -> Result<Language, String> {
    s.parse().map_err(|e: crate::error::BatchscribeError| e.to_string())
}

fn parse_positive(s: &str) -> Result<usize, String> {
    match s.trim().parse::<usize>() {
        Ok(0) => Err("must be at least 1".to_string()),
        Ok(n) => Ok(n),
        Err(e) => Err(e.to_string()),
    }
}

/// Parse a timeout into a duration.
///
/// Bare numbers are seconds; anything else goes through `humantime`
/// (`30s`, `5m`, `1m30s`). Zero is rejected.
fn parse_timeout(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    let duration = match s.parse::<u64>() {
        Ok(secs) => Duration::from_secs(secs),
        Err(_) => humantime::parse_duration(s).map_err(|e| e.to_string())?,
    };
    if duration.is_zero() {
        return Err("timeout must be greater than zero".to_string());
    }
    Ok(duration)
}

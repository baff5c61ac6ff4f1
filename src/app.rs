//! Application entry points wiring config, input, the batch processor and output.

use crate::batch::processor::{BatchProcessor, batch_count};
use crate::batch::progress::{LogProgress, NoProgress, ProgressSink};
use crate::batch::types::BatchRunResult;
use crate::cli::TranscribeArgs;
use crate::config::Config;
use crate::error::{BatchscribeError, Result};
use crate::input::{collect_audio_files, load_requests};
use crate::output::{
    BarProgress, archive_path, archive_transcripts, clear_transcripts, render_summary,
    write_report, write_transcripts,
};
use crate::stt::deepgram::{DeepgramOptions, DeepgramTranscriber};
use crate::stt::language::Language;
use crate::stt::transcriber::Transcriber;
use std::io::IsTerminal;
use std::sync::Arc;
use std::time::SystemTime;

/// Run `batchscribe transcribe`: collect files → transcribe in batches → write transcripts.
///
/// # Arguments
/// * `config` - Base configuration (overridden by CLI args)
/// * `args` - Transcribe options from the command line
/// * `quiet` - Suppress status messages and the progress bar
/// * `verbosity` - 0 = progress bar, 1+ = per-file log lines
///
/// # Returns
/// The batch result, or an error if setup fails or no file was transcribed.
pub async fn run_transcribe_command(
    mut config: Config,
    args: TranscribeArgs,
    quiet: bool,
    verbosity: u8,
) -> Result<BatchRunResult> {
    apply_overrides(&mut config, &args);
    config.validate()?;

    let transcriber = create_transcriber(&config)?;

    let files = collect_audio_files(&args.paths)?;
    if files.is_empty() {
        return Err(BatchscribeError::Other(
            "No audio files found in the given paths".to_string(),
        ));
    }
    let requests = load_requests(
        &files,
        config.transcription_config(),
        config.max_audio_bytes(),
    )?;

    let batch_size = config.batch.batch_size;
    let concurrency = config.batch.concurrency;
    if !quiet {
        eprintln!("{}", plan_message(requests.len(), batch_size));
    }

    if args.clean {
        let removed = clear_transcripts(&config.output.dir)?;
        if !quiet && removed > 0 {
            eprintln!(
                "Removed {removed} old transcript(s) from {}",
                config.output.dir.display()
            );
        }
    }

    let processor = BatchProcessor::new(transcriber)
        .with_progress(progress_sink(quiet, verbosity))
        .with_call_timeout(config.timeout())
        .with_max_audio_bytes(config.max_audio_bytes());

    let result = processor.run(&requests, batch_size, concurrency).await?;

    let written = write_transcripts(&result, &config.output.dir)?;
    if let Some(report) = &args.report {
        write_report(&result, report)?;
        if !quiet {
            eprintln!("Report written to {}", report.display());
        }
    }

    if let Some(requested) = &args.archive {
        let path = archive_path(requested.as_deref(), SystemTime::now());
        let packed = archive_transcripts(&config.output.dir, &path)?;
        if !quiet {
            eprintln!("Archived {packed} transcript(s) to {}", path.display());
        }
    }

    if !quiet {
        render_summary(&result, &written);
    }

    if result.success_count() == 0 {
        return Err(BatchscribeError::Other(
            "No files were successfully transcribed".to_string(),
        ));
    }
    Ok(result)
}

/// Print supported languages, one `code  name` pair per line.
pub fn list_languages() {
    for language in Language::ALL {
        println!("{:<4}{}", language.code(), language.name());
    }
}

fn apply_overrides(config: &mut Config, args: &TranscribeArgs) {
    if let Some(language) = args.language {
        config.transcription.language = language;
    }
    if args.no_smart_format {
        config.transcription.smart_format = false;
    }
    if args.no_punctuate {
        config.transcription.punctuate = false;
    }
    if let Some(n) = args.batch_size {
        config.batch.batch_size = n;
    }
    if let Some(n) = args.concurrency {
        config.batch.concurrency = n;
    }
    if let Some(timeout) = args.timeout {
        config.api.timeout_secs = timeout.as_secs().max(1);
    }
    if let Some(model) = &args.model {
        config.api.model = model.clone();
    }
    if let Some(dir) = &args.output {
        config.output.dir = dir.clone();
    }
}

fn create_transcriber(config: &Config) -> Result<Arc<dyn Transcriber>> {
    let options = DeepgramOptions {
        api_key: config.api_key()?.to_string(),
        base_url: config.api.base_url.clone(),
        model: config.api.model.clone(),
        timeout: config.timeout(),
    };
    tracing::debug!(?options, "creating transcription client");
    Ok(Arc::new(DeepgramTranscriber::new(options)?))
}

/// How per-file progress is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ProgressMode {
    Silent,
    Log,
    Bar,
}

/// `-v` asks for log lines. Otherwise the bar needs a terminal; piped
/// stderr gets only the plan and the summary.
fn progress_mode(quiet: bool, verbosity: u8, stderr_is_terminal: bool) -> ProgressMode {
    match (quiet, verbosity, stderr_is_terminal) {
        (true, _, _) => ProgressMode::Silent,
        (false, 1.., _) => ProgressMode::Log,
        (false, 0, true) => ProgressMode::Bar,
        (false, 0, false) => ProgressMode::Silent,
    }
}

fn progress_sink(quiet: bool, verbosity: u8) -> Arc<dyn ProgressSink> {
    match progress_mode(quiet, verbosity, std::io::stderr().is_terminal()) {
        ProgressMode::Silent => Arc::new(NoProgress),
        ProgressMode::Log => Arc::new(LogProgress),
        ProgressMode::Bar => Arc::new(BarProgress::new()),
    }
}

fn plan_message(files: usize, batch_size: usize) -> String {
    format!(
        "{files} file(s) ready to transcribe in {} batch(es) of up to {batch_size} files each",
        batch_count(files, batch_size)
    )
}

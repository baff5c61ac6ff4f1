use anyhow::Result;
use batchscribe::app::{list_languages, run_transcribe_command};
use batchscribe::cli::{Cli, Commands, ConfigAction};
use batchscribe::config::Config;
use batchscribe::logging::init_logging;
use clap::{CommandFactory, Parser};
use std::path::{Path, PathBuf};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.quiet, cli.verbose);
    tracing::debug!("batchscribe {}", batchscribe::version_string());

    match cli.command {
        Commands::Transcribe(args) => {
            let config = load_config(cli.config.as_deref())?;
            run_transcribe_command(config, args, cli.quiet, cli.verbose).await?;
        }
        Commands::Languages => list_languages(),
        Commands::Config { action } => {
            handle_config_command(action, cli.config.as_deref())?;
        }
        Commands::Completions { shell } => {
            clap_complete::generate(
                shell,
                &mut Cli::command(),
                "batchscribe",
                &mut std::io::stdout(),
            );
        }
    }

    Ok(())
}

/// Load configuration from file or use defaults.
///
/// Priority order:
/// 1. Custom config path from CLI (--config), which must exist
/// 2. Default config path (~/.config/batchscribe/config.toml)
/// 3. Built-in defaults
///
/// Environment variable overrides are applied last.
fn load_config(custom_path: Option<&Path>) -> Result<Config> {
    let config = match custom_path {
        Some(path) => Config::load(path)?,
        None => match Config::default_path() {
            Some(path) => Config::load_or_default(&path)?,
            None => Config::default(),
        },
    };

    Ok(config.with_env_overrides()?)
}

fn handle_config_command(action: ConfigAction, custom_path: Option<&Path>) -> Result<()> {
    let config_path: Option<PathBuf> = custom_path
        .map(Path::to_path_buf)
        .or_else(Config::default_path);

    match action {
        ConfigAction::Path => match config_path {
            Some(path) => println!("{}", path.display()),
            None => anyhow::bail!("Could not determine a configuration directory"),
        },
        ConfigAction::Show => {
            let config = load_config(custom_path)?;
            print!("{}", config.to_redacted_toml()?);
        }
    }
    Ok(())
}

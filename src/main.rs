//! Haydee Outfit Generator - command-line entry point.
//!
//! # Execution Flow
//!
//! 1. Load `settings.yaml` (plus environment overrides) from the config directory
//! 2. Initialize logging -> `<config dir>/logs/haydee-outfit-gen.<date>`
//! 3. For `build` / `assemble`: snapshot the settings, create the tokio runtime,
//!    submit one operation and print its events as they arrive
//! 4. Log the metrics summary and exit non-zero if the operation failed
//!
//! The transcode and restyle capabilities are external programs configured
//! under `tools:` in the settings file.

use anyhow::{Context, Result};
use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};
use haydee_outfit_gen::models::Settings;
use haydee_outfit_gen::pipeline::LogLevel;
use haydee_outfit_gen::services::{CommandRestyler, CommandTranscoder};
use haydee_outfit_gen::{
    APP_NAME, ConfigManager, MultiModGroup, OperationOutcome, OperationRequest, PipelineEvent,
    PipelineOrchestrator, Resolution, VERSION,
};
use std::process::ExitCode;
use std::sync::Arc;

/// Generate and combine AI-restyled outfit mods for Haydee
#[derive(Parser)]
#[command(name = "haydee-outfit-gen")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Also log to the console, at debug level
    #[arg(short, long)]
    verbose: bool,

    /// Directory holding settings.yaml and logs
    #[arg(long, global = true)]
    config_dir: Option<Utf8PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a new outfit mod from a style description
    Build {
        /// Mod name, also the folder name under Outfits
        #[arg(short, long)]
        name: String,

        /// Style description sent to the image generator
        #[arg(short, long)]
        style: String,

        /// Override the configured texture resolution (2K or 4K)
        #[arg(short, long)]
        resolution: Option<Resolution>,

        /// Override the configured author name
        #[arg(short, long)]
        author: Option<String>,
    },

    /// Combine existing mods into one slot-selectable multi-mod
    Assemble {
        /// Name of the combined mod
        #[arg(short, long)]
        name: String,

        /// Slot category shown in game
        #[arg(short, long)]
        category: String,

        /// Source mods in slot order, comma separated
        #[arg(short, long, value_delimiter = ',', required = true)]
        sources: Vec<String>,

        /// Remove the source mods once the multi-mod is written
        #[arg(long)]
        delete_sources: bool,
    },

    /// Show or change saved settings
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
}

#[derive(Subcommand)]
enum SettingsAction {
    /// Print the current settings
    Show,
    /// Update saved settings
    Set {
        #[arg(long)]
        api_key: Option<String>,

        /// Haydee install directory
        #[arg(long)]
        game_path: Option<Utf8PathBuf>,

        #[arg(long)]
        author: Option<String>,

        #[arg(long)]
        resolution: Option<Resolution>,
    },
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let config_dir = match cli.config_dir {
        Some(dir) => dir,
        None => ConfigManager::default_dir()?,
    };
    let config_manager = ConfigManager::new(&config_dir)?;
    let mut settings = config_manager.load_settings()?;

    let _guard = haydee_outfit_gen::logging::setup_logging_with_console(
        &config_manager.log_dir(),
        APP_NAME,
        settings.debug_mode || cli.verbose,
        cli.verbose,
    )?;
    tracing::info!("Starting {} v{}", APP_NAME, VERSION);

    match cli.command {
        Commands::Settings { action } => {
            run_settings(&config_manager, &mut settings, action)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Build {
            name,
            style,
            resolution,
            author,
        } => {
            if let Some(resolution) = resolution {
                settings.image_resolution = resolution;
            }
            if let Some(author) = author {
                settings.author_name = author;
            }
            run_operation(&settings, OperationRequest::build(name, style))
        }
        Commands::Assemble {
            name,
            category,
            sources,
            delete_sources,
        } => {
            let group = MultiModGroup::new(name, category, sources).deleting_sources(delete_sources);
            run_operation(&settings, OperationRequest::Assemble(group))
        }
    }
}

fn run_settings(config_manager: &ConfigManager, settings: &mut Settings, action: SettingsAction) -> Result<()> {
    match action {
        SettingsAction::Show => {
            let mut shown = settings.clone();
            if !shown.gemini_api_key.is_empty() {
                shown.gemini_api_key = "********".to_string();
            }
            println!("# {}", config_manager.settings_path());
            print!(
                "{}",
                serde_yaml_ng::to_string(&shown).context("Failed to serialize settings")?
            );
        }
        SettingsAction::Set {
            api_key,
            game_path,
            author,
            resolution,
        } => {
            if let Some(api_key) = api_key {
                settings.gemini_api_key = api_key;
            }
            if let Some(game_path) = game_path {
                settings.haydee_path = game_path.into_string();
            }
            if let Some(author) = author {
                settings.author_name = author;
            }
            if let Some(resolution) = resolution {
                settings.image_resolution = resolution;
            }
            config_manager.save_settings(settings)?;
            println!("Settings saved to {}", config_manager.settings_path());
        }
    }
    Ok(())
}

fn run_operation(settings: &Settings, request: OperationRequest) -> Result<ExitCode> {
    let config = match settings.snapshot() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err}. Run `haydee-outfit-gen settings set` first.");
            return Ok(ExitCode::FAILURE);
        }
    };

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .worker_threads(2)
        .thread_name("outfit-gen-worker")
        .build()
        .context("Failed to create tokio runtime")?;

    let orchestrator = PipelineOrchestrator::new(
        Arc::new(CommandTranscoder::new(settings.tools.transcoder.clone())),
        Arc::new(CommandRestyler::new(
            settings.tools.restyler.clone(),
            config.api_key.clone(),
        )),
    );
    let metrics = orchestrator.metrics();

    let outcome = runtime.block_on(async {
        let mut handle = orchestrator.submit(config, request)?;
        while let Some(event) = handle.next_event().await {
            print_event(&event);
            if matches!(event, PipelineEvent::Finished(_)) {
                break;
            }
        }
        Ok::<_, haydee_outfit_gen::PipelineError>(handle.wait().await)
    })?;

    runtime.shutdown_timeout(std::time::Duration::from_secs(5));
    metrics.log_summary();

    Ok(match outcome {
        OperationOutcome::Failed(_) => ExitCode::FAILURE,
        _ => ExitCode::SUCCESS,
    })
}

fn print_event(event: &PipelineEvent) {
    match event {
        PipelineEvent::Started { operation } => println!("{operation}"),
        PipelineEvent::Step { index, total, label } => println!("[{index}/{total}] {label}"),
        PipelineEvent::Log { level: LogLevel::Error, message } => eprintln!("error: {message}"),
        PipelineEvent::Log { message, .. } => println!("{message}"),
        PipelineEvent::Warning(warning) => eprintln!("warning: {warning}"),
        // The cause was already printed as an error log line
        PipelineEvent::Finished(OperationOutcome::Failed(failure)) if failure.retryable => {
            eprintln!("This request can be retried later.")
        }
        PipelineEvent::Finished(OperationOutcome::Failed(_)) => {}
        PipelineEvent::Finished(outcome) => println!("{}", outcome.summary()),
    }
}

mod cli;
mod config;
mod domain;
mod infra;
mod logging;
mod media;
mod workflows;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::info;

use cli::Cli;
use config::{resolve_config_path, RawConfig};
use media::identity::FilenameIdentifier;
use workflows::intake::{Intake, IntakeEvent};
use workflows::placement::{PlacementEngine, TracingReporter};

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config_path = resolve_config_path(cli.config.as_deref());
    let raw_config = RawConfig::from_path(&config_path)?;

    // Held until exit so buffered log lines reach the file.
    let _log_guard = logging::init_logging(cli.verbose, raw_config.log_file())?;
    info!("Using config file {}", config_path.display());

    let config = raw_config.validate()?;
    if let Some(log_file) = &config.log_file {
        info!("Logging to {}", log_file.display());
    }

    if !config.source_dir.is_dir() {
        bail!("Source path {} does not exist", config.source_dir.display());
    }

    let engine = PlacementEngine::new(
        &config,
        Box::new(FilenameIdentifier),
        Box::new(TracingReporter),
    );
    let intake = Intake::new();

    if cli.once {
        intake.sweep(&config.source_dir)?;
        let processed = intake.run(&engine);
        info!("Processed {processed} file(s)");
        return Ok(());
    }

    let shutdown = intake.sender();
    ctrlc::set_handler(move || {
        let _ = shutdown.send(IntakeEvent::Shutdown);
    })
    .context("Failed to install signal handler")?;

    // Subscribe first so a file landing during the sweep is still seen; a file
    // queued by both is a silent no-op the second time.
    let _watcher = intake.watch(&config.source_dir)?;
    intake.sweep(&config.source_dir)?;
    intake.run(&engine);

    Ok(())
}

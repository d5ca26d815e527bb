pub mod cli;
pub mod commands;
pub mod logging;
pub mod settings;

use clap::Parser;
use sla_core::error::AppError;

use crate::cli::Cli;

/// Parse arguments, load settings, install logging and run the requested command.
pub fn run() -> Result<String, AppError> {
    let cli = Cli::parse();
    let settings = settings::load(cli.global.config.as_deref(), &cli.global.overrides())?;
    logging::init_logging(&settings.log);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "slareview starting");
    commands::run(&cli.command, &settings)
}

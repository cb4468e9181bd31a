mod cli;
mod commands;
mod config;
mod error;
mod host;
mod logging;
#[cfg(test)]
mod test_support;

use crate::cli::{Cli, Commands};
use crate::error::{CliError, Result};
use clap::Parser;
use tracing::{debug, error, info};

fn main() {
    if let Err(e) = run_app() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run_app() -> Result<()> {
    let cli = Cli::parse();
    let app_config = config::build_config(&cli)?;
    logging::setup_logging(app_config.log_level, app_config.log_file.clone())?;

    let (panic_hook, eyre_hook) = color_eyre::config::HookBuilder::default().into_hooks();
    eyre_hook.install().map_err(|e| CliError::Other(e.into()))?;
    std::panic::set_hook(Box::new(move |pi| {
        error!("{}", panic_hook.panic_report(pi));
    }));

    info!("pdkit v{} starting up.", env!("CARGO_PKG_VERSION"));
    debug!("Full CLI arguments parsed: {:?}", &cli);
    debug!("Effective configuration: {:?}", &app_config);

    let result = match cli.command {
        Commands::Run(args) => commands::run::run(args, app_config),
        Commands::Exec(args) => commands::exec::run(args, app_config),
        Commands::Commands => commands::list::run(),
    };

    match &result {
        Ok(()) => info!("Command completed successfully."),
        Err(e) => error!("Command failed: {}", e),
    }
    result
}

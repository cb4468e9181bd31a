use super::{invocation_path, run_lines};
use crate::cli::RunArgs;
use crate::config::AppConfig;
use crate::error::Result;
use std::fs;
use tracing::info;

pub fn run(args: RunArgs, config: AppConfig) -> Result<()> {
    info!("Running script {}", args.script.display());
    let script = fs::read_to_string(&args.script)?;
    let mut stdout = std::io::stdout().lock();
    run_lines(
        &invocation_path(),
        config.facade,
        args.keep_going,
        script.lines(),
        &mut stdout,
    )?;
    Ok(())
}

use super::{invocation_path, run_lines};
use crate::cli::ExecArgs;
use crate::config::AppConfig;
use crate::error::Result;

pub fn run(args: ExecArgs, config: AppConfig) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    run_lines(
        &invocation_path(),
        config.facade,
        args.keep_going,
        args.commands.iter().map(String::as_str),
        &mut stdout,
    )?;
    Ok(())
}

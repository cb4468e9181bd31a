pub mod exec;
pub mod list;
pub mod run;

use crate::error::{CliError, Result};
use crate::host::{ScriptHost, ScriptSummary};
use pdkit::facade::{Facade, FacadeConfig};
use std::io::Write;
use tracing::info;

/// The path the program was started with, as the resource search expects it.
pub fn invocation_path() -> String {
    std::env::args().next().unwrap_or_default()
}

/// Starts a facade, runs `lines` through a script host and shuts the facade down.
pub(crate) fn run_lines<'a>(
    invocation: &str,
    config: FacadeConfig,
    keep_going: bool,
    lines: impl IntoIterator<Item = &'a str>,
    out: &mut impl Write,
) -> Result<ScriptSummary> {
    let mut host = ScriptHost::new(keep_going);
    let mut facade = Facade::builder(invocation).config(config).try_init(&mut host)?;
    let result = host.run(&mut facade, lines, out);
    facade.shutdown();
    let summary = result?;
    info!(
        "Executed {} command(s), {} failed",
        summary.executed, summary.failed
    );
    if summary.failed > 0 {
        return Err(CliError::Failures(summary.failed));
    }
    Ok(summary)
}

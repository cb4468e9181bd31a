use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    version,
    about = "pdkit - a script host for the pdkit physical-design toolkit: load LEF, DEF and Verilog, link netlists, and report timing and area.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Path to a TOML configuration file.
    /// Defaults to `config.toml` in the user's pdkit configuration directory, if present.
    #[arg(short, long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a script of toolkit commands, one command per line.
    Run(RunArgs),
    /// Run commands given on the command line, each argument being one command.
    Exec(ExecArgs),
    /// List the available toolkit commands.
    Commands,
}

/// Arguments for the `run` subcommand.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Path to the script file.
    #[arg(required = true, value_name = "SCRIPT")]
    pub script: PathBuf,

    /// Keep running after a command fails instead of stopping at the first failure.
    #[arg(short, long)]
    pub keep_going: bool,
}

/// Arguments for the `exec` subcommand.
#[derive(Args, Debug)]
pub struct ExecArgs {
    /// Commands to run in order, e.g. "read_lef cells.lef" "report_timing".
    #[arg(required = true, value_name = "COMMAND", num_args(1..))]
    pub commands: Vec<String>,

    /// Keep running after a command fails instead of stopping at the first failure.
    #[arg(short, long)]
    pub keep_going: bool,
}

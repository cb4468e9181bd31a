use pdkit::facade::StartupError;
use pdkit::facade::commands::CommandError;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Startup failed: {0}")]
    Startup(#[from] StartupError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to parse file '{path}': {source}", path = path.display())]
    FileParsing {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("Line {line}: {source}")]
    Script {
        line: usize,
        #[source]
        source: CommandError,
    },

    #[error("Line {line}: {command} failed: {message}")]
    CommandFailed {
        line: usize,
        command: String,
        message: String,
    },

    #[error("{0} command(s) failed")]
    Failures(usize),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

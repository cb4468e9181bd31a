use super::config::ConfigError;
use crate::resources::locator::LocateError;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("A facade is already live in this process")]
    AlreadyInitialized,

    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Required resources are unavailable: {0}")]
    Resources(#[from] LocateError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The input could not be parsed or did not resolve against the loaded data.
    MalformedInput,
    /// The operation does not apply to the current state, such as a second chip.
    InvalidState,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::MalformedInput => write!(f, "malformed input"),
            FailureKind::InvalidState => write!(f, "invalid state"),
        }
    }
}

/// The most recent soft failure of a facade operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub kind: FailureKind,
    pub message: String,
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl Failure {
    pub fn malformed(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::MalformedInput,
            message: message.into(),
        }
    }

    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::InvalidState,
            message: message.into(),
        }
    }
}

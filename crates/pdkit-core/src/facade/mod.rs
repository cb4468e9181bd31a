//! # Facade Module
//!
//! The public API of the toolkit: one owned [`Facade`] per process.
//!
//! - **Session** ([`session`]) - startup, teardown and the load/save operations
//! - **Commands** ([`commands`]) - the command tables published to scripting hosts
//! - **Configuration** ([`config`]) - resource and optimizer settings
//! - **Errors** ([`error`]) - startup errors and soft operation failures

mod bindings;
pub mod commands;
pub mod config;
pub mod error;
pub mod session;

pub use commands::{CommandHost, CommandOutcome, CommandTable};
pub use config::{FacadeConfig, FacadeConfigBuilder};
pub use error::{Failure, FailureKind, StartupError};
pub use session::{Facade, FacadeBuilder, LefMode};

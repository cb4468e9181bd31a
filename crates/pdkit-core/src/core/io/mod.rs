//! Readers and writers for the design exchange formats.

use crate::core::models::database::Database;
use crate::core::models::design::Block;

pub mod def;
pub(crate) mod lexer;
pub mod lef;
pub mod snapshot;
pub mod traits;
pub mod verilog;

/// A borrowed view of one block together with the database that resolves its masters.
#[derive(Debug, Clone, Copy)]
pub struct DesignView<'a> {
    pub db: &'a Database,
    pub block: &'a Block,
}

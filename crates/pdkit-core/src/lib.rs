//! # pdkit Core Library
//!
//! The lifecycle and consistency controller of a multi-engine physical-design toolkit.
//! A single [`facade::Facade`] owns a geometric chip database, a timing engine bound to it,
//! a gate-optimization engine and a netlist staging area, and is the only path through which
//! a scripting front end loads and saves design data.
//!
//! ## Architectural Philosophy
//!
//! - **[`core`]: The Foundation.** The chip database model (technology, libraries, chip/block)
//!   and the readers and writers for the file formats the toolkit exchanges.
//!
//! - **[`engine`]: The Bound Engines.** The timing engine and its `{Unbound, Fresh, Stale}`
//!   binding state, the optimization engine that depends on a fresh timing view, the netlist
//!   staging area and its linker, and lifecycle reporting.
//!
//! - **[`resources`]: Startup Resources.** Discovery of the lookup-table files required by the
//!   geometry heuristic engine, relative to the program's invocation path.
//!
//! - **[`facade`]: The Public API.** Construction and teardown of the engines in a fixed order,
//!   the load/save orchestration that keeps the timing view consistent with the database,
//!   and the command table published to scripting hosts.

pub mod core;
pub mod engine;
pub mod facade;
pub mod resources;

#[cfg(test)]
mod test_support;

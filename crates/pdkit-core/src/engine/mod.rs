//! # Engine Module
//!
//! The engines the facade binds to the chip database.
//!
//! ## Overview
//!
//! Each engine keeps its own state and only ever borrows the [`Database`] it is bound to.
//! The timing engine caches a derived view of the database whose validity is tracked by
//! [`state::BindingState`]; the optimizer reads that view and refuses to run on a stale one;
//! netlist staging keeps parsed HDL modules apart from the database until they are linked.
//!
//! - **Binding state** ([`state`]) - `Unbound`, `Fresh` and `Stale` with the revision the view was built from
//! - **Timing** ([`timing`]) - unit-delay arrival propagation and fanout over the net graph
//! - **Optimization** ([`optimizer`]) - fanout-violation and design-area reports
//! - **Staging** ([`staging`]) - staged modules and the hierarchical linker
//! - **Lifecycle** ([`lifecycle`]) - creation and release events of the bound engines
//! - **Errors** ([`error`]) - engine error types
//!
//! [`Database`]: crate::core::models::database::Database

pub mod error;
pub mod lifecycle;
pub mod optimizer;
pub mod staging;
pub mod state;
pub mod timing;

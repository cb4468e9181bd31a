//! # Database Models Module
//!
//! The in-memory chip database shared by every engine of the toolkit.
//!
//! ## Key Components
//!
//! - [`technology`] - process layers, placement sites and database units
//! - [`library`] - cell libraries and the masters (cells) they define
//! - [`design`] - the chip/block netlist: ports, instances, nets and placement
//! - [`database`] - the owning container and its mutation revision counter
//! - [`ids`] - slot-map keys for libraries, masters, chips, instances and nets
//!
//! ## Usage
//!
//! ```ignore
//! use pdkit::core::models::{database::Database, technology::Technology};
//!
//! let mut db = Database::new();
//! db.create_technology(Technology::new("tech", 2000))?;
//! let lib = db.create_library("cells", masters)?;
//! ```

pub mod database;
pub mod design;
pub mod ids;
pub mod library;
pub mod technology;

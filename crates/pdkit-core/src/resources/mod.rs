//! Discovery and loading of the lookup-table files needed at startup.
//!
//! The tables live in a `resources` folder somewhere near the executable. [`locator`] derives
//! candidate folders from the invocation path, [`lut`] reads the tables relative to the working
//! directory, and [`cwd`] serializes every working-directory change in the process.

pub mod cwd;
pub mod locator;
pub mod lut;

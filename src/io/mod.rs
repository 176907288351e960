//! Input/output helpers.
//!
//! - CSV parsing of curve sets and lookup tables (`tables`)
//! - CSV/JSON exports (`export`)
//! - `.xlsx` workbooks for the same tables (`excel`)

mod excel;
pub mod export;
pub mod tables;

pub use export::*;
pub use tables::*;

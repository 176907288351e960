//! Domain types used throughout the crate.
//!
//! This module defines:
//!
//! - the tables the transforms operate on (`CurveSet`, `MappingTable`, `FractionTable`)
//! - policy enums (`ErrorHandling`, `UnmappedPolicy`, `FlowSign`)
//! - engine identifiers (`ScenarioId`, `Carrier`)

pub mod types;

pub use types::*;

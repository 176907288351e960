//! `etm-client` library crate.
//!
//! The binary (`etm`) is a thin wrapper around this library so that:
//!
//! - the curve transforms are testable without spawning processes
//! - the engine client is reusable from other tools
//! - code stays easy to navigate as the project grows

pub mod app;
pub mod cli;
pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod io;
pub mod logging;
pub mod myc;
pub mod report;
pub mod transform;

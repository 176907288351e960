//! Pure curve transforms.
//!
//! - categorisation of raw engine curves into user-defined labels (`categorise`)
//! - allocation of categorised curves over nodes (`regionalise`)
//! - balance and regionalisation table checks (`validate`)
//!
//! Nothing in here performs I/O or holds state; every function is a
//! deterministic function of its arguments.

pub mod categorise;
pub mod regionalise;
pub mod validate;

pub use categorise::*;
pub use regionalise::*;
pub use validate::*;

//! ETM engine client.
//!
//! `EngineSession` carries the connection; the endpoint modules add methods
//! to it that take the target `ScenarioId` explicitly.

pub mod curves;
pub mod custom_curves;
pub mod parameters;
pub mod saved;
pub mod scenario;
pub mod session;

pub use custom_curves::CustomCurve;
pub use parameters::{GqueryResult, GqueryValue, InputParameter, OrderKind};
pub use saved::{NewSavedScenario, SavedScenario};
pub use scenario::{NewScenario, ScenarioHeader};
pub use session::EngineSession;

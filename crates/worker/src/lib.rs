//! Farm worker
//!
//! The stage machine, the safety monitor and the operator control surface,
//! tied together by [`FarmWorker`].

pub mod control;
pub mod safety;
pub mod service;
pub mod stage;

pub use control::{Control, ControlError, ControlSnapshot};
pub use safety::{HaltReason, SafetyMonitor, SafetyOutcome};
pub use service::{FarmWorker, TickOutcome};
pub use stage::{Stage, StageEvent, Toggles, Transition};

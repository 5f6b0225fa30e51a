//! Pure session-state logic shared by the host services and the records.

/// Phase/event state machine for one game session.
pub mod machine;

pub use machine::{Advance, InvalidTransition, SessionEvent, SessionPhase, plan_advance};

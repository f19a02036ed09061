//! Run state machine
//!
//! Defines the authoritative lifecycle of one experiment run.
//! The state machine is explicit, finite, and deterministic.

pub mod machine;
pub mod trigger;

pub use machine::RunState;
pub use trigger::Trigger;

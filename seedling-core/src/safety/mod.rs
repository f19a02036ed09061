//! Run safety monitoring
//!
//! Decides when repeated non-fatal problems become a fault.

pub mod monitor;

pub use monitor::{DriftMonitor, SafetyStatus, DEFAULT_MAX_DRIFT_FAILURES};

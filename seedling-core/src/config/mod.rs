//! Configuration types
//!
//! Experiment definitions, machine configuration, and the TOML parser that
//! loads the latter.

pub mod hardware;
pub mod toml;
pub mod types;

pub use hardware::*;
pub use toml::{parse_machine_config, ParseError};
pub use types::*;

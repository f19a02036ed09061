//! Image capture
//!
//! Autofocus and exposure sequencing around a still capture, and the
//! record each successful capture produces.

pub mod pipeline;
pub mod record;

pub use pipeline::CapturePipeline;
pub use record::CaptureRecord;

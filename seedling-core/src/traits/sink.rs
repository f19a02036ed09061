//! Capture metadata sink trait

use crate::capture::CaptureRecord;

/// Errors reported by a metadata sink
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SinkError {
    /// The record could not be written
    WriteFailed,
    /// The sink has no room for more records
    Full,
}

/// Append-only destination for capture records
///
/// A failing sink never aborts a run; the runner logs it and emits a
/// warning event.
pub trait MetadataSink {
    /// Append one record
    fn record(&mut self, record: CaptureRecord) -> Result<(), SinkError>;
}

/// Sink that discards every record
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl MetadataSink for NullSink {
    fn record(&mut self, _record: CaptureRecord) -> Result<(), SinkError> {
        Ok(())
    }
}

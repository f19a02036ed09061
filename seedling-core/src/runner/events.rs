//! Run progress events
//!
//! Events go out on an `embassy-sync` pub/sub channel through an immediate
//! publisher: publishing never waits, and an observer that falls behind
//! loses the oldest events and is told how many it missed.

use embassy_sync::pubsub::{DynImmediatePublisher, PubSubChannel};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::capture::CaptureRecord;
use crate::config::PlateIndex;
use crate::error::RunError;
use crate::motion::{DriftReport, HomingReport};
use crate::traits::CameraError;

/// Events buffered per observer before the oldest are dropped
pub const EVENT_QUEUE_DEPTH: usize = 64;

/// Maximum concurrent observers
pub const MAX_OBSERVERS: usize = 4;

/// Channel carrying run events
///
/// ```ignore
/// static EVENTS: EventBus<CriticalSectionRawMutex> = PubSubChannel::new();
/// ```
pub type EventBus<M> = PubSubChannel<M, RunEvent, EVENT_QUEUE_DEPTH, MAX_OBSERVERS, 1>;

/// Non-blocking publisher handed to the runner
pub type EventPublisher<'a> = DynImmediatePublisher<'a, RunEvent>;

/// Totals reported when a run ends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RunSummary {
    /// Cycles that ran to the wrap
    pub cycles_completed: u32,
    /// Images saved
    pub images_captured: u32,
    /// Selected plates whose capture failed
    pub captures_skipped: u32,
    /// Wraps where the marker was not re-acquired
    pub drift_failures: u32,
    /// The run ended early on request
    pub cancelled: bool,
}

/// Progress of a run, in the order things happen
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RunEvent {
    /// Carousel found its home position
    Homed(HomingReport),
    /// Cycle started (zero-based)
    CycleStarted { cycle: u32 },
    /// A selected plate is under the camera
    PlateSelected { cycle: u32, plate: PlateIndex },
    /// Illumination on, plate settling
    SettlingStarted { plate: PlateIndex },
    /// Settle period over
    SettlingFinished { plate: PlateIndex },
    /// Image saved
    ImageCaptured(CaptureRecord),
    /// Capture failed; the cycle moves on
    CaptureSkipped { plate: PlateIndex, error: CameraError },
    /// The metadata sink rejected a record
    SinkFailed { plate: PlateIndex },
    /// Drift correction result at the wrap
    DriftReported(DriftReport),
    /// Drift correction failed; run continues
    DriftCorrectionFailed { consecutive: u8 },
    /// Cycle reached the wrap
    CycleCompleted { cycle: u32 },
    /// Cycle started later than scheduled
    CycleOverrun { cycle: u32, late_ms: u64 },
    /// Cycle interrupted by cancellation
    CycleAborted { cycle: u32 },
    /// Run ended normally or by cancellation
    RunCompleted(RunSummary),
    /// Run ended by a fault
    RunFailed(RunError),
}

//! Experiment runner
//!
//! Drives the carousel, illumination and camera through the per-plate
//! protocol, cycle after cycle, until the experiment duration elapses, the
//! cycle limit is reached, a fault occurs or the run is cancelled.

pub mod cancel;
pub mod events;
pub mod executor;

pub use cancel::CancelToken;
pub use events::{
    EventBus, EventPublisher, RunEvent, RunSummary, EVENT_QUEUE_DEPTH, MAX_OBSERVERS,
};
pub use executor::{ExperimentRunner, RunOutcome};

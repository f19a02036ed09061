//! Hardware abstraction traits
//!
//! These traits define the interface between the run logic and
//! hardware-specific implementations. Everything the runner touches is an
//! owned handle implementing one of them, so tests can drive the runner
//! against simulated hardware.

pub mod camera;
pub mod clock;
pub mod illumination;
pub mod sensor;
pub mod sink;
pub mod stepper;

pub use camera::{
    AfMode, Camera, CameraError, CaptureContext, ExposureMetadata, FocusState, StillFrame,
    MAX_PATH_LEN,
};
pub use clock::Clock;
pub use illumination::{IlluminationError, LedOutputs};
pub use sensor::{PositionSensors, SensorError};
pub use sink::{MetadataSink, NullSink, SinkError};
pub use stepper::{Direction, StepRate, StepperDriver, StepperError};

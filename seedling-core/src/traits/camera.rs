//! Camera trait
//!
//! The camera backend owns the sensor pipeline and the storage layout. The
//! core only tells it what is being captured and reads back where the
//! image went.

use heapless::String;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::config::{CameraSettings, IlluminationMode, PlateIndex};

/// Maximum length of a saved image path
pub const MAX_PATH_LEN: usize = 128;

/// Autofocus mode control value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum AfMode {
    /// Lens position is fixed
    Manual,
    /// Single autofocus pass per trigger
    Auto,
    /// Focus tracks the scene continuously (live view)
    Continuous,
}

/// Autofocus convergence state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum FocusState {
    /// No autofocus pass in progress
    Idle,
    /// Pass in progress
    Scanning,
    /// Pass converged
    Focused,
    /// Pass ended without converging
    Failed,
}

impl FocusState {
    /// The pass has ended, successfully or not
    pub const fn is_settled(self) -> bool {
        matches!(self, FocusState::Focused | FocusState::Failed)
    }
}

/// Errors reported by the camera backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CameraError {
    /// Operation requires a started camera
    NotStarted,
    /// Pipeline failed to start
    StartFailed,
    /// A control value was rejected
    ControlRejected,
    /// Still capture failed
    CaptureFailed,
    /// Image could not be saved
    SaveFailed,
    /// Device disappeared
    Disconnected,
}

impl CameraError {
    /// Human-readable description
    pub const fn as_str(self) -> &'static str {
        match self {
            CameraError::NotStarted => "camera not started",
            CameraError::StartFailed => "camera failed to start",
            CameraError::ControlRejected => "camera rejected a control",
            CameraError::CaptureFailed => "still capture failed",
            CameraError::SaveFailed => "image could not be saved",
            CameraError::Disconnected => "camera disconnected",
        }
    }
}

/// What is being captured, handed to the backend for naming the file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CaptureContext {
    /// Capture time (clock milliseconds)
    pub timestamp_ms: u64,
    /// Zero-based cycle index
    pub cycle: u32,
    /// Plate under the camera
    pub plate: PlateIndex,
    /// Active illumination channel
    pub illumination: IlluminationMode,
}

/// Exposure parameters reported with a still
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ExposureMetadata {
    /// Auto exposure was enabled
    pub ae_enabled: bool,
    /// Exposure time in microseconds
    pub exposure_time_us: u32,
    /// Analogue gain
    pub analogue_gain: f32,
    /// Auto white balance was enabled
    pub awb_enabled: bool,
}

/// A saved full-resolution still
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StillFrame {
    /// Where the backend saved the image
    pub path: String<MAX_PATH_LEN>,
    /// Image width in pixels
    pub width: u32,
    /// Image height in pixels
    pub height: u32,
    /// Saved file size
    pub file_size_bytes: u64,
    /// Exposure parameters in effect
    pub metadata: ExposureMetadata,
}

/// Trait for the still camera
#[allow(async_fn_in_trait)]
pub trait Camera {
    /// Start the sensor pipeline (idempotent)
    async fn start(&mut self) -> Result<(), CameraError>;

    /// Stop the sensor pipeline (idempotent)
    async fn stop(&mut self) -> Result<(), CameraError>;

    /// Apply tuning controls
    fn apply_settings(&mut self, settings: &CameraSettings) -> Result<(), CameraError>;

    /// Enable or lock auto exposure
    fn set_auto_exposure(&mut self, enabled: bool) -> Result<(), CameraError>;

    /// Select the autofocus mode
    fn set_af_mode(&mut self, mode: AfMode) -> Result<(), CameraError>;

    /// Start one autofocus pass
    fn trigger_autofocus(&mut self) -> Result<(), CameraError>;

    /// Current autofocus state
    fn focus_state(&mut self) -> Result<FocusState, CameraError>;

    /// Capture and save a full-resolution still
    async fn capture_still(&mut self, context: &CaptureContext)
        -> Result<StillFrame, CameraError>;
}

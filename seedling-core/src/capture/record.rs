//! Capture metadata record

use heapless::String;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::config::{IlluminationMode, PlateIndex};
use crate::traits::{CaptureContext, StillFrame, MAX_PATH_LEN};

/// Metadata of one saved image
///
/// Created once per successful capture and handed by value to the
/// metadata sink and to event observers.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CaptureRecord {
    /// Capture time (clock milliseconds)
    pub timestamp_ms: u64,
    /// Zero-based cycle index
    pub cycle: u32,
    /// Imaged plate
    pub plate: PlateIndex,
    /// Illumination during the exposure
    pub illumination: IlluminationMode,
    /// Where the camera backend saved the image
    pub image_path: String<MAX_PATH_LEN>,
    /// Image width in pixels
    pub width: u32,
    /// Image height in pixels
    pub height: u32,
    /// Saved file size
    pub file_size_bytes: u64,
    /// Auto exposure was enabled for the exposure
    pub ae_enabled: bool,
    /// Exposure time in microseconds
    pub exposure_time_us: u32,
    /// Analogue gain
    pub analogue_gain: f32,
    /// Auto white balance was enabled
    pub awb_enabled: bool,
    /// Autofocus converged before the exposure
    pub focus_converged: bool,
}

impl CaptureRecord {
    /// Combine the capture context with what the camera reported
    pub fn new(context: &CaptureContext, frame: StillFrame, focus_converged: bool) -> Self {
        Self {
            timestamp_ms: context.timestamp_ms,
            cycle: context.cycle,
            plate: context.plate,
            illumination: context.illumination,
            image_path: frame.path,
            width: frame.width,
            height: frame.height,
            file_size_bytes: frame.file_size_bytes,
            ae_enabled: frame.metadata.ae_enabled,
            exposure_time_us: frame.metadata.exposure_time_us,
            analogue_gain: frame.metadata.analogue_gain,
            awb_enabled: frame.metadata.awb_enabled,
            focus_converged,
        }
    }
}

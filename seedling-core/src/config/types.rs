//! Experiment configuration types
//!
//! These types describe one experiment: which plates to image, under which
//! illumination, how often and for how long.

use core::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Number of plate positions on the carousel
pub const PLATE_COUNT: u8 = 6;

/// Minutes per day, for cycle planning
const MINUTES_PER_DAY: u32 = 24 * 60;

/// Default settle time per plate (ms)
pub const DEFAULT_SETTLE_MS: u32 = 10_000;

/// Carousel plate position (1..=6)
///
/// Ordering follows the carousel traversal order. Advancing past plate 6
/// wraps back to plate 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PlateIndex(u8);

impl PlateIndex {
    /// Plate 1, the home position
    pub const FIRST: PlateIndex = PlateIndex(1);

    /// Plate 6, the last position before the wrap
    pub const LAST: PlateIndex = PlateIndex(PLATE_COUNT);

    /// Create a plate index, returning None outside 1..=6
    pub const fn new(index: u8) -> Option<Self> {
        if index >= 1 && index <= PLATE_COUNT {
            Some(Self(index))
        } else {
            None
        }
    }

    /// Get the 1-based plate number
    pub const fn get(self) -> u8 {
        self.0
    }

    /// Next plate in traversal order (6 wraps to 1)
    pub const fn next(self) -> Self {
        Self(self.0 % PLATE_COUNT + 1)
    }

    /// Check if advancing from this plate crosses the wrap boundary
    pub const fn is_last(self) -> bool {
        self.0 == PLATE_COUNT
    }

    /// Iterate all plates in traversal order
    pub fn all() -> impl Iterator<Item = PlateIndex> {
        (1..=PLATE_COUNT).map(PlateIndex)
    }

    /// Parse a plate from `"3"` or a dialog label like `"Plate 3"`
    pub fn parse_label(label: &str) -> Option<Self> {
        let number = label.trim().rsplit(' ').next()?;
        number.parse::<u8>().ok().and_then(Self::new)
    }
}

impl FromStr for PlateIndex {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_label(s).ok_or(ConfigError::InvalidPlate)
    }
}

/// Set of selected plates, stored as a bitmask
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PlateSet {
    bits: u8,
}

impl PlateSet {
    /// Empty set
    pub const fn empty() -> Self {
        Self { bits: 0 }
    }

    /// All six plates
    pub const fn all() -> Self {
        Self { bits: 0b0011_1111 }
    }

    /// Build a set from plate numbers, ignoring numbers outside 1..=6
    pub fn from_numbers(numbers: &[u8]) -> Self {
        let mut set = Self::empty();
        for plate in numbers.iter().copied().filter_map(PlateIndex::new) {
            set.insert(plate);
        }
        set
    }

    /// Add a plate
    pub fn insert(&mut self, plate: PlateIndex) {
        self.bits |= 1 << (plate.get() - 1);
    }

    /// Check membership
    pub const fn contains(&self, plate: PlateIndex) -> bool {
        self.bits & (1 << (plate.get() - 1)) != 0
    }

    /// Number of selected plates
    pub const fn len(&self) -> u32 {
        self.bits.count_ones()
    }

    /// Check if no plate is selected
    pub const fn is_empty(&self) -> bool {
        self.bits == 0
    }

    /// Selected plates in carousel order
    pub fn iter(&self) -> impl Iterator<Item = PlateIndex> + '_ {
        PlateIndex::all().filter(move |p| self.contains(*p))
    }
}

/// Illumination channel
///
/// The two channels are mutually exclusive: at most one is energized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum IlluminationMode {
    /// Green LED panel
    #[default]
    Green,
    /// Infrared LED panel
    Infrared,
}

impl IlluminationMode {
    /// The other channel
    pub const fn other(self) -> Self {
        match self {
            IlluminationMode::Green => IlluminationMode::Infrared,
            IlluminationMode::Infrared => IlluminationMode::Green,
        }
    }

    /// Display name
    pub const fn as_str(self) -> &'static str {
        match self {
            IlluminationMode::Green => "Green",
            IlluminationMode::Infrared => "Infrared",
        }
    }
}

impl FromStr for IlluminationMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("green") {
            Ok(IlluminationMode::Green)
        } else if s.eq_ignore_ascii_case("infrared") || s.eq_ignore_ascii_case("ir") {
            Ok(IlluminationMode::Infrared)
        } else {
            Err(ConfigError::InvalidIllumination)
        }
    }
}

/// Experiment configuration validation errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// No plate selected
    NoPlatesSelected,
    /// Plate number outside 1..=6
    InvalidPlate,
    /// Unknown illumination channel name
    InvalidIllumination,
    /// Duration must be at least one day
    ZeroDuration,
    /// Acquisition frequency must be at least one minute
    ZeroFrequency,
    /// Settle time must be non-zero
    ZeroSettle,
}

impl ConfigError {
    /// Human-readable description
    pub const fn as_str(self) -> &'static str {
        match self {
            ConfigError::NoPlatesSelected => "no plates selected",
            ConfigError::InvalidPlate => "plate number outside 1..6",
            ConfigError::InvalidIllumination => "unknown illumination mode",
            ConfigError::ZeroDuration => "duration must be at least one day",
            ConfigError::ZeroFrequency => "acquisition frequency must be at least one minute",
            ConfigError::ZeroSettle => "settle time must be non-zero",
        }
    }
}

/// One experiment definition
///
/// Immutable once a run starts. Build it with [`ExperimentConfig::new`],
/// which enforces the non-empty plate set and non-zero timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ExperimentConfig {
    plates: PlateSet,
    illumination: IlluminationMode,
    duration_days: u16,
    frequency_minutes: u16,
    settle_ms: u32,
    cycle_limit: Option<u32>,
}

impl ExperimentConfig {
    /// Create a validated experiment configuration with the default 10 s settle
    pub fn new(
        plates: PlateSet,
        illumination: IlluminationMode,
        duration_days: u16,
        frequency_minutes: u16,
    ) -> Result<Self, ConfigError> {
        if plates.is_empty() {
            return Err(ConfigError::NoPlatesSelected);
        }
        if duration_days == 0 {
            return Err(ConfigError::ZeroDuration);
        }
        if frequency_minutes == 0 {
            return Err(ConfigError::ZeroFrequency);
        }

        Ok(Self {
            plates,
            illumination,
            duration_days,
            frequency_minutes,
            settle_ms: DEFAULT_SETTLE_MS,
            cycle_limit: None,
        })
    }

    /// Override the per-plate settle time
    pub fn with_settle_ms(mut self, settle_ms: u32) -> Result<Self, ConfigError> {
        if settle_ms == 0 {
            return Err(ConfigError::ZeroSettle);
        }
        self.settle_ms = settle_ms;
        Ok(self)
    }

    /// Stop after this many cycles even if the duration has not elapsed
    pub fn with_cycle_limit(mut self, cycles: u32) -> Self {
        self.cycle_limit = Some(cycles);
        self
    }

    /// Selected plates
    pub fn plates(&self) -> PlateSet {
        self.plates
    }

    /// Illumination channel used for every capture
    pub fn illumination(&self) -> IlluminationMode {
        self.illumination
    }

    /// Experiment duration in days
    pub fn duration_days(&self) -> u16 {
        self.duration_days
    }

    /// Acquisition frequency in minutes (cycle start to cycle start)
    pub fn frequency_minutes(&self) -> u16 {
        self.frequency_minutes
    }

    /// Settle time per plate in milliseconds
    pub fn settle_ms(&self) -> u32 {
        self.settle_ms
    }

    /// Optional cycle cap
    pub fn cycle_limit(&self) -> Option<u32> {
        self.cycle_limit
    }

    /// Total experiment duration in milliseconds
    pub fn duration_ms(&self) -> u64 {
        self.duration_days as u64 * MINUTES_PER_DAY as u64 * 60_000
    }

    /// Cycle period in milliseconds
    pub fn period_ms(&self) -> u64 {
        self.frequency_minutes as u64 * 60_000
    }

    /// Number of cycles the experiment is planned to run
    pub fn planned_cycles(&self) -> u32 {
        // A cycle starts at every period boundary inside the duration
        let by_duration = (self.duration_days as u32 * MINUTES_PER_DAY)
            .div_ceil(self.frequency_minutes as u32);
        match self.cycle_limit {
            Some(limit) => by_duration.min(limit),
            None => by_duration,
        }
    }

    /// Number of images the experiment is planned to produce
    pub fn planned_images(&self) -> u32 {
        self.planned_cycles() * self.plates.len()
    }
}

/// Camera tuning applied when the camera starts for a run
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CameraSettings {
    /// Auto exposure enabled for framing
    pub ae_enable: bool,
    /// Manual exposure time in microseconds (only used when AE is off)
    pub exposure_time_us: u32,
    /// Sensor analogue gain
    pub analogue_gain: f32,
    /// Auto white balance enabled
    pub awb_enable: bool,
    /// Contrast (1.0 = neutral)
    pub contrast: f32,
    /// Brightness (-1.0..=1.0)
    pub brightness: f32,
    /// Saturation (1.0 = neutral)
    pub saturation: f32,
    /// Sharpness (1.0 = neutral)
    pub sharpness: f32,
    /// Noise reduction mode (0 = off)
    pub noise_reduction_mode: u8,
    /// HDR enabled
    pub hdr_enable: bool,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            ae_enable: true,
            exposure_time_us: 20_000,
            analogue_gain: 1.0,
            awb_enable: true,
            contrast: 1.0,
            brightness: 0.0,
            saturation: 1.0,
            sharpness: 1.0,
            noise_reduction_mode: 0,
            hdr_enable: false,
        }
    }
}

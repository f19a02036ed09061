//! Simple TOML parser for machine configuration
//!
//! This is a minimal TOML parser that handles only the subset needed for
//! Seedling configuration. It does NOT support the full TOML grammar.
//!
//! Supported features:
//! - Key = value pairs (string, integer, float, boolean)
//! - [section] headers
//! - Flat arrays of integers: plates = [1, 3, 5]
//! - Comments (# ...)
//!
//! NOT supported:
//! - Multi-line strings
//! - Inline tables
//! - Dotted keys

use core::str::FromStr;

use super::hardware::{MachineConfig, PinConfig};
use super::types::{ConfigError, ExperimentConfig, IlluminationMode, PlateSet, PLATE_COUNT};

/// Parse error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ParseError {
    /// Unknown or malformed section header
    InvalidSection,
    /// Value has the wrong type or is out of range
    InvalidValue,
    /// Invalid pin string
    InvalidPin,
    /// The [experiment] section does not describe a valid experiment
    InvalidExperiment(ConfigError),
}

impl ParseError {
    /// Human-readable description
    pub const fn as_str(self) -> &'static str {
        match self {
            ParseError::InvalidSection => "invalid section header",
            ParseError::InvalidValue => "invalid value",
            ParseError::InvalidPin => "invalid pin",
            ParseError::InvalidExperiment(e) => e.as_str(),
        }
    }
}

/// Current parsing context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Root,
    Carousel,
    Timings,
    Pins,
    Camera,
    Experiment,
}

/// Experiment fields collected before validation
struct ExperimentDraft {
    plates: PlateSet,
    illumination: IlluminationMode,
    duration_days: u16,
    frequency_minutes: u16,
    settle_ms: Option<u32>,
    cycle_limit: Option<u32>,
}

impl Default for ExperimentDraft {
    fn default() -> Self {
        Self {
            plates: PlateSet::empty(),
            illumination: IlluminationMode::Green,
            duration_days: 1,
            frequency_minutes: 30,
            settle_ms: None,
            cycle_limit: None,
        }
    }
}

impl ExperimentDraft {
    fn build(self, default_settle_ms: u32) -> Result<ExperimentConfig, ConfigError> {
        let config = ExperimentConfig::new(
            self.plates,
            self.illumination,
            self.duration_days,
            self.frequency_minutes,
        )?
        .with_settle_ms(self.settle_ms.unwrap_or(default_settle_ms))?;

        Ok(match self.cycle_limit {
            Some(limit) => config.with_cycle_limit(limit),
            None => config,
        })
    }
}

/// Parse TOML configuration into MachineConfig
pub fn parse_machine_config(input: &str) -> Result<MachineConfig, ParseError> {
    let mut config = MachineConfig::new();
    let mut section = Section::Root;
    let mut experiment: Option<ExperimentDraft> = None;

    for line in input.lines() {
        let line = line.trim();

        // Skip empty lines and comments
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if line.starts_with('[') && line.ends_with(']') {
            section = parse_section_header(&line[1..line.len() - 1])?;
            if section == Section::Experiment && experiment.is_none() {
                experiment = Some(ExperimentDraft::default());
            }
            continue;
        }

        if let Some((key, value)) = parse_key_value(line) {
            apply_value(section, key, value, &mut config, &mut experiment)?;
        }
    }

    if let Some(draft) = experiment {
        let built = draft
            .build(config.timings.settle_ms)
            .map_err(ParseError::InvalidExperiment)?;
        config.experiment = Some(built);
    }

    Ok(config)
}

fn parse_section_header(header: &str) -> Result<Section, ParseError> {
    match header.trim() {
        "carousel" => Ok(Section::Carousel),
        "timings" => Ok(Section::Timings),
        "pins" => Ok(Section::Pins),
        "camera" => Ok(Section::Camera),
        "experiment" => Ok(Section::Experiment),
        _ => Err(ParseError::InvalidSection),
    }
}

/// Parse "key = value" line
fn parse_key_value(line: &str) -> Option<(&str, &str)> {
    let eq_pos = line.find('=')?;
    let key = line[..eq_pos].trim();
    let value = line[eq_pos + 1..].trim();

    // Remove inline comments
    let value = if let Some(hash_pos) = value.find('#') {
        // Make sure # is not inside a string
        let quote_count = value[..hash_pos].matches('"').count();
        if quote_count % 2 == 0 {
            value[..hash_pos].trim()
        } else {
            value
        }
    } else {
        value
    };

    if key.is_empty() || value.is_empty() {
        return None;
    }

    Some((key, value))
}

/// Strip surrounding quotes; unquoted strings are allowed for simple values
fn parse_string(value: &str) -> &str {
    if value.starts_with('"') && value.ends_with('"') && value.len() >= 2 {
        &value[1..value.len() - 1]
    } else {
        value
    }
}

fn parse_number<T: FromStr>(value: &str) -> Result<T, ParseError> {
    strip_separators(value)
        .parse()
        .map_err(|_| ParseError::InvalidValue)
}

fn parse_bool(value: &str) -> Result<bool, ParseError> {
    match value {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(ParseError::InvalidValue),
    }
}

/// Parse a pin string like "gpio21", "!gpio21", "^!gpio26"
fn parse_pin(value: &str) -> Result<PinConfig, ParseError> {
    let mut s = parse_string(value);
    let mut inverted = false;
    let mut pull_up = false;

    loop {
        if let Some(rest) = s.strip_prefix('!') {
            inverted = true;
            s = rest;
        } else if let Some(rest) = s.strip_prefix('^') {
            pull_up = true;
            s = rest;
        } else {
            break;
        }
    }

    let number = s.strip_prefix("gpio").ok_or(ParseError::InvalidPin)?;
    let pin: u8 = number.parse().map_err(|_| ParseError::InvalidPin)?;

    Ok(PinConfig {
        pin,
        inverted,
        pull_up,
    })
}

/// Parse a plate array like [1, 3, 5]
fn parse_plates(value: &str) -> Result<PlateSet, ParseError> {
    let inner = value
        .strip_prefix('[')
        .and_then(|v| v.strip_suffix(']'))
        .ok_or(ParseError::InvalidValue)?;

    let mut plates = PlateSet::empty();
    for item in inner.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        plates.insert(item.parse().map_err(ParseError::InvalidExperiment)?);
    }
    Ok(plates)
}

/// Apply a parsed value to the appropriate config field
fn apply_value(
    section: Section,
    key: &str,
    value: &str,
    config: &mut MachineConfig,
    experiment: &mut Option<ExperimentDraft>,
) -> Result<(), ParseError> {
    match section {
        Section::Carousel => {
            let c = &mut config.carousel;
            match key {
                "steps_per_revolution" => c.steps_per_revolution = parse_number(value)?,
                "homing_step_limit" => c.homing_step_limit = parse_number(value)?,
                "marker_search_limit" => c.marker_search_limit = parse_number(value)?,
                "drift_retry_limit" => c.drift_retry_limit = parse_number(value)?,
                _ => {} // Ignore unknown keys
            }
            // At least one step between adjacent plates
            if c.steps_per_revolution < PLATE_COUNT as u32 {
                return Err(ParseError::InvalidValue);
            }
        }
        Section::Timings => {
            let t = &mut config.timings;
            match key {
                "settle_ms" => t.settle_ms = parse_number(value)?,
                "autofocus_timeout_ms" => t.autofocus_timeout_ms = parse_number(value)?,
                "focus_poll_ms" => t.focus_poll_ms = parse_number(value)?,
                "tick_ms" => t.tick_ms = parse_number(value)?,
                "max_consecutive_drift_failures" => {
                    t.max_consecutive_drift_failures = parse_number(value)?
                }
                _ => {}
            }
            if t.tick_ms == 0 || t.focus_poll_ms == 0 {
                return Err(ParseError::InvalidValue);
            }
        }
        Section::Pins => {
            let p = &mut config.pins;
            match key {
                "motor_enable" => p.motor_enable = parse_pin(value)?,
                "motor_step" => p.motor_step = parse_pin(value)?,
                "motor_dir" => p.motor_dir = parse_pin(value)?,
                "hall_sensor" => p.hall_sensor = parse_pin(value)?,
                "optical_sensor" => p.optical_sensor = parse_pin(value)?,
                "led_green" => p.led_green = parse_pin(value)?,
                "led_infrared" => p.led_infrared = parse_pin(value)?,
                "motor_fault" => p.motor_fault = Some(parse_pin(value)?),
                _ => {}
            }
        }
        Section::Camera => {
            let c = &mut config.camera;
            match key {
                "ae_enable" => c.ae_enable = parse_bool(value)?,
                "exposure_time_us" => c.exposure_time_us = parse_number(value)?,
                "analogue_gain" => c.analogue_gain = parse_number(value)?,
                "awb_enable" => c.awb_enable = parse_bool(value)?,
                "contrast" => c.contrast = parse_number(value)?,
                "brightness" => c.brightness = parse_number(value)?,
                "saturation" => c.saturation = parse_number(value)?,
                "sharpness" => c.sharpness = parse_number(value)?,
                "noise_reduction_mode" => c.noise_reduction_mode = parse_number(value)?,
                "hdr_enable" => c.hdr_enable = parse_bool(value)?,
                _ => {}
            }
        }
        Section::Experiment => {
            let e = experiment.as_mut().ok_or(ParseError::InvalidSection)?;
            match key {
                "plates" => e.plates = parse_plates(value)?,
                "illumination" => {
                    e.illumination = parse_string(value)
                        .parse()
                        .map_err(ParseError::InvalidExperiment)?
                }
                "duration_days" => e.duration_days = parse_number(value)?,
                "frequency_minutes" => e.frequency_minutes = parse_number(value)?,
                "settle_ms" => e.settle_ms = Some(parse_number(value)?),
                "cycle_limit" => e.cycle_limit = Some(parse_number(value)?),
                _ => {}
            }
        }
        Section::Root => {}
    }

    Ok(())
}

/// Drop `_` digit separators (`12_000`); overlong literals come back empty
fn strip_separators(value: &str) -> heapless::String<32> {
    let mut out = heapless::String::new();
    for c in value.chars().filter(|c| *c != '_') {
        if out.push(c).is_err() {
            out.clear();
            break;
        }
    }
    out
}

//! Simulated hardware for host tests
//!
//! Every fake shares one [`World`]: a carousel position on a small
//! 60-step revolution, a millisecond clock that only moves when something
//! sleeps, and an ordered log of hardware operations.

use core::cell::{Cell, RefCell};
use core::fmt::Write;
use std::vec::Vec;

use embedded_hal_async::delay::DelayNs;
use heapless::String;

use crate::capture::CaptureRecord;
use crate::config::{
    CameraSettings, CarouselConfig, IlluminationMode, PlateIndex, PlateSet, RunnerTimings,
};
use crate::runner::CancelToken;
use crate::traits::{
    AfMode, Camera, CameraError, CaptureContext, Clock, Direction, ExposureMetadata, FocusState,
    IlluminationError, LedOutputs, MetadataSink, PositionSensors, SensorError, SinkError,
    StepRate, StepperDriver, StepperError, StillFrame,
};

/// Steps per revolution of the simulated carousel (10 per plate)
pub const SIM_STEPS_PER_REV: u32 = 60;

/// Hall sensor fires this many steps before the home position
const HALL_WINDOW: u32 = 3;

/// Carousel limits scaled to the simulated revolution
pub fn sim_carousel() -> CarouselConfig {
    CarouselConfig {
        steps_per_revolution: SIM_STEPS_PER_REV,
        homing_step_limit: 200,
        marker_search_limit: 20,
        drift_retry_limit: 5,
    }
}

/// Short timings so runs stay cheap to simulate
pub fn sim_timings() -> RunnerTimings {
    RunnerTimings {
        settle_ms: 1000,
        autofocus_timeout_ms: 300,
        focus_poll_ms: 50,
        tick_ms: 100,
        max_consecutive_drift_failures: 3,
    }
}

/// Hardware operation, in the order the fakes saw them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Enable(bool),
    /// Consecutive step pulses are merged
    Steps(u32),
    Led(IlluminationMode, bool),
    CameraStart,
    CameraStop,
    Settings,
    AutoExposure(bool),
    AfMode(AfMode),
    AfTrigger,
    Capture(u8),
}

/// Shared simulation state
pub struct World {
    pub position: Cell<u32>,
    pub now_ms: Cell<u64>,
    /// Pending pulses that will not move the carousel
    pub lost_steps: Cell<u32>,
    /// (time, steps) losses armed on the first pulse at or after `time`
    loss_schedule: RefCell<Vec<(u64, u32)>>,
    pub marker_blocked: Cell<bool>,
    pub hall_dead: Cell<bool>,
    pub driver_fault: Cell<bool>,
    pub sensor_fail: Cell<bool>,
    pub led_fail: Cell<Option<IlluminationMode>>,
    pub leds_overlapped: Cell<bool>,
    pub camera_start_fail: Cell<bool>,
    pub capture_fail: Cell<PlateSet>,
    /// Focus polls before the lens reports Focused; `u32::MAX` never converges
    pub focus_polls: Cell<u32>,
    pub sink_fail: Cell<bool>,
    pub records: RefCell<Vec<CaptureRecord>>,
    /// Token handed to the code under test
    pub cancel: CancelToken,
    /// Cancel `cancel` once this many pulses have been issued
    cancel_after: Cell<Option<u32>>,
    pulses: Cell<u32>,
    /// Cancel `cancel` once this plate has been captured
    cancel_on_capture: Cell<Option<u8>>,
    ops: RefCell<Vec<(u64, Op)>>,
}

impl World {
    pub fn new() -> Self {
        Self::at_position(25)
    }

    pub fn at_position(position: u32) -> Self {
        Self {
            position: Cell::new(position % SIM_STEPS_PER_REV),
            now_ms: Cell::new(0),
            lost_steps: Cell::new(0),
            loss_schedule: RefCell::new(Vec::new()),
            marker_blocked: Cell::new(false),
            hall_dead: Cell::new(false),
            driver_fault: Cell::new(false),
            sensor_fail: Cell::new(false),
            led_fail: Cell::new(None),
            leds_overlapped: Cell::new(false),
            camera_start_fail: Cell::new(false),
            capture_fail: Cell::new(PlateSet::empty()),
            focus_polls: Cell::new(2),
            sink_fail: Cell::new(false),
            records: RefCell::new(Vec::new()),
            cancel: CancelToken::new(),
            cancel_after: Cell::new(None),
            pulses: Cell::new(0),
            cancel_on_capture: Cell::new(None),
            ops: RefCell::new(Vec::new()),
        }
    }

    /// Lose `steps` pulses starting with the first pulse at or after `at_ms`
    pub fn inject_step_loss(&self, at_ms: u64, steps: u32) {
        self.loss_schedule.borrow_mut().push((at_ms, steps));
    }

    /// Cancel [`World::cancel`] after `steps` more pulses
    pub fn cancel_after_steps(&self, steps: u32) {
        self.cancel_after.set(Some(self.pulses.get() + steps));
    }

    /// Cancel [`World::cancel`] right after `plate` is captured
    pub fn cancel_after_capture(&self, plate: u8) {
        self.cancel_on_capture.set(Some(plate));
    }

    pub fn ops(&self) -> Vec<Op> {
        self.ops.borrow().iter().map(|(_, op)| *op).collect()
    }

    pub fn timed_ops(&self) -> Vec<(u64, Op)> {
        self.ops.borrow().clone()
    }

    pub fn clear_ops(&self) {
        self.ops.borrow_mut().clear();
    }

    pub fn total_steps(&self) -> u32 {
        self.ops()
            .iter()
            .map(|op| match op {
                Op::Steps(n) => *n,
                _ => 0,
            })
            .sum()
    }

    fn log(&self, op: Op) {
        let now = self.now_ms.get();
        let mut ops = self.ops.borrow_mut();
        if let (Op::Steps(1), Some((_, Op::Steps(n)))) = (op, ops.last_mut()) {
            *n += 1;
            return;
        }
        ops.push((now, op));
    }

    fn pulse(&self) {
        let now = self.now_ms.get();
        let mut schedule = self.loss_schedule.borrow_mut();
        schedule.retain(|(at, steps)| {
            if now >= *at {
                self.lost_steps.set(self.lost_steps.get() + steps);
                false
            } else {
                true
            }
        });

        if self.lost_steps.get() > 0 {
            self.lost_steps.set(self.lost_steps.get() - 1);
        } else {
            self.position
                .set((self.position.get() + 1) % SIM_STEPS_PER_REV);
        }
        self.log(Op::Steps(1));

        self.pulses.set(self.pulses.get() + 1);
        if self.cancel_after.get() == Some(self.pulses.get()) {
            self.cancel.cancel();
        }
    }
}

pub struct FakeStepper<'a> {
    world: &'a World,
    enabled: bool,
    pub rate: StepRate,
}

impl<'a> FakeStepper<'a> {
    pub fn new(world: &'a World) -> Self {
        Self {
            world,
            enabled: false,
            rate: StepRate::Precise,
        }
    }
}

impl StepperDriver for FakeStepper<'_> {
    fn set_enabled(&mut self, enabled: bool) -> Result<(), StepperError> {
        self.enabled = enabled;
        self.world.log(Op::Enable(enabled));
        Ok(())
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn set_direction(&mut self, dir: Direction) -> Result<(), StepperError> {
        assert_eq!(dir, Direction::Clockwise, "carousel only turns forward");
        Ok(())
    }

    fn set_rate(&mut self, rate: StepRate) {
        self.rate = rate;
    }

    async fn step(&mut self) -> Result<(), StepperError> {
        assert!(self.enabled, "step pulse on a released motor");
        self.world.pulse();
        Ok(())
    }

    fn is_faulted(&mut self) -> bool {
        self.world.driver_fault.get()
    }
}

pub struct FakeSensors<'a> {
    world: &'a World,
}

impl<'a> FakeSensors<'a> {
    pub fn new(world: &'a World) -> Self {
        Self { world }
    }
}

impl PositionSensors for FakeSensors<'_> {
    fn home_triggered(&mut self) -> Result<bool, SensorError> {
        if self.world.sensor_fail.get() {
            return Err(SensorError::ReadFailed);
        }
        let p = self.world.position.get();
        Ok(!self.world.hall_dead.get() && (p == 0 || p >= SIM_STEPS_PER_REV - HALL_WINDOW))
    }

    fn marker_aligned(&mut self) -> Result<bool, SensorError> {
        if self.world.sensor_fail.get() {
            return Err(SensorError::ReadFailed);
        }
        Ok(!self.world.marker_blocked.get() && self.world.position.get() == 0)
    }
}

pub struct FakeLeds<'a> {
    world: &'a World,
    green: bool,
    infrared: bool,
}

impl<'a> FakeLeds<'a> {
    pub fn new(world: &'a World) -> Self {
        Self {
            world,
            green: false,
            infrared: false,
        }
    }
}

impl LedOutputs for FakeLeds<'_> {
    fn set(&mut self, channel: IlluminationMode, on: bool) -> Result<(), IlluminationError> {
        if self.world.led_fail.get() == Some(channel) {
            return Err(IlluminationError::OutputFailed(channel));
        }
        match channel {
            IlluminationMode::Green => self.green = on,
            IlluminationMode::Infrared => self.infrared = on,
        }
        if self.green && self.infrared {
            self.world.leds_overlapped.set(true);
        }
        self.world.log(Op::Led(channel, on));
        Ok(())
    }

    fn is_on(&self, channel: IlluminationMode) -> bool {
        match channel {
            IlluminationMode::Green => self.green,
            IlluminationMode::Infrared => self.infrared,
        }
    }
}

pub struct FakeCamera<'a> {
    world: &'a World,
    started: bool,
    ae_enabled: bool,
    polls_left: Option<u32>,
}

impl<'a> FakeCamera<'a> {
    pub fn new(world: &'a World) -> Self {
        Self {
            world,
            started: false,
            ae_enabled: true,
            polls_left: None,
        }
    }
}

impl Camera for FakeCamera<'_> {
    async fn start(&mut self) -> Result<(), CameraError> {
        if self.world.camera_start_fail.get() {
            return Err(CameraError::StartFailed);
        }
        self.started = true;
        self.world.log(Op::CameraStart);
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), CameraError> {
        self.started = false;
        self.world.log(Op::CameraStop);
        Ok(())
    }

    fn apply_settings(&mut self, settings: &CameraSettings) -> Result<(), CameraError> {
        self.ae_enabled = settings.ae_enable;
        self.world.log(Op::Settings);
        Ok(())
    }

    fn set_auto_exposure(&mut self, enabled: bool) -> Result<(), CameraError> {
        self.ae_enabled = enabled;
        self.world.log(Op::AutoExposure(enabled));
        Ok(())
    }

    fn set_af_mode(&mut self, mode: AfMode) -> Result<(), CameraError> {
        self.world.log(Op::AfMode(mode));
        Ok(())
    }

    fn trigger_autofocus(&mut self) -> Result<(), CameraError> {
        self.polls_left = Some(self.world.focus_polls.get());
        self.world.log(Op::AfTrigger);
        Ok(())
    }

    fn focus_state(&mut self) -> Result<FocusState, CameraError> {
        Ok(match self.polls_left {
            None => FocusState::Idle,
            Some(0) => FocusState::Focused,
            Some(n) => {
                if n != u32::MAX {
                    self.polls_left = Some(n - 1);
                }
                FocusState::Scanning
            }
        })
    }

    async fn capture_still(&mut self, context: &CaptureContext) -> Result<StillFrame, CameraError> {
        if !self.started {
            return Err(CameraError::NotStarted);
        }
        if self.world.capture_fail.get().contains(context.plate) {
            return Err(CameraError::CaptureFailed);
        }
        self.world.log(Op::Capture(context.plate.get()));
        if self.world.cancel_on_capture.get() == Some(context.plate.get()) {
            self.world.cancel.cancel();
        }

        let mut path = String::new();
        let _ = write!(
            path,
            "cycle_{:03}/plate_{}.jpg",
            context.cycle,
            context.plate.get()
        );
        Ok(StillFrame {
            path,
            width: 4608,
            height: 2592,
            file_size_bytes: 1_048_576,
            metadata: ExposureMetadata {
                ae_enabled: self.ae_enabled,
                exposure_time_us: 20_000,
                analogue_gain: 1.0,
                awb_enabled: true,
            },
        })
    }
}

/// Delay and clock over simulated time
///
/// Optionally trips a cancel token once simulated time reaches a deadline,
/// which lets tests cancel at an exact point of the run.
pub struct FakeTime<'a> {
    world: &'a World,
    cancel_at: Option<(&'a CancelToken, u64)>,
}

impl<'a> FakeTime<'a> {
    pub fn new(world: &'a World) -> Self {
        Self {
            world,
            cancel_at: None,
        }
    }

    pub fn cancelling_at(world: &'a World, token: &'a CancelToken, at_ms: u64) -> Self {
        Self {
            world,
            cancel_at: Some((token, at_ms)),
        }
    }

    fn advance(&mut self, ms: u64) {
        let now = self.world.now_ms.get() + ms;
        self.world.now_ms.set(now);
        if let Some((token, at)) = self.cancel_at {
            if now >= at {
                token.cancel();
            }
        }
    }
}

impl DelayNs for FakeTime<'_> {
    async fn delay_ns(&mut self, ns: u32) {
        self.advance(u64::from(ns) / 1_000_000);
    }

    async fn delay_us(&mut self, us: u32) {
        self.advance(u64::from(us) / 1000);
    }

    async fn delay_ms(&mut self, ms: u32) {
        self.advance(u64::from(ms));
    }
}

impl Clock for FakeTime<'_> {
    fn now_ms(&self) -> u64 {
        self.world.now_ms.get()
    }
}

pub struct RecordingSink<'a> {
    world: &'a World,
}

impl<'a> RecordingSink<'a> {
    pub fn new(world: &'a World) -> Self {
        Self { world }
    }
}

impl MetadataSink for RecordingSink<'_> {
    fn record(&mut self, record: CaptureRecord) -> Result<(), SinkError> {
        if self.world.sink_fail.get() {
            return Err(SinkError::WriteFailed);
        }
        self.world.records.borrow_mut().push(record);
        Ok(())
    }
}

/// Plate shorthand for tests
pub fn plate(n: u8) -> PlateIndex {
    PlateIndex::new(n).unwrap()
}

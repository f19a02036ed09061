//! Experiment execution
//!
//! One [`ExperimentRunner`] executes one experiment. It owns every piece of
//! hardware it touches, so nothing else can move the carousel or switch an
//! LED while a run is in progress.

use embedded_hal_async::delay::DelayNs;

use super::cancel::CancelToken;
use super::events::{EventPublisher, RunEvent, RunSummary};
use crate::capture::CapturePipeline;
use crate::config::{ExperimentConfig, PlateIndex, RunnerTimings};
use crate::error::RunError;
use crate::illumination::IlluminationController;
use crate::motion::{Carousel, DriftReport, MotorError};
use crate::safety::{DriftMonitor, SafetyStatus};
use crate::state::{RunState, Trigger};
use crate::traits::{
    Camera, CaptureContext, Clock, LedOutputs, MetadataSink, PositionSensors, StepperDriver,
};

/// How a run ended
///
/// Cancellation is a normal end: `Ok` with `cancelled` set in the summary.
pub type RunOutcome = Result<RunSummary, RunError>;

/// Executes one experiment from homing to completion or cancellation
pub struct ExperimentRunner<'a, S, P, L, C, D, K, M> {
    experiment: ExperimentConfig,
    tick_ms: u32,
    carousel: Carousel<S, P>,
    illumination: IlluminationController<L>,
    capture: CapturePipeline<C>,
    delay: D,
    clock: K,
    sink: M,
    events: EventPublisher<'a>,
    cancel: &'a CancelToken,
    drift_monitor: DriftMonitor,
    state: RunState,
    summary: RunSummary,
    outcome: Option<RunOutcome>,
}

impl<'a, S, P, L, C, D, K, M> ExperimentRunner<'a, S, P, L, C, D, K, M>
where
    S: StepperDriver,
    P: PositionSensors,
    L: LedOutputs,
    C: Camera,
    D: DelayNs,
    K: Clock,
    M: MetadataSink,
{
    /// Create a runner for one experiment
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        experiment: ExperimentConfig,
        timings: &RunnerTimings,
        carousel: Carousel<S, P>,
        illumination: IlluminationController<L>,
        capture: CapturePipeline<C>,
        delay: D,
        clock: K,
        sink: M,
        events: EventPublisher<'a>,
        cancel: &'a CancelToken,
    ) -> Self {
        Self {
            experiment,
            tick_ms: timings.tick_ms.max(1),
            carousel,
            illumination,
            capture,
            delay,
            clock,
            sink,
            events,
            cancel,
            drift_monitor: DriftMonitor::new(timings.max_consecutive_drift_failures),
            state: RunState::Idle,
            summary: RunSummary::default(),
            outcome: None,
        }
    }

    /// Current run state
    pub fn state(&self) -> RunState {
        self.state
    }

    /// Totals so far
    pub fn summary(&self) -> RunSummary {
        self.summary
    }

    /// The experiment being run
    pub fn experiment(&self) -> &ExperimentConfig {
        &self.experiment
    }

    /// Execute the experiment
    ///
    /// A runner runs once; calling this again returns the first outcome.
    pub async fn run(&mut self) -> RunOutcome {
        if let Some(outcome) = self.outcome {
            return outcome;
        }
        let outcome = self.execute().await;
        self.outcome = Some(outcome);
        outcome
    }

    async fn execute(&mut self) -> RunOutcome {
        self.fire(Trigger::Start);
        info!(
            "starting experiment: {} plates, {} every {} min for {} days",
            self.experiment.plates().len(),
            self.experiment.illumination().as_str(),
            self.experiment.frequency_minutes(),
            self.experiment.duration_days()
        );
        self.check_cycle_budget();

        debug_assert!(self.state.motor_allowed());
        match self.carousel.home(self.cancel).await {
            Ok(report) => self.publish(RunEvent::Homed(report)),
            Err(MotorError::Cancelled) => return self.cancel_run(None).await,
            Err(e) => return self.fail(e.into()).await,
        }
        if let Err(e) = self.capture.start().await {
            return self.fail(RunError::CaptureError(e)).await;
        }
        self.fire(Trigger::Homed);

        if self.cancel.is_cancelled() {
            return self.cancel_run(None).await;
        }

        let run_start = self.clock.now_ms();
        let run_end = run_start.saturating_add(self.experiment.duration_ms());
        let period = self.experiment.period_ms();
        let mut cycle: u32 = 0;
        let mut cycle_start = run_start;

        loop {
            self.publish(RunEvent::CycleStarted { cycle });
            info!("cycle {} started", cycle);

            match self.run_cycle(cycle).await {
                Ok(()) => {}
                Err(RunError::CancelledByUser) => return self.cancel_run(Some(cycle)).await,
                Err(e) => return self.fail(e).await,
            }

            self.summary.cycles_completed += 1;
            self.publish(RunEvent::CycleCompleted { cycle });

            let next_start = cycle_start.saturating_add(period);
            let limit_reached = self
                .experiment
                .cycle_limit()
                .is_some_and(|limit| self.summary.cycles_completed >= limit);
            // The wrap has no checkpoint of its own
            if self.checkpoint().is_err() {
                return self.cancel_run(None).await;
            }
            if limit_reached || next_start >= run_end {
                break;
            }

            let now = self.clock.now_ms();
            if now > next_start {
                let late_ms = now - next_start;
                warn!("cycle {} starts {} ms late", cycle + 1, late_ms);
                self.publish(RunEvent::CycleOverrun {
                    cycle: cycle + 1,
                    late_ms,
                });
                cycle_start = now;
            } else {
                if self.sleep_until(next_start).await.is_err() {
                    return self.cancel_run(None).await;
                }
                cycle_start = next_start;
            }

            self.fire(Trigger::IntervalElapsed);
            cycle += 1;
        }

        self.finish().await
    }

    /// One pass over all six plates, ending back at plate 1
    async fn run_cycle(&mut self, cycle: u32) -> Result<(), RunError> {
        // Normally a no-op: the previous wrap already left the carousel here
        if let Some(report) = self.carousel.goto_plate(PlateIndex::FIRST).await? {
            self.check_drift(report)?;
        }

        for plate in PlateIndex::all() {
            if self.experiment.plates().contains(plate) {
                self.image_plate(cycle, plate).await?;
            } else {
                trace!("passing plate {}", plate.get());
                self.fire(Trigger::SkipPlate);
            }

            debug_assert!(self.state.motor_allowed());
            let report = self.carousel.advance_to_next_plate().await?;
            self.check_drift(report)?;

            if report.plate_wrapped {
                self.fire(Trigger::CycleFinished);
            } else {
                self.fire(Trigger::PlatesRemaining);
                self.checkpoint()?;
            }
        }
        Ok(())
    }

    /// Illuminate, settle, capture and darken one selected plate
    async fn image_plate(&mut self, cycle: u32, plate: PlateIndex) -> Result<(), RunError> {
        let illumination = self.experiment.illumination();

        self.publish(RunEvent::PlateSelected { cycle, plate });
        self.fire(Trigger::SelectPlate);

        debug_assert!(self.state.illumination_allowed());
        self.illumination.set_channel(Some(illumination))?;
        if let Err(e) = self.capture.begin_settle() {
            warn!("plate {}: focus not started: {}", plate.get(), e.as_str());
        }
        self.publish(RunEvent::SettlingStarted { plate });

        self.sleep_ms(self.experiment.settle_ms()).await?;

        self.publish(RunEvent::SettlingFinished { plate });
        self.fire(Trigger::SettleElapsed);

        let context = CaptureContext {
            timestamp_ms: self.clock.now_ms(),
            cycle,
            plate,
            illumination,
        };
        match self.capture.capture_still(context, &mut self.delay).await {
            Ok(record) => {
                self.summary.images_captured += 1;
                debug!("plate {}: captured", plate.get());
                self.publish(RunEvent::ImageCaptured(record.clone()));
                if self.sink.record(record).is_err() {
                    warn!("plate {}: metadata sink rejected record", plate.get());
                    self.publish(RunEvent::SinkFailed { plate });
                }
            }
            Err(error) => {
                self.summary.captures_skipped += 1;
                warn!("plate {}: capture skipped: {}", plate.get(), error.as_str());
                self.publish(RunEvent::CaptureSkipped { plate, error });
            }
        }

        self.illumination.set_channel(None)?;
        self.fire(Trigger::CaptureDone);
        self.checkpoint()
    }

    /// Report a wrap and decide whether the run can go on
    fn check_drift(&mut self, report: DriftReport) -> Result<(), RunError> {
        if !report.plate_wrapped {
            return Ok(());
        }
        self.publish(RunEvent::DriftReported(report));

        match self.drift_monitor.record(&report) {
            SafetyStatus::Ok => Ok(()),
            SafetyStatus::Warning { consecutive } => {
                self.summary.drift_failures += 1;
                warn!("drift correction failed ({} in a row)", consecutive);
                self.publish(RunEvent::DriftCorrectionFailed { consecutive });
                Ok(())
            }
            SafetyStatus::Fault(e) => {
                self.summary.drift_failures += 1;
                Err(e)
            }
        }
    }

    /// Sleep in tick-sized chunks, observing cancellation between chunks
    async fn sleep_ms(&mut self, ms: u32) -> Result<(), RunError> {
        let mut remaining = ms;
        while remaining > 0 {
            self.checkpoint()?;
            let chunk = remaining.min(self.tick_ms);
            self.delay.delay_ms(chunk).await;
            remaining -= chunk;
        }
        self.checkpoint()
    }

    /// Sleep until the clock reaches `deadline_ms`
    async fn sleep_until(&mut self, deadline_ms: u64) -> Result<(), RunError> {
        loop {
            self.checkpoint()?;
            let now = self.clock.now_ms();
            if now >= deadline_ms {
                return Ok(());
            }
            let chunk = (deadline_ms - now).min(u64::from(self.tick_ms)) as u32;
            self.delay.delay_ms(chunk).await;
        }
    }

    fn checkpoint(&self) -> Result<(), RunError> {
        if self.cancel.is_cancelled() {
            Err(RunError::CancelledByUser)
        } else {
            Ok(())
        }
    }

    /// Drive LEDs off, stop the motor and the camera
    ///
    /// Every step is attempted; the first failure is returned.
    async fn safe_hardware(&mut self, release_motor: bool) -> Result<(), RunError> {
        let lights = self.illumination.all_off();
        let motor = if release_motor {
            self.carousel.release()
        } else {
            self.carousel.halt()
        };
        let camera = self.capture.stop().await;

        lights?;
        motor?;
        camera?;
        Ok(())
    }

    async fn cancel_run(&mut self, partial_cycle: Option<u32>) -> RunOutcome {
        info!("cancelling run");
        self.fire(Trigger::CancelRequested);

        if let Err(e) = self.safe_hardware(false).await {
            return self.fail(e).await;
        }

        if let Some(cycle) = partial_cycle {
            self.publish(RunEvent::CycleAborted { cycle });
        }
        self.fire(Trigger::HardwareSafed);

        self.summary.cancelled = true;
        self.publish(RunEvent::RunCompleted(self.summary));
        Ok(self.summary)
    }

    async fn finish(&mut self) -> RunOutcome {
        if let Err(e) = self.safe_hardware(false).await {
            return self.fail(e).await;
        }
        self.fire(Trigger::RunFinished);

        info!(
            "experiment complete: {} cycles, {} images",
            self.summary.cycles_completed,
            self.summary.images_captured
        );
        self.publish(RunEvent::RunCompleted(self.summary));
        Ok(self.summary)
    }

    async fn fail(&mut self, error: RunError) -> RunOutcome {
        error!("run failed: {}", error.reason());
        self.fire(Trigger::Fault(error));

        if let Err(e) = self.safe_hardware(true).await {
            error!("safing after failure incomplete: {}", e.reason());
        }

        self.publish(RunEvent::RunFailed(error));
        Err(error)
    }

    fn fire(&mut self, trigger: Trigger) {
        let next = self.state.transition(trigger);
        if next != self.state {
            trace!("{} -> {}", self.state.as_str(), next.as_str());
        }
        self.state = next;
    }

    fn publish(&self, event: RunEvent) {
        self.events.publish_immediate(event);
    }

    /// Warn when one cycle cannot fit in the acquisition period
    fn check_cycle_budget(&self) {
        let per_plate = u64::from(self.experiment.settle_ms());
        let budget = per_plate * u64::from(self.experiment.plates().len());
        if budget >= self.experiment.period_ms() {
            warn!(
                "settle time alone ({} ms per cycle) exceeds the {} min period",
                budget,
                self.experiment.frequency_minutes()
            );
        }
    }
}

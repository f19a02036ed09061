//! Capture pipeline
//!
//! Wraps the camera with the per-plate focus and exposure sequence:
//! autofocus is triggered when settling starts, exposure is locked for
//! the still, and auto exposure is always restored afterwards.

use embedded_hal_async::delay::DelayNs;

use super::record::CaptureRecord;
use crate::config::{CameraSettings, RunnerTimings};
use crate::traits::{AfMode, Camera, CameraError, CaptureContext, FocusState};

/// Camera plus the focus/exposure protocol around each still
pub struct CapturePipeline<C> {
    camera: C,
    settings: CameraSettings,
    autofocus_timeout_ms: u32,
    focus_poll_ms: u32,
    started: bool,
}

impl<C: Camera> CapturePipeline<C> {
    /// Create a pipeline; the camera is not started yet
    pub fn new(camera: C, settings: CameraSettings, timings: &RunnerTimings) -> Self {
        Self {
            camera,
            settings,
            autofocus_timeout_ms: timings.autofocus_timeout_ms,
            // Zero would spin without yielding
            focus_poll_ms: timings.focus_poll_ms.max(1),
            started: false,
        }
    }

    /// Check if the camera is running
    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Start the camera for a run
    ///
    /// Applies the camera settings and selects single-pass autofocus.
    pub async fn start(&mut self) -> Result<(), CameraError> {
        self.camera.start().await?;
        self.started = true;
        self.camera.apply_settings(&self.settings)?;
        self.camera.set_af_mode(AfMode::Auto)?;
        info!("camera started");
        Ok(())
    }

    /// Prepare framing at the start of a plate's settle period
    ///
    /// Re-enables auto exposure (when it is used for framing) so it can
    /// adapt to the new plate, and starts an autofocus pass.
    pub fn begin_settle(&mut self) -> Result<(), CameraError> {
        if self.settings.ae_enable {
            self.camera.set_auto_exposure(true)?;
        }
        self.camera.trigger_autofocus()
    }

    /// Focus, lock exposure and capture one full-resolution still
    ///
    /// Auto exposure is restored afterwards even when the capture failed.
    pub async fn capture_still<D: DelayNs>(
        &mut self,
        context: CaptureContext,
        delay: &mut D,
    ) -> Result<CaptureRecord, CameraError> {
        if !self.started {
            return Err(CameraError::NotStarted);
        }

        let lock_exposure = self.settings.ae_enable;
        if lock_exposure {
            self.camera.set_auto_exposure(false)?;
        }

        let result = self.focus_and_capture(&context, delay).await;

        // The image is already saved; the next settle re-enables AE anyway
        if lock_exposure {
            if let Err(e) = self.camera.set_auto_exposure(true) {
                warn!("failed to restore auto exposure: {}", e.as_str());
            }
        }

        result
    }

    /// Stop the camera (no-op when not started)
    pub async fn stop(&mut self) -> Result<(), CameraError> {
        if !self.started {
            return Ok(());
        }
        self.started = false;
        self.camera.stop().await?;
        info!("camera stopped");
        Ok(())
    }

    async fn focus_and_capture<D: DelayNs>(
        &mut self,
        context: &CaptureContext,
        delay: &mut D,
    ) -> Result<CaptureRecord, CameraError> {
        self.camera.trigger_autofocus()?;
        let focused = self.wait_for_focus(delay).await?;
        if !focused {
            warn!(
                "plate {}: capturing without focus convergence",
                context.plate.get()
            );
        }

        let frame = self.camera.capture_still(context).await?;
        Ok(CaptureRecord::new(context, frame, focused))
    }

    /// Poll the autofocus state until the pass ends or the timeout elapses
    async fn wait_for_focus<D: DelayNs>(&mut self, delay: &mut D) -> Result<bool, CameraError> {
        let mut waited_ms: u32 = 0;
        loop {
            let state = self.camera.focus_state()?;
            if state.is_settled() {
                return Ok(state == FocusState::Focused);
            }
            if waited_ms >= self.autofocus_timeout_ms {
                debug!("autofocus timed out after {} ms", waited_ms);
                return Ok(false);
            }
            delay.delay_ms(self.focus_poll_ms).await;
            waited_ms = waited_ms.saturating_add(self.focus_poll_ms);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IlluminationMode;
    use crate::testing::{plate, sim_timings, FakeCamera, FakeTime, Op, World};
    use embassy_futures::block_on;

    fn context(plate_no: u8) -> CaptureContext {
        CaptureContext {
            timestamp_ms: 1234,
            cycle: 2,
            plate: plate(plate_no),
            illumination: IlluminationMode::Infrared,
        }
    }

    fn started(world: &World, settings: CameraSettings) -> CapturePipeline<FakeCamera<'_>> {
        let mut pipeline = CapturePipeline::new(FakeCamera::new(world), settings, &sim_timings());
        block_on(pipeline.start()).unwrap();
        world.clear_ops();
        pipeline
    }

    #[test]
    fn test_start_applies_settings_and_single_af() {
        let world = World::new();
        let mut pipeline =
            CapturePipeline::new(FakeCamera::new(&world), CameraSettings::default(), &sim_timings());

        block_on(pipeline.start()).unwrap();
        assert!(pipeline.is_started());
        assert_eq!(
            world.ops(),
            [Op::CameraStart, Op::Settings, Op::AfMode(AfMode::Auto)]
        );
    }

    #[test]
    fn test_start_failure() {
        let world = World::new();
        world.camera_start_fail.set(true);
        let mut pipeline =
            CapturePipeline::new(FakeCamera::new(&world), CameraSettings::default(), &sim_timings());

        assert_eq!(block_on(pipeline.start()), Err(CameraError::StartFailed));
        assert!(!pipeline.is_started());
    }

    #[test]
    fn test_capture_locks_and_restores_exposure() {
        let world = World::new();
        let mut pipeline = started(&world, CameraSettings::default());
        let mut time = FakeTime::new(&world);

        pipeline.begin_settle().unwrap();
        let record = block_on(pipeline.capture_still(context(3), &mut time)).unwrap();

        assert_eq!(
            world.ops(),
            [
                Op::AutoExposure(true),
                Op::AfTrigger,
                Op::AutoExposure(false),
                Op::AfTrigger,
                Op::Capture(3),
                Op::AutoExposure(true),
            ]
        );
        assert_eq!(record.plate, plate(3));
        assert_eq!(record.cycle, 2);
        assert_eq!(record.timestamp_ms, 1234);
        assert_eq!(record.illumination, IlluminationMode::Infrared);
        assert_eq!(record.image_path.as_str(), "cycle_002/plate_3.jpg");
        assert!(!record.ae_enabled);
        assert!(record.focus_converged);
        // Two Scanning polls before Focused
        assert_eq!(world.now_ms.get(), 100);
    }

    #[test]
    fn test_manual_exposure_is_left_alone() {
        let world = World::new();
        let settings = CameraSettings {
            ae_enable: false,
            ..CameraSettings::default()
        };
        let mut pipeline = started(&world, settings);
        let mut time = FakeTime::new(&world);

        pipeline.begin_settle().unwrap();
        block_on(pipeline.capture_still(context(1), &mut time)).unwrap();

        assert!(!world
            .ops()
            .iter()
            .any(|op| matches!(op, Op::AutoExposure(_))));
    }

    #[test]
    fn test_focus_timeout_still_captures() {
        let world = World::new();
        world.focus_polls.set(u32::MAX);
        let mut pipeline = started(&world, CameraSettings::default());
        let mut time = FakeTime::new(&world);

        let record = block_on(pipeline.capture_still(context(4), &mut time)).unwrap();

        assert!(!record.focus_converged);
        assert_eq!(world.now_ms.get(), u64::from(sim_timings().autofocus_timeout_ms));
    }

    #[test]
    fn test_failed_capture_restores_exposure() {
        let world = World::new();
        world.capture_fail.set(crate::config::PlateSet::from_numbers(&[5]));
        let mut pipeline = started(&world, CameraSettings::default());
        let mut time = FakeTime::new(&world);

        let result = block_on(pipeline.capture_still(context(5), &mut time));

        assert_eq!(result, Err(CameraError::CaptureFailed));
        assert_eq!(world.ops().last(), Some(&Op::AutoExposure(true)));
    }

    #[test]
    fn test_capture_requires_start() {
        let world = World::new();
        let mut pipeline =
            CapturePipeline::new(FakeCamera::new(&world), CameraSettings::default(), &sim_timings());
        let mut time = FakeTime::new(&world);

        assert_eq!(
            block_on(pipeline.capture_still(context(1), &mut time)),
            Err(CameraError::NotStarted)
        );
        assert!(world.ops().is_empty());
    }

    #[test]
    fn test_stop_is_idempotent() {
        let world = World::new();
        let mut pipeline = started(&world, CameraSettings::default());

        block_on(pipeline.stop()).unwrap();
        block_on(pipeline.stop()).unwrap();
        assert_eq!(world.ops(), [Op::CameraStop]);
    }
}

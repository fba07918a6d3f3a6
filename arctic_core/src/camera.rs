//! The exposure controller (`Camera`).
//!
//! Owns the session state machine. `Reading` and `ImageRead` are never
//! entered by a command; they are observed by sampling the gateway in
//! [`Camera::exposure_state`], so callers poll to see progress.

use std::path::Path;
use std::sync::Arc;

use arctic_traits::clock::Clock;
use arctic_traits::opcodes::{
    ADDR_BIN_COL, ADDR_BIN_ROW, ADDR_IMAGE_COLS, ADDR_IMAGE_ROWS, CSH, DON, OSH, PEX, REX, SET,
    SEX, SOS, SPS, SSP, SSS, SXY, TIM_ID, WRM, Y_MEM,
};
use arctic_traits::{Deinterlacer, DeviceGateway, ImageWriter};

use crate::builder::{CameraBuilder, ControllerSettings, Missing};
use crate::camera_config::{CameraConfig, ReadoutAmps, x_skip_for_bin};
use crate::error::{CameraError, ConfigError, Result, StateError};
use crate::hw_error::map_hw_error;
use crate::protocol::run_command;
use crate::state::{ExposureKind, ExposureState, StateEnum};
use crate::timing::{SegmentClock, estimate_read_time};

/// Below this many seconds left, `stop_exposure` lets the exposure finish.
pub const STOP_THRESHOLD_SECS: f64 = 0.1;

/// Columns skipped past the window before the bias region ("odd gunk").
const SSP_BIAS_GAP: u32 = 5;

#[derive(Debug, Clone)]
struct ExposureSession {
    name: String,
    kind: ExposureKind,
    commanded: f64,
    /// Set by an early stop, or on first sight of readout.
    estimated: Option<f64>,
    segment: SegmentClock,
}

/// Exposure controller for one CCD.
pub struct Camera<G: DeviceGateway> {
    gateway: G,
    clock: Arc<dyn Clock + Send + Sync>,
    config: CameraConfig,
    session: Option<ExposureSession>,
    /// The shared buffer was zeroed and no readout has been seen since.
    buffer_cleared: bool,
}

impl<G: DeviceGateway> core::fmt::Debug for Camera<G> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Camera")
            .field("config", &self.config)
            .field("session", &self.session)
            .field("buffer_cleared", &self.buffer_cleared)
            .finish_non_exhaustive()
    }
}

impl<G: DeviceGateway> Camera<G> {
    pub fn builder() -> CameraBuilder<G, Missing> {
        CameraBuilder::default()
    }

    /// Open the controller, load firmware and program `config`.
    pub(crate) fn connect(
        mut gateway: G,
        clock: Arc<dyn Clock + Send + Sync>,
        settings: &ControllerSettings,
        config: CameraConfig,
    ) -> Result<Self> {
        let count = gateway.device_count();
        if count < 1 {
            return Err(CameraError::Device(String::from(
                "no controller interface found",
            )));
        }
        let (width, height) = (CameraConfig::max_width(), CameraConfig::max_height());
        tracing::info!(
            device_index = settings.device_index,
            count,
            width,
            height,
            "opening controller"
        );
        gateway
            .open(settings.device_index, CameraConfig::max_image_bytes())
            .map_err(|e| map_hw_error("open device", &*e))?;

        // From here on Drop closes the device on any failure.
        let mut camera = Self {
            gateway,
            clock,
            config: CameraConfig::default(),
            session: None,
            buffer_cleared: false,
        };
        if !camera.gateway.is_controller_connected() {
            return Err(CameraError::Device(String::from(
                "controller is disconnected or powered off",
            )));
        }
        tracing::debug!(
            reset = settings.reset,
            load_timing_firmware = settings.load_timing_firmware,
            power_on = settings.power_on,
            firmware = %settings.timing_firmware.display(),
            "setting up controller"
        );
        camera
            .gateway
            .setup_controller(
                settings.reset,
                settings.load_timing_firmware,
                settings.power_on,
                height,
                width,
                &settings.timing_firmware,
            )
            .map_err(|e| map_hw_error("setup controller", &*e))?;

        camera.set_config(config)?;
        camera.set_idle()?;
        Ok(camera)
    }

    pub fn config(&self) -> &CameraConfig {
        &self.config
    }

    /// Shared handle to the clock used for segment timing.
    pub fn clock(&self) -> Arc<dyn Clock + Send + Sync> {
        Arc::clone(&self.clock)
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn gateway_mut(&mut self) -> &mut G {
        &mut self.gateway
    }

    /// Name of the current exposure, used as the output path on save.
    pub fn exposure_name(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.name.as_str())
    }

    pub fn exposure_kind(&self) -> Option<ExposureKind> {
        self.session.as_ref().map(|s| s.kind)
    }

    pub fn commanded_duration(&self) -> Option<f64> {
        self.session.as_ref().map(|s| s.commanded)
    }

    /// Actual exposure time, known after an early stop or once readout began.
    pub fn estimated_duration(&self) -> Option<f64> {
        self.session.as_ref().and_then(|s| s.estimated)
    }

    /// Sample the gateway and report where the exposure is.
    ///
    /// `Exposing` versus `ImageRead` is decided by peeking at the first byte
    /// of the shared buffer, which was zeroed at start. This is a heuristic:
    /// an image whose first pixel has a zero low byte looks like an exposure
    /// still in progress. Seeing a readout clears `buffer_cleared`, so once
    /// the readout ends the state moves on to `ImageRead` regardless.
    pub fn exposure_state(&mut self) -> ExposureState {
        let Some(session) = self.session.as_mut() else {
            return ExposureState::Idle;
        };
        if session.segment.is_paused() {
            return ExposureState::Paused {
                full_time: session.commanded,
                rem_time: session.segment.stored_remaining(),
            };
        }
        if self.gateway.is_readout() {
            self.buffer_cleared = false;
            let total =
                u64::from(self.config.binned_width()) * u64::from(self.config.binned_height());
            let remaining = total.saturating_sub(self.gateway.pixel_count());
            // Not stopped early, so assume it ran the full time.
            session.estimated.get_or_insert(session.commanded);
            let rate = self.config.readout_rate;
            return ExposureState::Reading {
                full_time: estimate_read_time(rate, total),
                rem_time: estimate_read_time(rate, remaining),
            };
        }
        if self.buffer_cleared && self.gateway.common_buffer().first() == Some(&0) {
            return ExposureState::Exposing {
                full_time: session.commanded,
                rem_time: session.segment.remaining(&*self.clock),
            };
        }
        ExposureState::ImageRead
    }

    pub fn is_busy(&mut self) -> bool {
        self.exposure_state().is_busy()
    }

    /// Start an exposure of `exp_time` seconds.
    ///
    /// Bias exposures must have zero time. Bias and dark keep the shutter closed.
    pub fn start_exposure(
        &mut self,
        exp_time: f64,
        kind: ExposureKind,
        name: impl Into<String>,
    ) -> Result<()> {
        self.assert_idle("busy")?;
        // The controller takes whole milliseconds in a 32-bit word.
        let exp_ms = exp_time * 1000.0;
        if !exp_time.is_finite() || exp_time < 0.0 || exp_ms > f64::from(u32::MAX) {
            return Err(ConfigError::ExposureTime(exp_time).into());
        }
        if kind == ExposureKind::Bias && exp_time > 0.0 {
            return Err(ConfigError::BiasExposureTime(exp_time).into());
        }
        let name = name.into();

        self.clear_buffer()?;
        self.gateway
            .set_open_shutter(kind.opens_shutter())
            .map_err(|e| map_hw_error("set shutter", &*e))?;

        let exp_ms = exp_ms as u32;
        self.timing_cmd(&format!("set exposure time to {exp_ms} ms"), SET, exp_ms, 0, 0)?;
        self.timing_cmd("start exposure", SEX, 0, 0, 0)?;

        tracing::info!(name = %name, %kind, exp_time, "exposure started");
        self.session = Some(ExposureSession {
            name,
            kind,
            commanded: exp_time,
            estimated: None,
            segment: SegmentClock::start(exp_time, self.clock.now()),
        });
        Ok(())
    }

    pub fn pause_exposure(&mut self) -> Result<()> {
        self.require(StateEnum::Exposing, "no exposure to pause")?;
        self.timing_cmd("pause exposure", PEX, 0, 0, 0)?;
        if let Some(session) = self.session.as_mut() {
            session.segment.pause(&*self.clock);
            tracing::info!(
                rem_time = session.segment.stored_remaining(),
                "exposure paused"
            );
        }
        Ok(())
    }

    pub fn resume_exposure(&mut self) -> Result<()> {
        self.require(StateEnum::Paused, "no paused exposure to resume")?;
        self.timing_cmd("resume exposure", REX, 0, 0, 0)?;
        let now = self.clock.now();
        if let Some(session) = self.session.as_mut() {
            session.segment.resume(now);
        }
        tracing::info!("exposure resumed");
        Ok(())
    }

    /// End the exposure early and read it out.
    ///
    /// Does nothing if readout has begun or less than
    /// [`STOP_THRESHOLD_SECS`] remain.
    pub fn stop_exposure(&mut self) -> Result<()> {
        let state = self.exposure_state();
        match state {
            ExposureState::Reading { .. } => {
                tracing::debug!("stop ignored: already reading out");
                return Ok(());
            }
            ExposureState::Exposing { rem_time, .. } | ExposureState::Paused { rem_time, .. }
                if rem_time < STOP_THRESHOLD_SECS =>
            {
                tracing::debug!(rem_time, "stop ignored: exposure nearly done");
                return Ok(());
            }
            ExposureState::Exposing { .. } | ExposureState::Paused { .. } => {}
            ExposureState::Idle | ExposureState::ImageRead => {
                return Err(StateError {
                    reason: "no exposure to stop",
                    state: state.state(),
                }
                .into());
            }
        }

        let estimated = self
            .session
            .as_ref()
            .map(|s| s.segment.estimate_stopped_duration(s.commanded, &*self.clock));
        self.timing_cmd("stop exposure", SET, 0, 0, 0)?;
        if let Some(session) = self.session.as_mut() {
            session.estimated = estimated;
        }
        tracing::info!(?estimated, "exposure stopped early");
        Ok(())
    }

    /// Hard-stop the controller and discard the exposure.
    pub fn abort_exposure(&mut self) -> Result<()> {
        let state = self.exposure_state();
        if !state.is_busy() {
            return Err(StateError {
                reason: "no exposure to abort",
                state: state.state(),
            }
            .into());
        }
        tracing::debug!("gateway hard stop");
        self.gateway
            .stop_exposure()
            .map_err(|e| map_hw_error("stop exposure", &*e))?;
        tracing::info!(%state, "exposure aborted");
        self.set_idle()
    }

    /// Deinterlace the read image and hand it to `writer`.
    ///
    /// The session returns to idle whether or not this succeeds.
    pub fn save_image<D, W>(&mut self, deinterlacer: &mut D, writer: &mut W) -> Result<()>
    where
        D: Deinterlacer + ?Sized,
        W: ImageWriter + ?Sized,
    {
        self.require(StateEnum::ImageRead, "no image available to be read")?;
        let saved = self.persist(deinterlacer, writer);
        let idle = self.set_idle();
        match (saved, idle) {
            (Err(e), Err(cleanup)) => {
                tracing::warn!(error = %cleanup, "reset to idle failed after save error");
                Err(e)
            }
            (Err(e), Ok(())) => Err(e),
            (Ok(()), idle) => idle,
        }
    }

    fn persist<D, W>(&mut self, deinterlacer: &mut D, writer: &mut W) -> Result<()>
    where
        D: Deinterlacer + ?Sized,
        W: ImageWriter + ?Sized,
    {
        let name = self
            .session
            .as_ref()
            .map(|s| s.name.clone())
            .unwrap_or_default();
        let (width, height) = (self.config.binned_width(), self.config.binned_height());
        let bytes = self.config.image_bytes();
        let algorithm = self.config.readout_amps.deinterlace_algorithm();

        let buffer = self.gateway.common_buffer_mut();
        let available = buffer.len();
        let Some(pixels) = buffer.get_mut(..bytes) else {
            return Err(CameraError::Invariant(format!(
                "image needs {bytes} bytes but the shared buffer holds {available}"
            )));
        };

        tracing::debug!(rows = height, cols = width, ?algorithm, "deinterlacing");
        deinterlacer
            .run(pixels, height, width, algorithm)
            .map_err(|e| CameraError::Persistence(format!("deinterlace: {e}")))?;
        let path = Path::new(&name);
        writer
            .create(path, width, height)
            .map_err(|e| CameraError::Persistence(format!("create {name}: {e}")))?;
        writer
            .write(pixels)
            .map_err(|e| CameraError::Persistence(format!("write {name}: {e}")))?;
        tracing::info!(path = %name, width, height, "saved image");
        Ok(())
    }

    /// Validate `config`, program the controller and make it current.
    ///
    /// Nothing is sent if validation fails. If a command fails partway the
    /// previous configuration stays current, though the controller may hold
    /// a mix of both.
    pub fn set_config(&mut self, config: CameraConfig) -> Result<()> {
        tracing::info!(%config, "set_config");
        config.assert_valid()?;
        self.assert_idle("cannot change configuration while busy")?;

        self.timing_cmd(
            "set col bin factor",
            WRM,
            Y_MEM | ADDR_BIN_COL,
            config.bin_fac_col,
            0,
        )?;
        self.timing_cmd(
            "set row bin factor",
            WRM,
            Y_MEM | ADDR_BIN_ROW,
            config.bin_fac_row,
            0,
        )?;

        if config.is_full_window() {
            self.timing_cmd("set full window", SSS, 0, 0, 0)?;
        } else {
            // SSS: bias width, window width, window height.
            let x_extra = config.binned_width() - config.win_width;
            self.timing_cmd(
                "set window size",
                SSS,
                x_extra,
                config.win_width,
                config.win_height,
            )?;
            // SSP: window row, window col, offset to the bias region.
            let window_end = config.win_start_col + config.win_width;
            let after_data_gap = SSP_BIAS_GAP + config.binned_ccd_width() - window_end;
            self.timing_cmd(
                "set window position",
                SSP,
                config.win_start_row,
                config.win_start_col,
                after_data_gap,
            )?;
        }

        self.timing_cmd(
            "set readoutAmps",
            SOS,
            config.readout_amps.cmd_value(),
            DON as u32,
            0,
        )?;
        self.timing_cmd(
            "set readout rate",
            SPS,
            config.readout_rate.cmd_value(),
            DON as u32,
            0,
        )?;

        let x_skip = x_skip_for_bin(config.bin_fac_col).ok_or_else(|| {
            CameraError::Invariant(format!(
                "no x skip for col bin factor={}",
                config.bin_fac_col
            ))
        })?;
        if config.readout_amps == ReadoutAmps::Quad {
            let y_skip = u32::from(config.bin_fac_row == 3);
            self.timing_cmd("set xy skip for all amps", SXY, x_skip, y_skip, 0)?;
        } else {
            let x_skip = x_skip.saturating_sub(config.win_start_col);
            self.timing_cmd("set xy skip for one amp", SXY, x_skip, 0, 0)?;
        }

        self.timing_cmd(
            "set image width",
            WRM,
            Y_MEM | ADDR_IMAGE_COLS,
            config.binned_width(),
            0,
        )?;
        self.timing_cmd(
            "set image height",
            WRM,
            Y_MEM | ADDR_IMAGE_ROWS,
            config.binned_height(),
            0,
        )?;

        self.config = config;
        Ok(())
    }

    pub fn open_shutter(&mut self) -> Result<()> {
        self.assert_idle("cannot open shutter while busy")?;
        self.timing_cmd("open shutter", OSH, 0, 0, 0)
    }

    pub fn close_shutter(&mut self) -> Result<()> {
        self.assert_idle("cannot close shutter while busy")?;
        self.timing_cmd("close shutter", CSH, 0, 0, 0)
    }

    fn timing_cmd(
        &mut self,
        description: &str,
        cmd: u32,
        a1: u32,
        a2: u32,
        a3: u32,
    ) -> Result<()> {
        run_command(&mut self.gateway, description, TIM_ID, cmd, a1, a2, a3)
    }

    fn assert_idle(&mut self, reason: &'static str) -> Result<()> {
        let state = self.exposure_state();
        if state.is_busy() {
            return Err(StateError {
                reason,
                state: state.state(),
            }
            .into());
        }
        Ok(())
    }

    fn require(&mut self, expected: StateEnum, reason: &'static str) -> Result<()> {
        let state = self.exposure_state().state();
        if state != expected {
            return Err(StateError { reason, state }.into());
        }
        Ok(())
    }

    /// Zero the shared buffer so new data can be recognised.
    fn clear_buffer(&mut self) -> Result<()> {
        self.gateway
            .fill_common_buffer(0)
            .map_err(|e| map_hw_error("clear buffer", &*e))?;
        self.buffer_cleared = true;
        Ok(())
    }

    fn set_idle(&mut self) -> Result<()> {
        self.session = None;
        self.clear_buffer()
    }
}

impl<G: DeviceGateway> Drop for Camera<G> {
    fn drop(&mut self) {
        // A board left reading out stays tied up.
        if self.gateway.is_readout()
            && let Err(e) = self.gateway.stop_exposure()
        {
            tracing::warn!(error = %e, "stop_exposure failed on drop");
        }
        if let Err(e) = self.gateway.close() {
            tracing::warn!(error = %e, "close failed on drop");
        }
    }
}

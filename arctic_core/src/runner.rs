//! Blocking exposure loop: start, poll until the image is read, save.

use std::time::Duration;

use arctic_config::{Config, RunnerCfg};
use arctic_traits::{Deinterlacer, DeviceGateway, ImageWriter};
use eyre::WrapErr;

use crate::camera::Camera;
use crate::error::{CameraError, Result, StateError};
use crate::state::{ExposureKind, StateEnum};
use crate::timing::estimate_read_time;

/// Polling cadence and give-up margin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunnerOpts {
    pub poll: Duration,
    /// Slack on top of exposure plus estimated readout time.
    pub timeout_margin: Duration,
}

impl Default for RunnerOpts {
    fn default() -> Self {
        Self::from(&RunnerCfg::default())
    }
}

impl From<&RunnerCfg> for RunnerOpts {
    fn from(c: &RunnerCfg) -> Self {
        Self {
            poll: Duration::from_millis(c.poll_ms),
            timeout_margin: Duration::from_millis(c.timeout_margin_ms),
        }
    }
}

/// What to expose.
#[derive(Debug, Clone, PartialEq)]
pub struct ExposureRequest {
    pub exp_time: f64,
    pub kind: ExposureKind,
    /// Output path handed to the image writer.
    pub name: String,
}

impl ExposureRequest {
    pub fn new(exp_time: f64, kind: ExposureKind, name: impl Into<String>) -> Self {
        Self {
            exp_time,
            kind,
            name: name.into(),
        }
    }
}

/// Outcome of a completed exposure.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunReport {
    /// Actual exposure time as estimated by the controller.
    pub estimated_duration: Option<f64>,
    /// Wall time from start to saved image.
    pub elapsed: Duration,
}

/// Upper bound on how long an exposure of `exp_time` should take to read.
fn time_budget(exp_time: f64, read_time: f64, margin: Duration) -> Duration {
    Duration::try_from_secs_f64(exp_time + read_time)
        .unwrap_or(Duration::MAX)
        .saturating_add(margin)
}

/// Run one exposure to completion and save it.
///
/// On timeout the exposure is aborted and `CameraError::Timeout` returned.
pub fn run_exposure<G, D, W>(
    camera: &mut Camera<G>,
    request: &ExposureRequest,
    deinterlacer: &mut D,
    writer: &mut W,
    opts: RunnerOpts,
) -> Result<RunReport>
where
    G: DeviceGateway,
    D: Deinterlacer + ?Sized,
    W: ImageWriter + ?Sized,
{
    let clock = camera.clock();
    let config = *camera.config();
    let pixels = u64::from(config.binned_width()) * u64::from(config.binned_height());
    let read_time = estimate_read_time(config.readout_rate, pixels);

    camera.start_exposure(request.exp_time, request.kind, request.name.clone())?;
    let start = clock.now();
    let budget = time_budget(request.exp_time, read_time, opts.timeout_margin);
    tracing::debug!(?budget, read_time, "waiting for image");

    loop {
        let state = camera.exposure_state();
        match state.state() {
            StateEnum::ImageRead => break,
            StateEnum::Idle => {
                return Err(StateError {
                    reason: "exposure ended without an image",
                    state: StateEnum::Idle,
                }
                .into());
            }
            StateEnum::Exposing | StateEnum::Paused | StateEnum::Reading => {
                tracing::trace!(%state, "polling");
            }
        }
        if clock.now().saturating_duration_since(start) >= budget {
            tracing::warn!(?budget, %state, "exposure timed out; aborting");
            if let Err(e) = camera.abort_exposure() {
                tracing::warn!(error = %e, "abort after timeout failed");
            }
            return Err(CameraError::Timeout(budget));
        }
        clock.sleep(opts.poll);
    }

    let estimated_duration = camera.estimated_duration();
    camera.save_image(deinterlacer, writer)?;
    let elapsed = clock.now().saturating_duration_since(start);
    tracing::info!(?elapsed, ?estimated_duration, name = %request.name, "exposure complete");
    Ok(RunReport {
        estimated_duration,
        elapsed,
    })
}

/// Bring up a camera from a loaded config file and run one exposure.
pub fn run_configured<G, D, W>(
    gateway: G,
    cfg: &Config,
    request: &ExposureRequest,
    deinterlacer: &mut D,
    writer: &mut W,
) -> eyre::Result<RunReport>
where
    G: DeviceGateway,
    D: Deinterlacer + ?Sized,
    W: ImageWriter + ?Sized,
{
    cfg.validate().wrap_err("invalid configuration")?;
    let mut camera = Camera::builder()
        .with_app_config(cfg)
        .with_gateway(gateway)
        .build()
        .wrap_err("bring up camera")?;
    run_exposure(
        &mut camera,
        request,
        deinterlacer,
        writer,
        RunnerOpts::from(&cfg.runner),
    )
    .wrap_err_with(|| format!("expose {}", request.name))
}

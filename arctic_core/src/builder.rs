//! Type-state builder for `Camera`.
//!
//! `build()` only exists once a gateway has been supplied. `try_build()` is
//! always available and reports the missing piece at runtime instead.

use std::marker::PhantomData;
use std::path::PathBuf;
use std::sync::Arc;

use arctic_config::{Config, ControllerCfg, DEFAULT_TIMING_FIRMWARE};
use arctic_traits::DeviceGateway;
use arctic_traits::clock::{Clock, MonotonicClock};

use crate::camera::Camera;
use crate::camera_config::CameraConfig;
use crate::error::{BuildError, Result};

/// How the controller is brought up at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerSettings {
    pub device_index: usize,
    pub timing_firmware: PathBuf,
    pub reset: bool,
    pub load_timing_firmware: bool,
    pub power_on: bool,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            device_index: 0,
            timing_firmware: PathBuf::from(DEFAULT_TIMING_FIRMWARE),
            reset: true,
            load_timing_firmware: true,
            power_on: true,
        }
    }
}

impl From<&ControllerCfg> for ControllerSettings {
    fn from(c: &ControllerCfg) -> Self {
        Self {
            device_index: c.device_index,
            timing_firmware: c.timing_firmware.clone(),
            reset: c.reset,
            load_timing_firmware: c.load_timing_firmware,
            power_on: c.power_on,
        }
    }
}

// ── Type-state markers ───────────────────────────────────────────────────────

pub struct Missing;
pub struct Set;

/// Builder for `Camera`.
pub struct CameraBuilder<G, S> {
    gateway: Option<G>,
    clock: Option<Arc<dyn Clock + Send + Sync>>,
    settings: Option<ControllerSettings>,
    config: Option<CameraConfig>,
    _s: PhantomData<S>,
}

impl<G> Default for CameraBuilder<G, Missing> {
    fn default() -> Self {
        Self {
            gateway: None,
            clock: None,
            settings: None,
            config: None,
            _s: PhantomData,
        }
    }
}

impl<G: DeviceGateway, S> CameraBuilder<G, S> {
    /// Fallible build available in any type-state.
    pub fn try_build(self) -> Result<Camera<G>> {
        let gateway = self.gateway.ok_or(BuildError::MissingGateway)?;
        let clock = self
            .clock
            .unwrap_or_else(|| Arc::new(MonotonicClock::new()));
        let settings = self.settings.unwrap_or_default();
        let config = self.config.unwrap_or_default();
        Camera::connect(gateway, clock, &settings, config)
    }
}

/// Chainable setters that do not affect type-state.
impl<G, S> CameraBuilder<G, S> {
    /// Provide a custom clock; defaults to `MonotonicClock`.
    pub fn with_clock(mut self, clock: impl Clock + Send + Sync + 'static) -> Self {
        self.clock = Some(Arc::new(clock));
        self
    }

    pub fn with_settings(mut self, settings: ControllerSettings) -> Self {
        self.settings = Some(settings);
        self
    }

    /// Initial readout configuration; defaults to `CameraConfig::default()`.
    pub fn with_config(mut self, config: CameraConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Take controller settings and the initial readout from a loaded file.
    pub fn with_app_config(self, cfg: &Config) -> Self {
        self.with_settings(ControllerSettings::from(&cfg.controller))
            .with_config(CameraConfig::from(&cfg.readout))
    }
}

impl<G: DeviceGateway> CameraBuilder<G, Missing> {
    pub fn with_gateway(self, gateway: G) -> CameraBuilder<G, Set> {
        CameraBuilder {
            gateway: Some(gateway),
            clock: self.clock,
            settings: self.settings,
            config: self.config,
            _s: PhantomData,
        }
    }
}

impl<G: DeviceGateway> CameraBuilder<G, Set> {
    /// Open and configure the controller. Only available once a gateway is set.
    pub fn build(self) -> Result<Camera<G>> {
        self.try_build()
    }
}

#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema for the CCD exposure controller.
//!
//! - `Config` and its sections are deserialized from TOML and validated.
//! - Geometry checks that depend on the sensor (window bounds, parity) are
//!   left to `arctic_core`; this crate only rejects values that can never be
//!   right regardless of the detector.
use std::path::{Path, PathBuf};

use eyre::WrapErr;
use serde::Deserialize;

/// Firmware image loaded into the timing board when none is configured.
pub const DEFAULT_TIMING_FIRMWARE: &str = "/home/arctic/leach/tim.lod";

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ControllerCfg {
    /// Index of the interface card to open.
    pub device_index: usize,
    /// Timing-board `.lod` file sent during setup.
    pub timing_firmware: PathBuf,
    pub reset: bool,
    pub load_timing_firmware: bool,
    pub power_on: bool,
}

impl Default for ControllerCfg {
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

/// Amplifier selection as written in TOML (`"ll"`, `"lr"`, `"ur"`, `"ul"`, `"quad"`).
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum AmpsCfg {
    Ll,
    Lr,
    Ur,
    Ul,
    #[default]
    Quad,
}

/// Readout speed as written in TOML (`"slow"`, `"medium"`, `"fast"`).
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RateCfg {
    Slow,
    #[default]
    Medium,
    Fast,
}

/// Sub-window in binned pixels. Absent means full frame.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct WindowCfg {
    #[serde(default)]
    pub start_col: u32,
    #[serde(default)]
    pub start_row: u32,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ReadoutCfg {
    pub amps: AmpsCfg,
    pub rate: RateCfg,
    pub bin_col: u32,
    pub bin_row: u32,
    pub window: Option<WindowCfg>,
}

impl Default for ReadoutCfg {
    fn default() -> Self {
        Self {
            amps: AmpsCfg::Quad,
            rate: RateCfg::Medium,
            bin_col: 2,
            bin_row: 2,
            window: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RunnerCfg {
    /// Interval between exposure-state polls (ms).
    pub poll_ms: u64,
    /// Extra time allowed beyond exposure + estimated readout before giving up (ms).
    pub timeout_margin_ms: u64,
}

impl Default for RunnerCfg {
    fn default() -> Self {
        Self {
            poll_ms: 100,
            timeout_margin_ms: 30_000,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub controller: ControllerCfg,
    /// Readout configuration applied right after the controller is set up.
    #[serde(default)]
    pub readout: ReadoutCfg,
    #[serde(default)]
    pub runner: RunnerCfg,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

/// Read, parse and validate a config file.
pub fn load_file(path: &Path) -> eyre::Result<Config> {
    let text = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("read config {}", path.display()))?;
    let cfg = load_toml(&text).wrap_err_with(|| format!("parse config {}", path.display()))?;
    cfg.validate()
        .wrap_err_with(|| format!("validate config {}", path.display()))?;
    Ok(cfg)
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Controller
        if self.controller.load_timing_firmware
            && self.controller.timing_firmware.as_os_str().is_empty()
        {
            eyre::bail!("controller.timing_firmware must be set when load_timing_firmware = true");
        }

        // Readout
        if self.readout.bin_col == 0 {
            eyre::bail!("readout.bin_col must be >= 1");
        }
        if self.readout.bin_row == 0 {
            eyre::bail!("readout.bin_row must be >= 1");
        }
        if let Some(win) = self.readout.window {
            if win.width == 0 {
                eyre::bail!("readout.window.width must be >= 1");
            }
            if win.height == 0 {
                eyre::bail!("readout.window.height must be >= 1");
            }
        }

        // Runner
        if self.runner.poll_ms == 0 {
            eyre::bail!("runner.poll_ms must be >= 1");
        }
        if self.runner.poll_ms > 60_000 {
            eyre::bail!("runner.poll_ms is unreasonably large (>1min)");
        }
        if self.runner.timeout_margin_ms > 24 * 60 * 60 * 1000 {
            eyre::bail!("runner.timeout_margin_ms is unreasonably large (>24h)");
        }

        Ok(())
    }
}

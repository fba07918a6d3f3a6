#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss
)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! CCD exposure control (hardware-agnostic).
//!
//! All hardware interaction goes through `arctic_traits::DeviceGateway`; image
//! hand-off goes through `Deinterlacer` and `ImageWriter`.
//!
//! ## Architecture
//!
//! - **Configuration**: readout validation and binned geometry (`camera_config`)
//! - **Protocol**: 5-word command encoding and reply checking (`protocol`)
//! - **Timing**: readout estimates and pause-aware segment clock (`timing`)
//! - **Control**: the exposure state machine (`Camera`)
//! - **Runner**: blocking start/poll/save loop (`runner`)
//!
//! ## Units
//!
//! Window geometry is in binned pixels. Exposure and readout times are `f64`
//! seconds; the controller is sent whole milliseconds.

pub mod builder;
pub mod camera;
pub mod camera_config;
pub mod error;
pub mod hw_error;
pub mod mocks;
pub mod protocol;
pub mod runner;
pub mod state;
pub mod timing;

pub use builder::{CameraBuilder, ControllerSettings, Missing, Set};
pub use camera::{Camera, STOP_THRESHOLD_SECS};
pub use camera_config::{CameraConfig, ReadoutAmps, ReadoutRate};
pub use error::{BuildError, CameraError, CommandError, ConfigError, Result, StateError};
pub use protocol::{BoardId, Command, format_cmd, run_command};
pub use runner::{ExposureRequest, RunReport, RunnerOpts, run_configured, run_exposure};
pub use state::{ExposureKind, ExposureState, StateEnum};

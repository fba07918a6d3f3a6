use std::time::Duration;

use thiserror::Error;

use crate::camera_config::ReadoutAmps;
use crate::state::StateEnum;

/// Image axis a geometry error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Col,
    Row,
}

impl core::fmt::Display for Axis {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            Axis::Col => "col",
            Axis::Row => "row",
        })
    }
}

/// A readout configuration or exposure request the user can fix.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("cannot window unless reading from a single amplifier; readoutAmps={amps}")]
    WindowingNotAllowed { amps: ReadoutAmps },
    #[error("{axis} bin factor={value} < 1 or > {max}")]
    BinFactor { axis: Axis, value: u32, max: u32 },
    #[error("window start {axis}={value} >= {limit}")]
    WindowStart { axis: Axis, value: u32, limit: u32 },
    #[error("window {axis} extent={value} < 1 or > {limit}")]
    WindowExtent { axis: Axis, value: u32, limit: u32 },
    #[error("exposure time={0} must be finite, non-negative and at most 4294967.295 s")]
    ExposureTime(f64),
    #[error("exposure time={0} must be zero for a bias")]
    BiasExposureTime(f64),
}

/// An operation was requested in a state that forbids it.
#[derive(Debug, Error, Clone, PartialEq)]
#[error("{reason} (state: {state})")]
pub struct StateError {
    pub reason: &'static str,
    pub state: StateEnum,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CommandError {
    #[error("unknown boardID=0x{0:x}")]
    UnknownBoard(u32),
    #[error("{description} failed with retVal=0x{code:x}")]
    Failed { description: String, code: i32 },
    #[error("{description}: {message}")]
    Transport {
        description: String,
        message: String,
    },
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum BuildError {
    #[error("missing device gateway")]
    MissingGateway,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CameraError {
    #[error("build error: {0}")]
    Build(#[from] BuildError),
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("invalid state: {0}")]
    State(#[from] StateError),
    #[error("command error: {0}")]
    Command(#[from] CommandError),
    #[error("device error: {0}")]
    Device(String),
    /// Geometry formulas disagree with each other; a bug, not a user error.
    #[error("internal invariant violated: {0}")]
    Invariant(String),
    #[error("image persistence failed: {0}")]
    Persistence(String),
    #[error("timed out after {0:?} waiting for the image")]
    Timeout(Duration),
}

impl CameraError {
    /// True for errors caused by the request rather than the hardware.
    pub fn is_user_error(&self) -> bool {
        matches!(self, CameraError::Config(_) | CameraError::State(_))
    }
}

pub type Result<T> = std::result::Result<T, CameraError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offending_value() {
        let e = ConfigError::BinFactor {
            axis: Axis::Col,
            value: 5,
            max: 4,
        };
        assert_eq!(e.to_string(), "col bin factor=5 < 1 or > 4");

        let e = CommandError::Failed {
            description: "start exposure".into(),
            code: 0x45_52_52,
        };
        assert_eq!(e.to_string(), "start exposure failed with retVal=0x455252");

        let e = StateError {
            reason: "no exposure to pause",
            state: StateEnum::Idle,
        };
        assert_eq!(e.to_string(), "no exposure to pause (state: Idle)");
    }

    #[test]
    fn user_errors_are_distinguished_from_device_errors() {
        assert!(CameraError::from(ConfigError::ExposureTime(-1.0)).is_user_error());
        assert!(!CameraError::Device("gone".into()).is_user_error());
        assert!(!CameraError::Invariant("odd width".into()).is_user_error());
    }
}

//! Exposure state as reported to callers.

/// State tag without payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateEnum {
    Idle,
    Exposing,
    Paused,
    Reading,
    ImageRead,
}

impl StateEnum {
    pub fn name(self) -> &'static str {
        match self {
            StateEnum::Idle => "Idle",
            StateEnum::Exposing => "Exposing",
            StateEnum::Paused => "Paused",
            StateEnum::Reading => "Reading",
            StateEnum::ImageRead => "ImageRead",
        }
    }
}

impl core::fmt::Display for StateEnum {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

/// Derived exposure state; computed on demand, never stored.
///
/// Times are in seconds. For `Exposing` and `Paused`, `full_time` is the
/// commanded exposure time and `rem_time` the time left in the current
/// segment. For `Reading` they are the full and remaining readout time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ExposureState {
    Idle,
    Exposing { full_time: f64, rem_time: f64 },
    Paused { full_time: f64, rem_time: f64 },
    Reading { full_time: f64, rem_time: f64 },
    ImageRead,
}

impl ExposureState {
    pub fn state(&self) -> StateEnum {
        match self {
            ExposureState::Idle => StateEnum::Idle,
            ExposureState::Exposing { .. } => StateEnum::Exposing,
            ExposureState::Paused { .. } => StateEnum::Paused,
            ExposureState::Reading { .. } => StateEnum::Reading,
            ExposureState::ImageRead => StateEnum::ImageRead,
        }
    }

    /// True from the start of an exposure until its image is saved or aborted.
    pub fn is_busy(&self) -> bool {
        !matches!(self, ExposureState::Idle)
    }

    pub fn full_time(&self) -> f64 {
        match *self {
            ExposureState::Exposing { full_time, .. }
            | ExposureState::Paused { full_time, .. }
            | ExposureState::Reading { full_time, .. } => full_time,
            ExposureState::Idle | ExposureState::ImageRead => 0.0,
        }
    }

    pub fn rem_time(&self) -> f64 {
        match *self {
            ExposureState::Exposing { rem_time, .. }
            | ExposureState::Paused { rem_time, .. }
            | ExposureState::Reading { rem_time, .. } => rem_time,
            ExposureState::Idle | ExposureState::ImageRead => 0.0,
        }
    }
}

impl core::fmt::Display for ExposureState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        if matches!(
            self,
            ExposureState::Exposing { .. }
                | ExposureState::Paused { .. }
                | ExposureState::Reading { .. }
        ) {
            write!(
                f,
                "{}(fullTime={:.3}, remTime={:.3})",
                self.state(),
                self.full_time(),
                self.rem_time()
            )
        } else {
            write!(f, "{}", self.state())
        }
    }
}

/// What is being exposed; decides the shutter and whether time may be nonzero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExposureKind {
    /// Zero-second readout with the shutter closed.
    Bias,
    Dark,
    Flat,
    Object,
}

impl ExposureKind {
    pub fn name(self) -> &'static str {
        match self {
            ExposureKind::Bias => "Bias",
            ExposureKind::Dark => "Dark",
            ExposureKind::Flat => "Flat",
            ExposureKind::Object => "Object",
        }
    }

    pub fn opens_shutter(self) -> bool {
        match self {
            ExposureKind::Bias | ExposureKind::Dark => false,
            ExposureKind::Flat | ExposureKind::Object => true,
        }
    }
}

impl core::fmt::Display for ExposureKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

//! Exposure and readout time bookkeeping.

use std::time::Instant;

use arctic_traits::Clock;

use crate::camera_config::ReadoutRate;

/// Seconds needed to read `pixels` at `rate`.
#[inline]
pub fn estimate_read_time(rate: ReadoutRate, pixels: u64) -> f64 {
    pixels as f64 / rate.pixel_frequency_hz()
}

/// Fractional seconds elapsed on `clock` since `since`.
#[inline]
pub fn elapsed_secs<C: Clock + ?Sized>(clock: &C, since: Instant) -> f64 {
    clock.secs_since(since)
}

/// Remaining exposure time carried across pause/resume.
///
/// `segment_start` is `None` exactly while paused. `remaining` is the time
/// left at the start of the current segment, so live remaining time is
/// `remaining - elapsed(segment_start)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentClock {
    remaining: f64,
    segment_start: Option<Instant>,
}

impl SegmentClock {
    /// Begin the first segment of a `duration`-second exposure at `now`.
    pub fn start(duration: f64, now: Instant) -> Self {
        Self {
            remaining: duration,
            segment_start: Some(now),
        }
    }

    pub fn is_paused(&self) -> bool {
        self.segment_start.is_none()
    }

    /// Close the running segment, charging its elapsed time. No-op if paused.
    pub fn pause<C: Clock + ?Sized>(&mut self, clock: &C) {
        if let Some(start) = self.segment_start.take() {
            self.remaining -= elapsed_secs(clock, start);
        }
    }

    /// Open a new segment at `now`; the stored remaining time is unchanged.
    pub fn resume(&mut self, now: Instant) {
        self.segment_start = Some(now);
    }

    /// Remaining time stored at the start of the current segment.
    pub fn stored_remaining(&self) -> f64 {
        self.remaining
    }

    /// Live remaining time; may go negative once the exposure overruns.
    pub fn remaining<C: Clock + ?Sized>(&self, clock: &C) -> f64 {
        match self.segment_start {
            Some(start) => self.remaining - elapsed_secs(clock, start),
            None => self.remaining,
        }
    }

    /// Actual exposure time if the exposure were stopped now.
    pub fn estimate_stopped_duration<C: Clock + ?Sized>(&self, commanded: f64, clock: &C) -> f64 {
        (commanded - self.remaining(clock)).max(0.0)
    }
}

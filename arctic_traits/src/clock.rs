use std::thread;
use std::time::{Duration, Instant};

/// Monotonic clock used for exposure segment timing and readout polling.
///
/// - now(): returns a monotonic Instant
/// - sleep(): sleeps for the provided duration (implementations may simulate)
/// - secs_since(): fractional seconds elapsed since an earlier Instant
pub trait Clock {
    fn now(&self) -> Instant;
    fn sleep(&self, d: Duration);

    /// Fractional seconds elapsed since `since`, saturating at 0 on underflow.
    fn secs_since(&self, since: Instant) -> f64 {
        self.now().saturating_duration_since(since).as_secs_f64()
    }
}

/// Default, real-time monotonic clock backed by std::time::Instant.
#[derive(Debug, Default, Clone, Copy)]
pub struct MonotonicClock;

impl MonotonicClock {
    #[inline]
    pub fn new() -> Self {
        Self
    }
}

impl Clock for MonotonicClock {
    #[inline]
    fn now(&self) -> Instant {
        Instant::now()
    }

    #[inline]
    fn sleep(&self, d: Duration) {
        if d.is_zero() {
            return;
        }
        thread::sleep(d);
    }
}

#[cfg(any(test, feature = "test-util"))]
pub mod test_clock {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Deterministic clock whose time only moves when told to.
    ///
    /// now() = origin + offset
    /// sleep(d) advances internal time by d without actually sleeping.
    ///
    /// Clones share the same offset, so a controller and a simulated device
    /// holding clones observe the same time line.
    #[derive(Debug, Clone)]
    pub struct TestClock {
        origin: Instant,
        offset: Arc<Mutex<Duration>>,
    }

    impl Default for TestClock {
        fn default() -> Self {
            Self::new()
        }
    }

    impl TestClock {
        pub fn new() -> Self {
            Self {
                origin: Instant::now(),
                offset: Arc::new(Mutex::new(Duration::ZERO)),
            }
        }

        /// Advance the clock by the given duration.
        pub fn advance(&self, d: Duration) {
            if let Ok(mut off) = self.offset.lock() {
                *off = off.saturating_add(d);
            }
        }

        /// Advance the clock by fractional seconds (negative values are ignored).
        pub fn advance_secs(&self, secs: f64) {
            if secs.is_finite() && secs > 0.0 {
                self.advance(Duration::from_secs_f64(secs));
            }
        }

        /// Current offset from the origin.
        pub fn offset(&self) -> Duration {
            self.offset.lock().map(|g| *g).unwrap_or(Duration::ZERO)
        }
    }

    impl Clock for TestClock {
        fn now(&self) -> Instant {
            self.origin + self.offset()
        }

        fn sleep(&self, d: Duration) {
            self.advance(d);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_clock::TestClock;
    use super::*;

    #[test]
    fn secs_since_tracks_advances() {
        let clock = TestClock::new();
        let t0 = clock.now();
        clock.advance(Duration::from_millis(1500));
        assert!((clock.secs_since(t0) - 1.5).abs() < 1e-9);
    }

    #[test]
    fn secs_since_saturates_for_future_instants() {
        let clock = TestClock::new();
        clock.advance(Duration::from_secs(2));
        let later = clock.now() + Duration::from_secs(1);
        assert_eq!(clock.secs_since(later), 0.0);
    }

    #[test]
    fn clones_share_time() {
        let a = TestClock::new();
        let b = a.clone();
        a.sleep(Duration::from_millis(250));
        assert_eq!(b.offset(), Duration::from_millis(250));
    }
}

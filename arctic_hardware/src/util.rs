use std::time::Duration;

use arctic_traits::Clock;

use crate::error::{HwError, Result};

/// Poll `done` until it returns true or `timeout` elapses on `clock`.
/// Sleeps `poll_interval` between checks so the link is not hammered.
pub fn wait_until<C: Clock + ?Sized>(
    clock: &C,
    mut done: impl FnMut() -> bool,
    timeout: Duration,
    poll_interval: Duration,
) -> Result<()> {
    let start = clock.now();
    while !done() {
        if clock.now().saturating_duration_since(start) >= timeout {
            return Err(HwError::Timeout(timeout));
        }
        clock.sleep(poll_interval);
    }
    Ok(())
}

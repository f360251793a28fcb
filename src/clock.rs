//! Wall-clock source used to timestamp requests.

use chrono::Utc;

/// Returns the current wall-clock time in seconds since the Unix epoch.
///
/// The [`Runner`](../runner/struct.Runner.html) reads the clock when a request is
/// handed to the transport and again when it completes, so both timestamps of a
/// [`Record`](../metrics/struct.Record.html) come from the same source. Tests can
/// provide their own implementation to make timings deterministic.
pub trait Clock: Send + Sync {
    /// Seconds since the Unix epoch, with sub-second precision.
    fn now(&self) -> f64;
}

/// The default [`Clock`], backed by the system time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;
impl Clock for SystemClock {
    fn now(&self) -> f64 {
        let now = Utc::now();
        now.timestamp() as f64 + f64::from(now.timestamp_subsec_nanos()) / 1_000_000_000.0
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn system_clock_advances() {
        let clock = SystemClock;
        let first = clock.now();
        std::thread::sleep(std::time::Duration::from_millis(5));
        let second = clock.now();
        assert!(first > 1_500_000_000.0);
        assert!(second > first);
    }
}

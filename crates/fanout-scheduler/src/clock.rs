//! Wall clock in unix milliseconds.
//!
//! Reads are anchored to a `tokio::time::Instant` taken at construction,
//! so the clock advances with tokio's timer (and with paused test time)
//! rather than with the system clock.

use std::time::{SystemTime, UNIX_EPOCH};

use tokio::time::Instant;

#[derive(Clone, Copy, Debug)]
pub struct Clock {
    base_unix_ms: u64,
    origin: Instant,
}

impl Clock {
    /// Clock anchored to the current system time.
    pub fn system() -> Self {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;
        Self::starting_at(now)
    }

    /// Clock that reads `unix_ms` now.
    pub fn starting_at(unix_ms: u64) -> Self {
        Self {
            base_unix_ms: unix_ms,
            origin: Instant::now(),
        }
    }

    /// Current time in unix milliseconds.
    pub fn now_ms(&self) -> u64 {
        self.base_unix_ms
            .saturating_add(self.origin.elapsed().as_millis() as u64)
    }

    /// The tokio instant corresponding to `unix_ms`, clamped to now.
    pub fn instant_at(&self, unix_ms: u64) -> Instant {
        let offset = unix_ms.saturating_sub(self.base_unix_ms);
        let target = self.origin + std::time::Duration::from_millis(offset);
        target.max(Instant::now())
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::system()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_follows_paused_time() {
        let clock = Clock::starting_at(0);
        assert_eq!(clock.now_ms(), 0);
        tokio::time::advance(Duration::from_millis(1_500)).await;
        assert_eq!(clock.now_ms(), 1_500);
    }

    #[tokio::test(start_paused = true)]
    async fn test_instant_at() {
        let clock = Clock::starting_at(10_000);
        let target = clock.instant_at(70_000);
        assert_eq!(target - Instant::now(), Duration::from_millis(60_000));

        // Past deadlines clamp to now.
        assert_eq!(clock.instant_at(0), Instant::now());
    }

    #[test]
    fn test_system_clock_is_recent() {
        // 2020-01-01 in unix ms.
        assert!(Clock::system().now_ms() > 1_577_836_800_000);
    }
}

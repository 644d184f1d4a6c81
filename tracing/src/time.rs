//! Relative millisecond clock: every side timestamps events against its own start
use chrono::{DateTime, Utc};
use std::time::{Duration, Instant};

#[derive(Debug)]
pub struct RelativeClock {
    pub start: Instant,
    pub start_time: DateTime<Utc>,
}

impl RelativeClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            start_time: Utc::now(),
        }
    }

    /// Milliseconds elapsed since the clock was created
    pub fn now_ms(&self) -> u64 {
        duration_ms(self.start.elapsed())
    }
}

impl Default for RelativeClock {
    fn default() -> Self {
        Self::new()
    }
}

#[allow(clippy::cast_possible_truncation)]
pub fn duration_ms(duration: Duration) -> u64 {
    duration.as_millis() as u64
}

pub fn elapsed_ms(since: Instant) -> u64 {
    duration_ms(since.elapsed())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_is_monotonic() {
        let clock = RelativeClock::new();
        let first = clock.now_ms();
        std::thread::sleep(Duration::from_millis(3));
        assert!(clock.now_ms() >= first + 3);
    }
}

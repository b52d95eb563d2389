//! Periodic status logging for long-running loops

use std::time::{Duration, Instant};

/// Counts events and says when it is time to log a status line
pub struct Heartbeat {
    interval: Duration,
    last_beat: Instant,
    count: u64,
}

impl Heartbeat {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_beat: Instant::now(),
            count: 0,
        }
    }

    /// Record `n` events since the last beat
    pub fn record(&mut self, n: u64) {
        self.count += n;
    }

    pub fn should_beat(&self) -> bool {
        self.last_beat.elapsed() >= self.interval
    }

    /// Reset the timer and return the events counted since the last beat
    pub fn beat(&mut self) -> u64 {
        self.last_beat = Instant::now();
        std::mem::take(&mut self.count)
    }
}

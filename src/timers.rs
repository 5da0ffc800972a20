//! Stage timing for the planning pipeline.

use std::time::{Duration, Instant};

use serde::Serialize;

/// RAII timer that adds its elapsed time to a slot when dropped, so early
/// returns through `?` are still counted.
pub struct StageTimer<'a> {
    start: Instant,
    slot: &'a mut Duration,
}

impl<'a> StageTimer<'a> {
    pub fn new(slot: &'a mut Duration) -> Self {
        Self {
            start: Instant::now(),
            slot,
        }
    }
}

impl Drop for StageTimer<'_> {
    fn drop(&mut self) {
        *self.slot += self.start.elapsed();
    }
}

/// Accumulated durations of one diff or generate call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StageTimings {
    pub parse: Duration,
    pub detect: Duration,
    pub rename: Duration,
    pub generate: Duration,
}

impl StageTimings {
    pub fn total(&self) -> Duration {
        self.parse + self.detect + self.rename + self.generate
    }
}

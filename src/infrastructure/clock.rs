// Monotonic system clock
use crate::application::clock::Clock;
use std::time::Instant;

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

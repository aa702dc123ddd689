// Session - Telemetry timeline shared by the read loop and its consumers
use crate::application::clock::Clock;
use crate::application::lock;
use crate::application::telemetry_buffer::TelemetryBuffer;
use crate::domain::sample::Sample;
use serde::Serialize;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Session start instant and buffered samples. They always change together.
struct Timeline {
    started_at: Instant,
    buffer: TelemetryBuffer,
}

impl Timeline {
    fn new(started_at: Instant) -> Self {
        Self {
            started_at,
            buffer: TelemetryBuffer::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SessionCounters {
    pub lines_received: u64,
    pub samples_decoded: u64,
    pub lines_ignored: u64,
}

/// Consistent view of the buffer taken under a single lock.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub samples: Vec<Sample>,
    pub latest: Option<Sample>,
    pub len: usize,
}

/// One collection session. The serial read loop is the only writer; readers
/// get copies, so a reset is never observed halfway.
pub struct Session {
    clock: Arc<dyn Clock>,
    timeline: Mutex<Timeline>,
    samples_decoded: AtomicU64,
    lines_ignored: AtomicU64,
}

impl Session {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        let timeline = Timeline::new(clock.now());
        Self {
            clock,
            timeline: Mutex::new(timeline),
            samples_decoded: AtomicU64::new(0),
            lines_ignored: AtomicU64::new(0),
        }
    }

    /// Stamp `distance` relative to the session start and append it.
    pub fn record(&self, distance: f64) -> Sample {
        let mut timeline = lock(&self.timeline);
        // Read the clock under the lock so timestamps stay in append order
        // even across a concurrent reset.
        let timestamp = self
            .clock
            .now()
            .saturating_duration_since(timeline.started_at)
            .as_secs_f64();

        let sample = Sample::new(timestamp, distance);
        timeline.buffer.append(sample);
        self.samples_decoded.fetch_add(1, Ordering::Relaxed);
        sample
    }

    /// Count a line that carried no position report.
    pub fn ignore_line(&self) {
        self.lines_ignored.fetch_add(1, Ordering::Relaxed);
    }

    pub fn window(&self, duration: f64) -> Vec<Sample> {
        lock(&self.timeline).buffer.window(duration)
    }

    pub fn snapshot(&self, duration: f64) -> Snapshot {
        let timeline = lock(&self.timeline);
        Snapshot {
            samples: timeline.buffer.window(duration),
            latest: timeline.buffer.latest(),
            len: timeline.buffer.len(),
        }
    }

    pub fn latest(&self) -> Option<Sample> {
        lock(&self.timeline).buffer.latest()
    }

    pub fn len(&self) -> usize {
        lock(&self.timeline).buffer.len()
    }

    /// Start over: empty buffer, session start moved to now.
    pub fn reset(&self) {
        let mut timeline = lock(&self.timeline);
        *timeline = Timeline::new(self.clock.now());
        tracing::debug!("telemetry session reset");
    }

    pub fn counters(&self) -> SessionCounters {
        let samples_decoded = self.samples_decoded.load(Ordering::Relaxed);
        let lines_ignored = self.lines_ignored.load(Ordering::Relaxed);
        SessionCounters {
            lines_received: samples_decoded + lines_ignored,
            samples_decoded,
            lines_ignored,
        }
    }
}

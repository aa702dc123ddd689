// Telemetry sample domain model
use serde::Serialize;

/// One distance reading from the rig, stamped relative to the session start.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Sample {
    /// Seconds since the session started.
    pub timestamp: f64,
    /// Distance in centimeters.
    pub distance: f64,
}

impl Sample {
    pub fn new(timestamp: f64, distance: f64) -> Self {
        Self {
            timestamp,
            distance,
        }
    }
}

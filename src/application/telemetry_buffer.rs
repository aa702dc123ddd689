// Append-only sample store with a sliding time-window query
use crate::domain::sample::Sample;

/// Samples in append order, which is also timestamp order.
///
/// The buffer itself is not synchronized; [`Session`](super::session::Session)
/// owns it behind a mutex together with the session start instant.
#[derive(Debug, Default, Clone)]
pub struct TelemetryBuffer {
    samples: Vec<Sample>,
}

impl TelemetryBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends without reordering. Callers append non-decreasing timestamps.
    pub fn append(&mut self, sample: Sample) {
        self.samples.push(sample);
    }

    /// All samples within `duration` seconds of the most recent sample.
    ///
    /// The right edge is the last sample's timestamp, not wall-clock time, so a
    /// stalled stream keeps showing its final `duration` seconds. The cutoff is
    /// clamped at zero and a sample exactly on it is included.
    pub fn window(&self, duration: f64) -> Vec<Sample> {
        let Some(last) = self.samples.last() else {
            return Vec::new();
        };

        let cutoff = (last.timestamp - duration).max(0.0);
        let start = self.samples.partition_point(|s| s.timestamp < cutoff);
        self.samples[start..].to_vec()
    }

    pub fn reset(&mut self) {
        self.samples = Vec::new();
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn latest(&self) -> Option<Sample> {
        self.samples.last().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer_with(timestamps: &[f64]) -> TelemetryBuffer {
        let mut buffer = TelemetryBuffer::new();
        for (i, &t) in timestamps.iter().enumerate() {
            buffer.append(Sample::new(t, i as f64));
        }
        buffer
    }

    fn timestamps(samples: &[Sample]) -> Vec<f64> {
        samples.iter().map(|s| s.timestamp).collect()
    }

    #[test]
    fn test_window_keeps_cutoff_sample() {
        let buffer = buffer_with(&[0.0, 1.0, 2.0, 4.0, 5.0]);
        assert_eq!(timestamps(&buffer.window(3.0)), vec![2.0, 4.0, 5.0]);
    }

    #[test]
    fn test_window_cutoff_clamped_at_zero() {
        let buffer = buffer_with(&[0.0, 0.5, 1.0]);
        assert_eq!(timestamps(&buffer.window(10.0)), vec![0.0, 0.5, 1.0]);
    }

    #[test]
    fn test_window_zero_duration_keeps_latest() {
        let buffer = buffer_with(&[0.0, 1.0, 2.0, 2.0]);
        assert_eq!(timestamps(&buffer.window(0.0)), vec![2.0, 2.0]);
    }

    #[test]
    fn test_empty_buffer_window() {
        let buffer = TelemetryBuffer::new();
        for duration in [0.0, -1.0, 3.0, f64::MAX] {
            assert!(buffer.window(duration).is_empty());
        }
        assert!(buffer.latest().is_none());
    }

    #[test]
    fn test_reset_empties_buffer() {
        let mut buffer = buffer_with(&[0.0, 1.0]);
        buffer.reset();
        assert_eq!(buffer.len(), 0);
        assert!(buffer.is_empty());
        assert!(buffer.window(3.0).is_empty());
    }

    #[test]
    fn test_window_preserves_append_order() {
        let buffer = buffer_with(&[0.0, 1.0, 1.0, 2.0, 3.0]);
        let distances: Vec<f64> = buffer.window(2.0).iter().map(|s| s.distance).collect();
        assert_eq!(distances, vec![1.0, 2.0, 3.0, 4.0]);
    }
}

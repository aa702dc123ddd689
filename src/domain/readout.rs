// Live readout shown next to the plot
use super::sample::Sample;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Readout {
    /// Latest reported distance in centimeters.
    pub position: f64,
    /// Setpoint of the last command sent to the rig, without the wire offset.
    pub setpoint: Option<f64>,
    /// `setpoint - position`, once a setpoint is known.
    pub error: Option<f64>,
}

impl Readout {
    pub fn new(latest: Sample, setpoint: Option<f64>) -> Self {
        Self {
            position: latest.distance,
            setpoint,
            error: setpoint.map(|sp| sp - latest.distance),
        }
    }
}

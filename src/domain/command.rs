// Control command domain model
use serde::Serialize;
use thiserror::Error;

/// Target position and PID gains forwarded to the rig's controller.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PidCommand {
    /// Desired distance in centimeters, before the wire offset is applied.
    pub setpoint: f64,
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
}

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("{field} must be a number, got {value:?}")]
    NotANumber { field: &'static str, value: String },
    #[error("{field} must be finite, got {value}")]
    NotFinite { field: &'static str, value: f64 },
}

impl PidCommand {
    pub fn new(setpoint: f64, kp: f64, ki: f64, kd: f64) -> Result<Self, CommandError> {
        for (field, value) in [("setpoint", setpoint), ("kp", kp), ("ki", ki), ("kd", kd)] {
            if !value.is_finite() {
                return Err(CommandError::NotFinite { field, value });
            }
        }

        Ok(Self {
            setpoint,
            kp,
            ki,
            kd,
        })
    }

    /// Build a command from user-entered text fields.
    pub fn parse(setpoint: &str, kp: &str, ki: &str, kd: &str) -> Result<Self, CommandError> {
        Self::new(
            parse_field("setpoint", setpoint)?,
            parse_field("kp", kp)?,
            parse_field("ki", ki)?,
            parse_field("kd", kd)?,
        )
    }
}

fn parse_field(field: &'static str, raw: &str) -> Result<f64, CommandError> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| CommandError::NotANumber {
            field,
            value: raw.to_string(),
        })
}

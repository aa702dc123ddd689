// ASCII line protocol spoken by the rig
use crate::domain::command::PidCommand;

/// Token that starts a position report, e.g. `Posicion 12.34`.
pub const DEFAULT_MARKER: &str = "Posicion";

/// Calibration offset the rig expects on the outgoing setpoint (centimeters).
pub const DEFAULT_SETPOINT_OFFSET: f64 = 20.0;

#[derive(Debug, Clone)]
pub struct LineCodec {
    marker: String,
    setpoint_offset: f64,
}

impl Default for LineCodec {
    fn default() -> Self {
        Self::new(DEFAULT_MARKER, DEFAULT_SETPOINT_OFFSET)
    }
}

impl LineCodec {
    pub fn new(marker: impl Into<String>, setpoint_offset: f64) -> Self {
        Self {
            marker: marker.into(),
            setpoint_offset,
        }
    }

    /// Distance carried by a position report, or `None` for any other line.
    ///
    /// Some occurrence of the marker must be followed by whitespace and a
    /// finite decimal number; anything after the number is ignored.
    pub fn decode_sample(&self, line: &str) -> Option<f64> {
        let line = line.trim();
        line.match_indices(self.marker.as_str())
            .find_map(|(start, marker)| parse_report(&line[start + marker.len()..]))
    }

    /// `"<setpoint + offset>,<kp>,<ki>,<kd>\n"`
    pub fn encode_command(&self, command: &PidCommand) -> String {
        format!(
            "{},{},{},{}\n",
            command.setpoint + self.setpoint_offset,
            command.kp,
            command.ki,
            command.kd
        )
    }
}

/// Number right after a marker, if the text starts with whitespace and one.
fn parse_report(rest: &str) -> Option<f64> {
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }

    let distance: f64 = rest.split_whitespace().next()?.parse().ok()?;
    distance.is_finite().then_some(distance)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_position_reports() {
        let codec = LineCodec::default();
        assert_eq!(codec.decode_sample("Posicion 12.34"), Some(12.34));
        assert_eq!(codec.decode_sample("Posicion 10.0\r\n"), Some(10.0));
        assert_eq!(codec.decode_sample("Posicion -3"), Some(-3.0));
        assert_eq!(codec.decode_sample("  Posicion\t7.5 cm"), Some(7.5));
        assert_eq!(codec.decode_sample("dbg: Posicion 42"), Some(42.0));
        assert_eq!(
            codec.decode_sample("Posicionando sensor; Posicion 12.5"),
            Some(12.5)
        );
        assert_eq!(codec.decode_sample("Posicion: ok, Posicion 8 cm"), Some(8.0));
    }

    #[test]
    fn test_decode_misses() {
        let codec = LineCodec::default();
        for line in [
            "",
            "\n",
            "noise",
            "Posicion",
            "Posicion ",
            "Posicion abc",
            "Posicion: 12.0",
            "Posicion12.0",
            "Posicion NaN",
            "Posicion inf",
            "Posi",
            "Distancia 12.0",
        ] {
            assert_eq!(codec.decode_sample(line), None, "line {line:?}");
        }
    }

    #[test]
    fn test_decode_custom_marker() {
        let codec = LineCodec::new("POS", 0.0);
        assert_eq!(codec.decode_sample("POS 1.25"), Some(1.25));
        assert_eq!(codec.decode_sample("Posicion 1.25"), None);
    }

    #[test]
    fn test_encode_applies_offset() {
        let codec = LineCodec::default();
        let command = PidCommand::new(10.0, 1.5, 0.25, -3.0).unwrap();
        assert_eq!(codec.encode_command(&command), "30,1.5,0.25,-3\n");

        let command = PidCommand::new(-25.5, -1.0, 0.0, 2.75).unwrap();
        assert_eq!(codec.encode_command(&command), "-5.5,-1,0,2.75\n");
    }

    #[test]
    fn test_encode_with_configured_offset() {
        let codec = LineCodec::new(DEFAULT_MARKER, 0.0);
        let command = PidCommand::new(12.5, 1.0, 2.0, 3.0).unwrap();
        assert_eq!(codec.encode_command(&command), "12.5,1,2,3\n");
    }
}

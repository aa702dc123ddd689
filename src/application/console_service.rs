// Console service - Use cases behind the operator console
use crate::application::serial_link::{ConnectError, LinkStatus, SendError, SerialLink};
use crate::application::session::{Session, SessionCounters};
use crate::domain::command::{CommandError, PidCommand};
use crate::domain::readout::Readout;
use crate::domain::sample::Sample;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParametersError {
    #[error(transparent)]
    Invalid(#[from] CommandError),
    #[error(transparent)]
    Send(#[from] SendError),
}

#[derive(Debug, Clone, Serialize)]
pub struct TelemetryView {
    pub window_seconds: f64,
    pub samples: Vec<Sample>,
    pub readout: Option<Readout>,
    /// Samples buffered in the whole session, not just the window.
    pub len: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConsoleStatus {
    pub link: LinkStatus,
    pub buffered: usize,
    pub counters: SessionCounters,
    pub last_command: Option<PidCommand>,
}

#[derive(Clone)]
pub struct ConsoleService {
    link: Arc<SerialLink>,
    session: Arc<Session>,
    reset_on_send: bool,
    default_window: f64,
}

impl ConsoleService {
    pub fn new(
        link: Arc<SerialLink>,
        session: Arc<Session>,
        reset_on_send: bool,
        default_window: f64,
    ) -> Self {
        Self {
            link,
            session,
            reset_on_send,
            default_window,
        }
    }

    pub fn connect(&self, port_name: &str, baud_rate: u32) -> Result<(), ConnectError> {
        self.link.connect(port_name, baud_rate)
    }

    pub fn disconnect(&self) {
        self.link.disconnect();
    }

    pub fn list_ports(&self) -> anyhow::Result<Vec<String>> {
        self.link.list_ports()
    }

    /// Parse the operator's fields, send them to the rig and, if configured,
    /// start a fresh session so the plot shows the response to the new gains.
    pub fn send_parameters(
        &self,
        setpoint: &str,
        kp: &str,
        ki: &str,
        kd: &str,
    ) -> Result<String, ParametersError> {
        let command = PidCommand::parse(setpoint, kp, ki, kd)?;
        let line = self.link.send(&command)?;

        if self.reset_on_send {
            self.session.reset();
        }

        Ok(line)
    }

    /// Samples in the last `window_seconds` of data (the configured default
    /// when `None`) plus the live readout.
    pub fn telemetry(&self, window_seconds: Option<f64>) -> TelemetryView {
        let window_seconds = window_seconds.unwrap_or(self.default_window);
        let snapshot = self.session.snapshot(window_seconds);
        let setpoint = self.link.last_command().map(|c| c.setpoint);

        TelemetryView {
            window_seconds,
            samples: snapshot.samples,
            readout: snapshot.latest.map(|latest| Readout::new(latest, setpoint)),
            len: snapshot.len,
        }
    }

    pub fn reset(&self) {
        self.session.reset();
    }

    pub fn status(&self) -> ConsoleStatus {
        ConsoleStatus {
            link: self.link.status(),
            buffered: self.session.len(),
            counters: self.session.counters(),
            last_command: self.link.last_command(),
        }
    }
}

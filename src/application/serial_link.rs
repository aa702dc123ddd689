// Serial link - Owns the port connection and its background read loop
use crate::application::lock;
use crate::application::serial_ports::{PortHandle, SerialPorts};
use crate::application::session::Session;
use crate::domain::command::PidCommand;
use crate::infrastructure::line_codec::LineCodec;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::io::{self, BufRead, BufReader, ErrorKind, Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use thiserror::Error;

/// Longest line kept while waiting for a newline; longer runs are dropped.
const MAX_LINE_BYTES: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkState {
    Disconnected,
    Connecting,
    Connected,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct LinkStatus {
    pub state: LinkState,
    pub port: Option<String>,
    /// Why the link last closed or failed to open.
    pub detail: Option<String>,
    pub since: DateTime<Utc>,
}

impl LinkStatus {
    fn new(state: LinkState, port: Option<&str>, detail: Option<String>) -> Self {
        Self {
            state,
            port: port.map(str::to_string),
            detail,
            since: Utc::now(),
        }
    }
}

#[derive(Debug, Error)]
#[error("could not open {port}: {reason}")]
pub struct ConnectError {
    pub port: String,
    pub reason: String,
}

#[derive(Debug, Error)]
pub enum SendError {
    #[error("serial port is not connected")]
    NotConnected,
    #[error("serial write failed: {0}")]
    Transport(#[source] io::Error),
}

/// Why a read loop ended without being asked to.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("port closed")]
    Closed,
    #[error("read failed: {0}")]
    Io(#[from] io::Error),
}

/// Write half of the port. The read loop clears it when the transport ends.
type SharedWriter = Arc<Mutex<Option<Box<dyn Write + Send>>>>;

struct Connection {
    port: String,
    writer: SharedWriter,
    stop: Arc<AtomicBool>,
    reader: JoinHandle<()>,
}

pub struct SerialLink {
    ports: Arc<dyn SerialPorts>,
    session: Arc<Session>,
    codec: LineCodec,
    connection: Mutex<Option<Connection>>,
    status: Arc<Mutex<LinkStatus>>,
    last_command: Mutex<Option<PidCommand>>,
}

impl SerialLink {
    pub fn new(ports: Arc<dyn SerialPorts>, session: Arc<Session>, codec: LineCodec) -> Self {
        Self {
            ports,
            session,
            codec,
            connection: Mutex::new(None),
            status: Arc::new(Mutex::new(LinkStatus::new(LinkState::Disconnected, None, None))),
            last_command: Mutex::new(None),
        }
    }

    /// Open `port_name` and start its read loop. An existing connection is
    /// torn down first.
    pub fn connect(&self, port_name: &str, baud_rate: u32) -> Result<(), ConnectError> {
        let mut connection = lock(&self.connection);
        if let Some(previous) = connection.take() {
            tracing::info!(port = %previous.port, "closing previous connection");
            shutdown(previous);
        }

        publish(&self.status, LinkState::Connecting, Some(port_name), None);

        let PortHandle { reader, writer } = match self.ports.open(port_name, baud_rate) {
            Ok(handle) => handle,
            Err(e) => return Err(self.connect_failed(port_name, format!("{e:#}"))),
        };

        // Published before the loop starts so an immediate close is not overwritten.
        publish(&self.status, LinkState::Connected, Some(port_name), None);

        let stop = Arc::new(AtomicBool::new(false));
        let writer: SharedWriter = Arc::new(Mutex::new(Some(writer)));
        let read_loop = ReadLoop {
            port: port_name.to_string(),
            session: self.session.clone(),
            codec: self.codec.clone(),
            stop: stop.clone(),
            status: self.status.clone(),
            writer: writer.clone(),
        };

        let reader = thread::Builder::new()
            .name("serial-read".to_string())
            .spawn(move || read_loop.run(reader))
            .map_err(|e| self.connect_failed(port_name, format!("could not start read loop: {e}")))?;

        *connection = Some(Connection {
            port: port_name.to_string(),
            writer,
            stop,
            reader,
        });

        tracing::info!(port = port_name, baud_rate, "serial port connected");
        Ok(())
    }

    fn connect_failed(&self, port_name: &str, reason: String) -> ConnectError {
        tracing::warn!(port = port_name, %reason, "failed to open serial port");
        publish(
            &self.status,
            LinkState::Disconnected,
            Some(port_name),
            Some(reason.clone()),
        );
        ConnectError {
            port: port_name.to_string(),
            reason,
        }
    }

    /// Stop the read loop, wait for it and release the port. No-op when there
    /// is no connection. A close or failure already reported by the read loop
    /// is kept as is.
    pub fn disconnect(&self) {
        let mut connection = lock(&self.connection);
        let Some(current) = connection.take() else {
            return;
        };

        let port = current.port.clone();
        shutdown(current);

        let mut status = lock(&self.status);
        if matches!(status.state, LinkState::Connected | LinkState::Connecting) {
            *status = LinkStatus::new(LinkState::Disconnected, Some(&port), None);
        }
        tracing::info!(port = %port, "serial port disconnected");
    }

    /// Encode `command` and write it to the rig. Returns the line written.
    pub fn send(&self, command: &PidCommand) -> Result<String, SendError> {
        let connection = lock(&self.connection);
        let current = match connection.as_ref() {
            Some(current) if self.state() == LinkState::Connected => current,
            _ => return Err(SendError::NotConnected),
        };
        let mut writer = lock(&current.writer);
        let Some(port) = writer.as_mut() else {
            return Err(SendError::NotConnected);
        };

        let line = self.codec.encode_command(command);
        port.write_all(line.as_bytes())
            .and_then(|()| port.flush())
            .map_err(|e| {
                tracing::warn!(port = %current.port, error = %e, "failed to send control parameters");
                SendError::Transport(e)
            })?;

        *lock(&self.last_command) = Some(*command);
        tracing::info!(
            port = %current.port,
            setpoint = command.setpoint,
            kp = command.kp,
            ki = command.ki,
            kd = command.kd,
            line = line.trim_end(),
            "sent control parameters"
        );
        Ok(line)
    }

    pub fn status(&self) -> LinkStatus {
        lock(&self.status).clone()
    }

    pub fn state(&self) -> LinkState {
        lock(&self.status).state
    }

    /// The most recent command that reached the port.
    pub fn last_command(&self) -> Option<PidCommand> {
        *lock(&self.last_command)
    }

    pub fn list_ports(&self) -> anyhow::Result<Vec<String>> {
        self.ports.list_ports()
    }
}

impl Drop for SerialLink {
    fn drop(&mut self) {
        self.disconnect();
    }
}

fn publish(status: &Mutex<LinkStatus>, state: LinkState, port: Option<&str>, detail: Option<String>) {
    *lock(status) = LinkStatus::new(state, port, detail);
}

fn shutdown(connection: Connection) {
    connection.stop.store(true, Ordering::Relaxed);
    if connection.reader.join().is_err() {
        tracing::error!(port = %connection.port, "serial read loop panicked");
    }
    lock(&connection.writer).take();
}

struct ReadLoop {
    port: String,
    session: Arc<Session>,
    codec: LineCodec,
    stop: Arc<AtomicBool>,
    status: Arc<Mutex<LinkStatus>>,
    writer: SharedWriter,
}

impl ReadLoop {
    fn run(self, reader: Box<dyn Read + Send>) {
        tracing::debug!(port = %self.port, "read loop started");

        match pump_lines(reader, &self.stop, |line| self.handle_line(line)) {
            Ok(()) => tracing::debug!(port = %self.port, "read loop stopped"),
            Err(TransportError::Closed) => {
                self.release_port();
                tracing::info!(port = %self.port, "serial port closed by device");
                publish(
                    &self.status,
                    LinkState::Disconnected,
                    Some(&self.port),
                    Some(TransportError::Closed.to_string()),
                );
            }
            Err(e) => {
                self.release_port();
                tracing::warn!(port = %self.port, error = %e, "serial transport failed");
                publish(&self.status, LinkState::Failed, Some(&self.port), Some(e.to_string()));
            }
        }
    }

    /// Drop the write half so the port is released with the loop.
    fn release_port(&self) {
        lock(&self.writer).take();
    }

    fn handle_line(&self, line: &str) {
        match self.codec.decode_sample(line) {
            Some(distance) => {
                let sample = self.session.record(distance);
                tracing::debug!(
                    distance = sample.distance,
                    timestamp = sample.timestamp,
                    "position report"
                );
            }
            None => {
                self.session.ignore_line();
                tracing::trace!(line = line.trim_end(), "ignored line");
            }
        }
    }
}

/// Feed newline-terminated lines to `on_line` until `stop` is raised (`Ok`)
/// or the transport ends (`Err`). Read timeouts only re-check `stop`.
///
/// A line longer than `MAX_LINE_BYTES` is dropped up to and including its
/// newline; framing picks up again after it.
fn pump_lines<R: Read>(
    reader: R,
    stop: &AtomicBool,
    mut on_line: impl FnMut(&str),
) -> Result<(), TransportError> {
    let mut reader = BufReader::new(reader);
    let mut line = Vec::with_capacity(128);
    let mut discarding = false;

    while !stop.load(Ordering::Relaxed) {
        if line.len() > MAX_LINE_BYTES {
            if !discarding {
                tracing::trace!(bytes = line.len(), "discarding overlong line");
            }
            discarding = true;
            line.clear();
        }

        // Never buffer more than one byte past the limit.
        let budget = (MAX_LINE_BYTES + 1 - line.len()) as u64;
        match (&mut reader).take(budget).read_until(b'\n', &mut line) {
            Ok(0) => return Err(TransportError::Closed),
            Ok(_) if line.ends_with(b"\n") => {
                if !discarding {
                    on_line(&String::from_utf8_lossy(&line));
                }
                discarding = false;
                line.clear();
            }
            // Budget used up; dropped at the top of the loop.
            Ok(_) if line.len() > MAX_LINE_BYTES => {}
            // Stream ended mid-line; the next read reports the close.
            Ok(_) => line.clear(),
            Err(e) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock) => {}
            Err(e) => return Err(TransportError::Io(e)),
        }
    }

    Ok(())
}

// Serial ports backed by the operating system
use crate::application::serial_ports::{PortHandle, SerialPorts};
use anyhow::Context;
use serialport::{DataBits, FlowControl, Parity, StopBits};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct SystemPorts {
    read_timeout: Duration,
}

impl SystemPorts {
    pub fn new(read_timeout: Duration) -> Self {
        Self { read_timeout }
    }
}

impl SerialPorts for SystemPorts {
    fn open(&self, port_name: &str, baud_rate: u32) -> anyhow::Result<PortHandle> {
        let port = serialport::new(port_name, baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(self.read_timeout)
            .open()?;

        let writer = port
            .try_clone()
            .context("failed to clone serial port handle")?;

        tracing::debug!(port = port_name, baud_rate, "opened serial port");

        Ok(PortHandle {
            reader: Box::new(port),
            writer: Box::new(writer),
        })
    }

    fn list_ports(&self) -> anyhow::Result<Vec<String>> {
        let ports = serialport::available_ports().context("failed to enumerate serial ports")?;
        Ok(ports.into_iter().map(|p| p.port_name).collect())
    }
}

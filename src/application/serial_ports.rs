// Port access trait used by the serial link
use std::io::{Read, Write};

/// The two halves of an open port. The reader belongs to the read loop, the
/// writer to whoever sends commands.
pub struct PortHandle {
    pub reader: Box<dyn Read + Send>,
    pub writer: Box<dyn Write + Send>,
}

pub trait SerialPorts: Send + Sync {
    /// Open `port_name` at `baud_rate`, 8N1.
    ///
    /// Reads on the returned reader must fail with `TimedOut` after a short
    /// idle period instead of blocking forever, so the read loop can notice a
    /// stop request.
    fn open(&self, port_name: &str, baud_rate: u32) -> anyhow::Result<PortHandle>;

    /// Names of the ports currently present on the system.
    fn list_ports(&self) -> anyhow::Result<Vec<String>>;
}

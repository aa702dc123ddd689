use crate::infrastructure::line_codec::{DEFAULT_MARKER, DEFAULT_SETPOINT_OFFSET};
use config::builder::DefaultState;
use config::{ConfigBuilder, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct ConsoleConfig {
    pub server: ServerSettings,
    pub serial: SerialSettings,
    pub protocol: ProtocolSettings,
    pub window: WindowSettings,
    pub console: ConsoleSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    pub bind: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SerialSettings {
    /// Port to connect to at start-up, if any.
    #[serde(default)]
    pub port: Option<String>,
    pub baud_rate: u32,
    pub read_timeout_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ProtocolSettings {
    pub marker: String,
    pub setpoint_offset: f64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WindowSettings {
    /// Default visible span, in seconds of data.
    pub seconds: f64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ConsoleSettings {
    /// Restart the session after every successful parameter upload.
    pub reset_on_send: bool,
}

impl ConsoleConfig {
    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(!self.protocol.marker.trim().is_empty(), "protocol.marker must not be empty");
        anyhow::ensure!(
            self.protocol.setpoint_offset.is_finite(),
            "protocol.setpoint_offset must be finite"
        );
        anyhow::ensure!(self.serial.baud_rate > 0, "serial.baud_rate must be positive");
        anyhow::ensure!(self.serial.read_timeout_ms > 0, "serial.read_timeout_ms must be positive");
        anyhow::ensure!(
            self.window.seconds.is_finite() && self.window.seconds >= 0.0,
            "window.seconds must be a non-negative number"
        );
        Ok(())
    }
}

/// Built-in defaults, overridden by `config/levitation.*` and then by
/// `LEVITATION__SECTION__KEY` environment variables.
pub fn load_console_config() -> anyhow::Result<ConsoleConfig> {
    let builder = defaults()?
        .add_source(File::with_name("config/levitation").required(false))
        .add_source(
            Environment::with_prefix("LEVITATION")
                .separator("__")
                .try_parsing(true),
        );

    finish(builder)
}

fn defaults() -> anyhow::Result<ConfigBuilder<DefaultState>> {
    Ok(config::Config::builder()
        .set_default("server.bind", "127.0.0.1:8080")?
        .set_default("serial.baud_rate", 9600)?
        .set_default("serial.read_timeout_ms", 100)?
        .set_default("protocol.marker", DEFAULT_MARKER)?
        .set_default("protocol.setpoint_offset", DEFAULT_SETPOINT_OFFSET)?
        .set_default("window.seconds", 3.0)?
        .set_default("console.reset_on_send", true)?)
}

fn finish(builder: ConfigBuilder<DefaultState>) -> anyhow::Result<ConsoleConfig> {
    let config: ConsoleConfig = builder.build()?.try_deserialize()?;
    config.validate()?;
    Ok(config)
}

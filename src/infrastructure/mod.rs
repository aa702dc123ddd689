// Infrastructure layer - External dependencies and adapters
pub mod clock;
pub mod config;
pub mod line_codec;
pub mod system_ports;

// Application state for HTTP handlers
use crate::application::console_service::ConsoleService;

#[derive(Clone)]
pub struct AppState {
    pub console: ConsoleService,
    /// Used when a connect request does not name a baud rate.
    pub default_baud_rate: u32,
}

// Presentation layer - HTTP/JSON surface of the console
pub mod app_state;
pub mod handlers;

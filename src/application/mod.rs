// Application layer - Use cases and the seams to the outside world
pub mod clock;
pub mod console_service;
pub mod serial_link;
pub mod serial_ports;
pub mod session;
pub mod telemetry_buffer;

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Lock a mutex, recovering the data if a previous holder panicked.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// Clock trait for session-relative timestamps
use std::time::Instant;

pub trait Clock: Send + Sync {
    /// Current monotonic instant.
    fn now(&self) -> Instant;
}

//! Production Environment implementation using system time and RNG.
//!
//! Real monotonic time, OS randomness (getrandom) and tokio sleep. Behavior
//! is non-deterministic; simulation uses the harness environment instead.

use std::time::Duration;

use touchline_core::Environment;

/// Production environment using system time and OS randomness.
///
/// # Panics
///
/// Panics if the OS RNG fails. Identifiers and redial jitter cannot be
/// produced without it, and the failure indicates an OS-level fault.
#[derive(Debug, Clone, Default)]
pub struct SystemEnv;

impl SystemEnv {
    /// Create a new system environment.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Environment for SystemEnv {
    type Instant = std::time::Instant;

    fn now(&self) -> Self::Instant {
        std::time::Instant::now()
    }

    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send {
        tokio::time::sleep(duration)
    }

    #[allow(clippy::expect_used)]
    fn random_bytes(&self, buffer: &mut [u8]) {
        getrandom::fill(buffer).expect("invariant: OS RNG failure is unrecoverable");
    }

    fn unix_millis(&self) -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map_or(0, |elapsed| elapsed.as_millis() as u64)
    }
}

//! Environment abstraction for deterministic testing.
//!
//! Decouples state machine logic from system resources (time, randomness,
//! wall clock). Production uses the real clock and OS entropy; simulation
//! uses a virtual clock and a seeded RNG so every run is reproducible.

use std::{
    fmt::Debug,
    future::Future,
    ops::{Add, Sub},
    time::Duration,
};

/// Monotonic instant usable by the state machines.
///
/// Implemented for every type with the required arithmetic, which covers
/// `std::time::Instant` and virtual simulation instants alike.
pub trait Timestamp:
    Copy + Ord + Debug + Send + Sync + 'static + Sub<Output = Duration> + Add<Duration, Output = Self>
{
}

impl<T> Timestamp for T where
    T: Copy
        + Ord
        + Debug
        + Send
        + Sync
        + 'static
        + Sub<Output = Duration>
        + Add<Duration, Output = Self>
{
}

/// Abstract environment providing time, randomness, and async sleep.
///
/// Implementations MUST guarantee:
///
/// - `now()` never goes backwards
/// - given the same seed, simulation implementations produce the same
///   sequence of random values
pub trait Environment: Clone + Send + Sync + 'static {
    /// Instant type used by this environment.
    ///
    /// Production uses `std::time::Instant`, simulation a virtual instant.
    type Instant: Timestamp;

    /// Current monotonic time.
    fn now(&self) -> Self::Instant;

    /// Sleeps for the specified duration.
    ///
    /// Only driver code awaits this; state machines never do.
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send;

    /// Fills the buffer with random bytes.
    fn random_bytes(&self, buffer: &mut [u8]);

    /// Wall clock time in milliseconds since the Unix epoch.
    ///
    /// Used only for identifiers, never for scheduling.
    fn unix_millis(&self) -> u64;

    /// Generates a random `u64`.
    fn random_u64(&self) -> u64 {
        let mut bytes = [0u8; 8];
        self.random_bytes(&mut bytes);
        u64::from_be_bytes(bytes)
    }
}

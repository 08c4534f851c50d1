//! Virtual-time environment for deterministic simulation.
//!
//! Time only moves when the test advances it, and randomness comes from a
//! seeded ChaCha stream, so a run is fully determined by its seed and its
//! input script. Clones share the same clock and RNG.

use std::{
    future::Future,
    ops::{Add, Sub},
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use touchline_core::Environment;

/// Wall clock reading at virtual time zero (2025-01-01T00:00:00Z).
pub const SIM_EPOCH_MILLIS: u64 = 1_735_689_600_000;

/// Seed used by [`SimEnv::new`].
pub const DEFAULT_SEED: u64 = 0x746f_7563_686c_696e;

/// Instant on the virtual clock: time elapsed since the simulation started.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SimInstant(Duration);

impl SimInstant {
    /// Virtual time zero.
    pub const ZERO: Self = Self(Duration::ZERO);

    /// Time elapsed since virtual time zero.
    pub fn elapsed(self) -> Duration {
        self.0
    }
}

impl Sub for SimInstant {
    type Output = Duration;

    fn sub(self, earlier: Self) -> Duration {
        self.0.saturating_sub(earlier.0)
    }
}

impl Add<Duration> for SimInstant {
    type Output = Self;

    fn add(self, duration: Duration) -> Self {
        Self(self.0.saturating_add(duration))
    }
}

/// Seeded environment over a virtual clock.
#[derive(Clone)]
pub struct SimEnv {
    seed: u64,
    clock: Arc<Mutex<SimInstant>>,
    rng: Arc<Mutex<ChaCha8Rng>>,
}

impl std::fmt::Debug for SimEnv {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimEnv").field("seed", &self.seed).field("now", &self.now()).finish()
    }
}

impl Default for SimEnv {
    fn default() -> Self {
        Self::new()
    }
}

impl SimEnv {
    /// Environment seeded with [`DEFAULT_SEED`].
    pub fn new() -> Self {
        Self::with_seed(DEFAULT_SEED)
    }

    /// Environment whose random stream is determined by `seed`.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            seed,
            clock: Arc::new(Mutex::new(SimInstant::ZERO)),
            rng: Arc::new(Mutex::new(ChaCha8Rng::seed_from_u64(seed))),
        }
    }

    /// Seed this environment was created with.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Move the virtual clock forward. Returns the new time.
    pub fn advance(&self, duration: Duration) -> SimInstant {
        let mut clock = self.clock.lock().unwrap_or_else(PoisonError::into_inner);
        *clock = *clock + duration;
        *clock
    }
}

impl Environment for SimEnv {
    type Instant = SimInstant;

    fn now(&self) -> SimInstant {
        *self.clock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Completes immediately after moving the virtual clock.
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send {
        self.advance(duration);
        std::future::ready(())
    }

    fn random_bytes(&self, buffer: &mut [u8]) {
        self.rng.lock().unwrap_or_else(PoisonError::into_inner).fill_bytes(buffer);
    }

    fn unix_millis(&self) -> u64 {
        SIM_EPOCH_MILLIS + self.now().elapsed().as_millis() as u64
    }
}

//! Shared connection state machine.
//!
//! Owns the lifecycle and reconnect policy of the single duplex connection.
//! Uses the action pattern: methods take time as input and return actions for
//! the driver to execute. Dial outcomes come back in through
//! [`on_open`](ConnectionManager::on_open),
//! [`on_connect_error`](ConnectionManager::on_connect_error) and friends.
//!
//! # State Machine
//!
//! ```text
//!                 connect()                  on_open()
//! ┌──────────────┐ ──────────> ┌────────────┐ ──────────> ┌───────────┐
//! │ Disconnected │             │ Connecting │             │ Connected │
//! └──────────────┘ <────────── └────────────┘ <────────── └───────────┘
//!        ↑        attempts cap    │      ↑     on_closed()       │
//!        │                        └──────┘                       │
//!        │                  error + backoff redial               │
//!        └─────────────────── on_server_disconnect() ────────────┘
//! ```

use std::time::Duration;

use crate::{env::Timestamp, status::ConnectionStatus};

/// Server used when none is configured.
pub const DEFAULT_SERVER_URL: &str = "http://localhost:3001";

/// Delay before the first redial.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_millis(3000);

/// Ceiling for any single redial delay.
pub const DEFAULT_RECONNECT_DELAY_MAX: Duration = Duration::from_millis(10_000);

/// Consecutive failures after which redialing stops.
pub const DEFAULT_RECONNECT_ATTEMPTS: u32 = 10;

/// Fraction of the delay that jitter may add or remove.
pub const DEFAULT_RANDOMIZATION_FACTOR: f64 = 0.5;

/// Actions returned by the connection state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionAction {
    /// Open the transport and perform the namespace handshake
    Dial {
        /// Server base URL
        url: String,
    },

    /// Tear down the transport
    Close,

    /// Derived status changed; notify observers
    StatusChanged(ConnectionStatus),
}

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No transport and no redial scheduled
    Disconnected,
    /// Dial in flight or redial scheduled
    Connecting,
    /// Namespace handshake completed
    Connected,
}

/// Connection configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionConfig {
    /// Server base URL
    pub url: String,
    /// Delay before the first redial
    pub reconnect_delay: Duration,
    /// Ceiling for a single redial delay
    pub reconnect_delay_max: Duration,
    /// Consecutive failures before giving up
    pub reconnect_attempts: u32,
    /// Jitter fraction in `0.0..=1.0`
    pub randomization_factor: f64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_SERVER_URL.to_string(),
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            reconnect_delay_max: DEFAULT_RECONNECT_DELAY_MAX,
            reconnect_attempts: DEFAULT_RECONNECT_ATTEMPTS,
            randomization_factor: DEFAULT_RANDOMIZATION_FACTOR,
        }
    }
}

impl ConnectionConfig {
    /// Config for `url` with the default reconnect policy.
    pub fn with_url(url: impl Into<String>) -> Self {
        Self { url: url.into(), ..Self::default() }
    }

    /// Delay before redial number `attempt` (1-based).
    ///
    /// `base * 2^(attempt-1)`, moved up or down by at most
    /// `randomization_factor` of itself, then capped at the ceiling. `jitter`
    /// is a uniformly random `u64` supplied by the caller.
    pub fn backoff_delay(&self, attempt: u32, jitter: u64) -> Duration {
        let exponent = attempt.saturating_sub(1).min(32);
        let base = self.reconnect_delay.as_millis() as f64 * 2f64.powi(exponent as i32);

        let factor = self.randomization_factor.clamp(0.0, 1.0);
        let unit = (jitter >> 11) as f64 / (1u64 << 53) as f64;
        let deviation = (unit * factor * base).floor();
        let jittered = if jitter & 1 == 0 { base - deviation } else { base + deviation };

        let max = self.reconnect_delay_max.as_millis() as f64;
        Duration::from_millis(jittered.clamp(0.0, max) as u64)
    }
}

/// Connection state machine
///
/// Pure state machine: no I/O, no environment. Time and jitter are passed to
/// the methods that schedule redials.
///
/// Generic over the instant type to support both real time and virtual time.
#[derive(Debug, Clone)]
pub struct ConnectionManager<I: Timestamp> {
    state: ConnectionState,
    config: ConnectionConfig,
    /// Consecutive failures since the last success or reset
    attempts: u32,
    /// Attempt bound reached; no redial until `connect()`
    exhausted: bool,
    /// Last connect failure detail
    error: Option<String>,
    /// When the next redial fires, if one is scheduled
    redial_at: Option<I>,
}

impl<I: Timestamp> ConnectionManager<I> {
    /// Create a manager in [`ConnectionState::Disconnected`].
    pub fn new(config: ConnectionConfig) -> Self {
        Self {
            state: ConnectionState::Disconnected,
            config,
            attempts: 0,
            exhausted: false,
            error: None,
            redial_at: None,
        }
    }

    /// Current connection state
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Configuration in use
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Consecutive failed attempts
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Whether the attempt bound was reached
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// When the scheduled redial fires. `None` if nothing is scheduled.
    pub fn next_redial(&self) -> Option<I> {
        self.redial_at
    }

    /// Derived status
    pub fn status(&self) -> ConnectionStatus {
        ConnectionStatus {
            is_connected: self.state == ConnectionState::Connected,
            is_connecting: self.state == ConnectionState::Connecting,
            error: self.error.clone(),
            reconnect_attempts: self.attempts,
        }
    }

    /// Start connecting.
    ///
    /// No-op while connected or connecting. From disconnected (including
    /// after the attempt bound was reached) the counters reset and a dial
    /// starts immediately.
    pub fn connect(&mut self) -> Vec<ConnectionAction> {
        if self.state != ConnectionState::Disconnected {
            return Vec::new();
        }

        let before = self.status();
        self.attempts = 0;
        self.exhausted = false;
        self.error = None;
        self.redial_at = None;
        self.state = ConnectionState::Connecting;
        tracing::info!(url = %self.config.url, "connecting");

        let mut actions = vec![self.dial()];
        self.push_status(&before, &mut actions);
        actions
    }

    /// Tear down and reset every counter. Safe when already disconnected.
    pub fn disconnect(&mut self) -> Vec<ConnectionAction> {
        let before = self.status();
        let was_live = self.state != ConnectionState::Disconnected;

        self.state = ConnectionState::Disconnected;
        self.attempts = 0;
        self.exhausted = false;
        self.error = None;
        self.redial_at = None;

        let mut actions = Vec::new();
        if was_live {
            tracing::info!("disconnecting");
            actions.push(ConnectionAction::Close);
        }
        self.push_status(&before, &mut actions);
        actions
    }

    /// Namespace handshake completed.
    pub fn on_open(&mut self) -> Vec<ConnectionAction> {
        if self.state != ConnectionState::Connecting || self.redial_at.is_some() {
            tracing::debug!(state = ?self.state, "ignoring open outside of a dial");
            return Vec::new();
        }

        let before = self.status();
        self.state = ConnectionState::Connected;
        self.attempts = 0;
        self.error = None;
        tracing::info!(url = %self.config.url, "connected");

        let mut actions = Vec::new();
        self.push_status(&before, &mut actions);
        actions
    }

    /// Dial or namespace handshake failed.
    ///
    /// Schedules a redial with backoff while attempts remain, otherwise
    /// stops for good until the next [`connect`](Self::connect).
    pub fn on_connect_error(
        &mut self,
        reason: impl Into<String>,
        now: I,
        jitter: u64,
    ) -> Vec<ConnectionAction> {
        if self.state != ConnectionState::Connecting || self.redial_at.is_some() {
            tracing::debug!(state = ?self.state, "ignoring connect error outside of a dial");
            return Vec::new();
        }

        let before = self.status();
        let reason = reason.into();
        self.attempts = self.attempts.saturating_add(1);
        self.error = Some(reason.clone());

        if self.attempts >= self.config.reconnect_attempts {
            self.exhausted = true;
            self.state = ConnectionState::Disconnected;
            tracing::warn!(attempts = self.attempts, %reason, "giving up on reconnection");
        } else {
            let delay = self.config.backoff_delay(self.attempts, jitter);
            self.redial_at = Some(now + delay);
            tracing::warn!(attempts = self.attempts, ?delay, %reason, "connect failed, retrying");
        }

        let mut actions = Vec::new();
        self.push_status(&before, &mut actions);
        actions
    }

    /// Transport dropped underneath us.
    ///
    /// A drop while connected is transient and schedules a redial. A drop
    /// during a dial counts as a failed attempt.
    pub fn on_closed(
        &mut self,
        reason: impl Into<String>,
        now: I,
        jitter: u64,
    ) -> Vec<ConnectionAction> {
        match self.state {
            ConnectionState::Connected => {
                let before = self.status();
                let reason = reason.into();
                let delay = self.config.backoff_delay(self.attempts + 1, jitter);
                self.state = ConnectionState::Connecting;
                self.redial_at = Some(now + delay);
                tracing::warn!(?delay, %reason, "transport closed, reconnecting");

                let mut actions = Vec::new();
                self.push_status(&before, &mut actions);
                actions
            },
            ConnectionState::Connecting => self.on_connect_error(reason, now, jitter),
            ConnectionState::Disconnected => Vec::new(),
        }
    }

    /// Server ended the namespace session. Not retried.
    ///
    /// Counters are kept; an explicit [`connect`](Self::connect) resumes.
    pub fn on_server_disconnect(&mut self) -> Vec<ConnectionAction> {
        if self.state == ConnectionState::Disconnected {
            return Vec::new();
        }

        let before = self.status();
        self.state = ConnectionState::Disconnected;
        self.redial_at = None;
        tracing::info!("server closed the session");

        let mut actions = vec![ConnectionAction::Close];
        self.push_status(&before, &mut actions);
        actions
    }

    /// Fire a due redial.
    pub fn tick(&mut self, now: I) -> Vec<ConnectionAction> {
        match self.redial_at {
            Some(at) if self.state == ConnectionState::Connecting && now >= at => {
                self.redial_at = None;
                tracing::debug!(attempt = self.attempts + 1, "redialing");
                vec![self.dial()]
            },
            _ => Vec::new(),
        }
    }

    fn dial(&self) -> ConnectionAction {
        ConnectionAction::Dial { url: self.config.url.clone() }
    }

    fn push_status(&self, before: &ConnectionStatus, actions: &mut Vec<ConnectionAction>) {
        let after = self.status();
        if after != *before {
            actions.push(ConnectionAction::StatusChanged(after));
        }
    }
}

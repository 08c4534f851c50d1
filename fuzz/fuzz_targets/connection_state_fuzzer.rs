//! Fuzz target for the shared connection state machine
//!
//! Drives `ConnectionManager` with arbitrary interleavings of user calls,
//! transport outcomes and clock movement.
//!
//! # Invariants
//!
//! - Failed attempts never exceed the configured bound
//! - A scheduled redial implies `Connecting` and is never further out than
//!   the delay ceiling
//! - `Connected` implies a clean slate: no attempts, no redial pending
//! - Exhaustion implies `Disconnected`
//! - Dials come only from `connect()` out of `Disconnected` or from a due
//!   `tick()`
//! - Derived status always agrees with the state

#![no_main]

use std::{
    ops::{Add, Sub},
    time::Duration,
};

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use touchline_core::{ConnectionAction, ConnectionConfig, ConnectionManager, ConnectionState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct At(Duration);

impl Sub for At {
    type Output = Duration;

    fn sub(self, earlier: Self) -> Duration {
        self.0.saturating_sub(earlier.0)
    }
}

impl Add<Duration> for At {
    type Output = Self;

    fn add(self, duration: Duration) -> Self {
        Self(self.0 + duration)
    }
}

#[derive(Debug, Clone, Arbitrary)]
struct Scenario {
    attempts: u8,
    delay_ms: u16,
    delay_max_ms: u16,
    factor_percent: u8,
    ops: Vec<Op>,
}

#[derive(Debug, Clone, Arbitrary)]
enum Op {
    Connect,
    Disconnect,
    Open,
    ConnectError { jitter: u64 },
    Closed { jitter: u64 },
    ServerDisconnect,
    Advance { ms: u16 },
}

fuzz_target!(|scenario: Scenario| {
    let config = ConnectionConfig {
        url: "http://fuzz".to_string(),
        reconnect_delay: Duration::from_millis(u64::from(scenario.delay_ms)),
        reconnect_delay_max: Duration::from_millis(u64::from(scenario.delay_max_ms)),
        reconnect_attempts: u32::from(scenario.attempts % 12) + 1,
        randomization_factor: f64::from(scenario.factor_percent % 101) / 100.0,
    };
    let mut conn: ConnectionManager<At> = ConnectionManager::new(config.clone());
    let mut now = At(Duration::ZERO);

    for op in scenario.ops {
        let before = conn.state();
        let (actions, may_dial) = match op {
            Op::Connect => (conn.connect(), before == ConnectionState::Disconnected),
            Op::Disconnect => (conn.disconnect(), false),
            Op::Open => (conn.on_open(), false),
            Op::ConnectError { jitter } => (conn.on_connect_error("refused", now, jitter), false),
            Op::Closed { jitter } => (conn.on_closed("reset", now, jitter), false),
            Op::ServerDisconnect => (conn.on_server_disconnect(), false),
            Op::Advance { ms } => {
                now = now + Duration::from_millis(u64::from(ms));
                let due = conn.next_redial().is_some_and(|at| now >= at);
                (conn.tick(now), due)
            },
        };

        let dials = actions.iter().filter(|a| matches!(a, ConnectionAction::Dial { .. })).count();
        assert!(dials <= 1, "more than one dial in one step");
        assert!(dials == 0 || may_dial, "unexpected dial from {before:?}");

        assert!(conn.attempts() <= config.reconnect_attempts);
        if conn.is_exhausted() {
            assert_eq!(conn.state(), ConnectionState::Disconnected);
        }
        if let Some(at) = conn.next_redial() {
            assert_eq!(conn.state(), ConnectionState::Connecting);
            assert!(at - now <= config.reconnect_delay_max);
        }
        if conn.state() == ConnectionState::Connected {
            assert_eq!(conn.attempts(), 0);
            assert!(conn.next_redial().is_none());
        }

        let status = conn.status();
        assert_eq!(status.is_connected, conn.state() == ConnectionState::Connected);
        assert_eq!(status.is_connecting, conn.state() == ConnectionState::Connecting);
        assert_eq!(status.reconnect_attempts, conn.attempts());
    }
});

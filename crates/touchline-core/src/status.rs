//! Connection status and its observer fan-out.
//!
//! [`ConnectionStatus`] is derived from the connection state machine on every
//! transition. [`StatusBus`] keeps an ordered list of observers keyed by
//! [`SubscriptionId`], so removing one never depends on closure identity and
//! registering the same closure twice yields two independent subscriptions.

use std::fmt;

/// Snapshot of the shared connection as presented to observers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionStatus {
    /// Namespace handshake completed
    pub is_connected: bool,
    /// Dial in flight or redial scheduled
    pub is_connecting: bool,
    /// Last connect failure while not connected
    pub error: Option<String>,
    /// Consecutive failed attempts since the last success or reset
    pub reconnect_attempts: u32,
}

impl ConnectionStatus {
    /// Short label for status lines.
    pub fn label(&self) -> &'static str {
        if self.is_connected {
            "connected"
        } else if self.is_connecting {
            "connecting"
        } else {
            "disconnected"
        }
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())?;
        if self.reconnect_attempts > 0 {
            write!(f, " (attempt {})", self.reconnect_attempts)?;
        }
        if let Some(error) = &self.error {
            write!(f, ": {error}")?;
        }
        Ok(())
    }
}

/// Handle returned by [`StatusBus::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

/// Boxed status observer.
pub type StatusObserver = Box<dyn FnMut(&ConnectionStatus) + Send>;

/// Ordered observer list for connection status changes.
pub struct StatusBus {
    observers: Vec<(SubscriptionId, StatusObserver)>,
    next_id: u64,
    current: ConnectionStatus,
}

impl Default for StatusBus {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for StatusBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatusBus")
            .field("observers", &self.observers.len())
            .field("current", &self.current)
            .finish_non_exhaustive()
    }
}

impl StatusBus {
    /// Create an empty bus reporting a disconnected status.
    pub fn new() -> Self {
        Self { observers: Vec::new(), next_id: 0, current: ConnectionStatus::default() }
    }

    /// Register an observer.
    ///
    /// The observer runs immediately with the current status and again on
    /// every later [`publish`](Self::publish).
    pub fn subscribe<F>(&mut self, observer: F) -> SubscriptionId
    where
        F: FnMut(&ConnectionStatus) + Send + 'static,
    {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;

        let mut observer: StatusObserver = Box::new(observer);
        observer(&self.current);
        self.observers.push((id, observer));
        id
    }

    /// Remove exactly the observer registered under `id`.
    ///
    /// Returns `false` if it was already removed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(existing, _)| *existing != id);
        self.observers.len() != before
    }

    /// Record a new status and notify every observer in registration order.
    pub fn publish(&mut self, status: ConnectionStatus) {
        self.current = status;
        for (_, observer) in &mut self.observers {
            observer(&self.current);
        }
    }

    /// Last published status.
    pub fn current(&self) -> &ConnectionStatus {
        &self.current
    }

    /// Number of registered observers.
    pub fn len(&self) -> usize {
        self.observers.len()
    }

    /// Whether no observer is registered.
    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    fn recorder() -> (Arc<Mutex<Vec<ConnectionStatus>>>, impl FnMut(&ConnectionStatus) + Send) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        (seen, move |status: &ConnectionStatus| sink.lock().unwrap().push(status.clone()))
    }

    fn connected() -> ConnectionStatus {
        ConnectionStatus { is_connected: true, ..ConnectionStatus::default() }
    }

    #[test]
    fn subscribe_invokes_immediately() {
        let mut bus = StatusBus::new();
        let (seen, observer) = recorder();

        bus.subscribe(observer);

        assert_eq!(*seen.lock().unwrap(), vec![ConnectionStatus::default()]);
    }

    #[test]
    fn unsubscribe_removes_only_that_observer() {
        let mut bus = StatusBus::new();
        let (first, a) = recorder();
        let (second, b) = recorder();
        let id_a = bus.subscribe(a);
        bus.subscribe(b);

        assert!(bus.unsubscribe(id_a));
        assert!(!bus.unsubscribe(id_a));
        bus.publish(connected());

        assert_eq!(first.lock().unwrap().len(), 1);
        assert_eq!(second.lock().unwrap().last(), Some(&connected()));
        assert_eq!(bus.len(), 1);
    }

    #[test]
    fn same_closure_registered_twice_is_independent() {
        let mut bus = StatusBus::new();
        let count = Arc::new(Mutex::new(0_u32));
        let make = || {
            let count = Arc::clone(&count);
            move |_: &ConnectionStatus| *count.lock().unwrap() += 1
        };

        let first = bus.subscribe(make());
        bus.subscribe(make());
        bus.unsubscribe(first);
        bus.publish(connected());

        // two immediate calls plus one publish
        assert_eq!(*count.lock().unwrap(), 3);
    }

    #[test]
    fn display_includes_attempts_and_error() {
        let status = ConnectionStatus {
            is_connecting: true,
            error: Some("refused".into()),
            reconnect_attempts: 2,
            ..ConnectionStatus::default()
        };
        assert_eq!(status.to_string(), "connecting (attempt 2): refused");
    }
}

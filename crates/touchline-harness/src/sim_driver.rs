//! Simulation driver implementing the Driver trait.
//!
//! `SimDriver` provides the same interface as the production WebSocket
//! driver but for deterministic testing. It implements [`Driver`] so the same
//! [`touchline_app::Runtime`] orchestration code runs in both production and
//! simulation. The test plays the server: it decides how dials resolve,
//! injects pushes and drops, and inspects what the client emitted.

use std::{
    collections::{BTreeMap, VecDeque},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use touchline_app::{App, AppAction, AppEvent, Driver, ViewId};
use touchline_core::Environment;
use touchline_proto::{ClientIntent, ServerEvent};

use crate::{
    SimEnv,
    invariants::{InvariantRegistry, Snapshot},
    sim_env::SimInstant,
};

/// Error type for simulation driver.
#[derive(Debug, Clone)]
pub struct SimDriverError(pub String);

impl std::fmt::Display for SimDriverError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SimDriverError: {}", self.0)
    }
}

impl std::error::Error for SimDriverError {}

/// How the simulated server answers a dial.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DialPolicy {
    /// Complete the namespace handshake
    #[default]
    Accept,
    /// Fail the dial
    Refuse,
    /// Leave the dial pending until the test resolves it
    Hold,
}

/// Scripted user interaction, run against the app when polled.
pub type UserInput = Box<dyn FnOnce(&mut App<SimEnv>, SimInstant) -> Vec<AppAction> + Send>;

enum SimInput {
    Event(AppEvent),
    User(UserInput),
}

/// Shared state for event injection.
///
/// This allows injection from outside async contexts.
#[derive(Default)]
struct SharedState {
    pending: VecDeque<SimInput>,
    outgoing: Vec<ClientIntent>,
    dials: Vec<(SimInstant, String)>,
    held_dial: bool,
    closes: usize,
    notices: Vec<String>,
    renders: usize,
    /// Transport session open on the server side
    session_open: bool,
    policy: DialPolicy,
    /// Entry ids per view at the last invariant check
    entries: BTreeMap<ViewId, Vec<String>>,
}

/// Simulation driver for deterministic testing.
///
/// Implements [`Driver`] so the same [`touchline_app::Runtime`]
/// orchestration code runs in both the production client and simulation
/// tests.
pub struct SimDriver {
    env: SimEnv,
    state: Arc<Mutex<SharedState>>,
    invariants: Option<InvariantRegistry>,
}

impl std::fmt::Debug for SimDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimDriver").field("env", &self.env).finish_non_exhaustive()
    }
}

impl SimDriver {
    /// Create a driver over `env`. Dials are accepted by default.
    pub fn new(env: SimEnv) -> Self {
        Self { env, state: Arc::new(Mutex::new(SharedState::default())), invariants: None }
    }

    /// Enable invariant checking after every processed input.
    #[must_use]
    pub fn with_invariants(mut self, registry: InvariantRegistry) -> Self {
        self.invariants = Some(registry);
        self
    }

    /// Environment shared with the app.
    pub fn env(&self) -> &SimEnv {
        &self.env
    }

    /// Change how later dials resolve.
    pub fn set_dial_policy(&self, policy: DialPolicy) {
        self.state().policy = policy;
    }

    /// Inject an `AppEvent` for processing.
    pub fn inject_event(&self, event: AppEvent) {
        self.state().pending.push_back(SimInput::Event(event));
    }

    /// Inject a server push.
    pub fn inject_push(&self, event: ServerEvent) {
        self.inject_event(AppEvent::Received(event));
    }

    /// Inject a user interaction.
    pub fn inject_user<F>(&self, input: F)
    where
        F: FnOnce(&mut App<SimEnv>, SimInstant) -> Vec<AppAction> + Send + 'static,
    {
        self.state().pending.push_back(SimInput::User(Box::new(input)));
    }

    /// Inject a tick event.
    pub fn inject_tick(&self) {
        self.inject_event(AppEvent::Tick);
    }

    /// Move virtual time forward and inject a tick.
    pub fn advance(&self, duration: Duration) {
        self.env.advance(duration);
        self.inject_tick();
    }

    /// Complete a dial held under [`DialPolicy::Hold`].
    pub fn accept_dial(&self) {
        let mut state = self.state();
        if std::mem::take(&mut state.held_dial) {
            state.session_open = true;
            state.pending.push_back(SimInput::Event(AppEvent::Connected));
        }
    }

    /// Fail a dial held under [`DialPolicy::Hold`].
    pub fn refuse_dial(&self, reason: &str) {
        let mut state = self.state();
        if std::mem::take(&mut state.held_dial) {
            let reason = reason.to_string();
            state.pending.push_back(SimInput::Event(AppEvent::ConnectFailed { reason }));
        }
    }

    /// Drop the transport underneath the client.
    pub fn drop_connection(&self, reason: &str) {
        let mut state = self.state();
        state.session_open = false;
        state.held_dial = false;
        let reason = reason.to_string();
        state.pending.push_back(SimInput::Event(AppEvent::Closed { reason }));
    }

    /// End the namespace session from the server side.
    pub fn server_disconnect(&self) {
        let mut state = self.state();
        state.session_open = false;
        state.pending.push_back(SimInput::Event(AppEvent::ServerDisconnect));
    }

    /// Take all captured outgoing intents.
    pub fn take_outgoing(&self) -> Vec<ClientIntent> {
        std::mem::take(&mut self.state().outgoing)
    }

    /// Take all notices shown to the user.
    pub fn take_notices(&self) -> Vec<String> {
        std::mem::take(&mut self.state().notices)
    }

    /// Every dial so far with the virtual time it was issued.
    pub fn dials(&self) -> Vec<(SimInstant, String)> {
        self.state().dials.clone()
    }

    /// Number of dials so far.
    pub fn dial_count(&self) -> usize {
        self.state().dials.len()
    }

    /// Number of transport closes requested by the client.
    pub fn closes(&self) -> usize {
        self.state().closes
    }

    /// Number of renders so far.
    pub fn renders(&self) -> usize {
        self.state().renders
    }

    /// Whether the server side holds an open session.
    pub fn is_session_open(&self) -> bool {
        self.state().session_open
    }

    /// Check if there are pending inputs to process.
    pub fn has_pending(&self) -> bool {
        !self.state().pending.is_empty()
    }

    /// Check invariants against App state.
    ///
    /// No-op unless a registry was installed.
    pub fn check_invariants(&self, app: &App<SimEnv>, context: &str) {
        let Some(registry) = &self.invariants else {
            return;
        };
        let mut state = self.state();
        let previous = std::mem::take(&mut state.entries);
        let snapshot = Snapshot::from_app(app, self.env.now()).with_previous(previous);
        state.entries = snapshot.entries();
        drop(state);

        registry.assert_all(&snapshot, context);
    }

    fn state(&self) -> MutexGuard<'_, SharedState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Driver for SimDriver {
    type Error = SimDriverError;
    type Env = SimEnv;

    async fn poll_event(&mut self, app: &mut App<SimEnv>) -> Result<Vec<AppAction>, Self::Error> {
        let Some(input) = self.state().pending.pop_front() else {
            return Ok(Vec::new());
        };

        let now = self.env.now();
        let (actions, context) = match input {
            SimInput::Event(event) => {
                let context = format!("after {event:?}");
                (app.handle(event, now), context)
            },
            SimInput::User(input) => (input(app, now), "after user input".to_string()),
        };
        self.check_invariants(app, &context);
        Ok(actions)
    }

    async fn dial(&mut self, url: &str) -> Result<(), Self::Error> {
        let now = self.env.now();
        let mut state = self.state();
        state.dials.push((now, url.to_string()));
        tracing::debug!(%url, policy = ?state.policy, at = ?now.elapsed(), "dial");

        match state.policy {
            DialPolicy::Accept => {
                state.session_open = true;
                state.pending.push_back(SimInput::Event(AppEvent::Connected));
            },
            DialPolicy::Refuse => {
                let reason = "connection refused".to_string();
                state.pending.push_back(SimInput::Event(AppEvent::ConnectFailed { reason }));
            },
            DialPolicy::Hold => state.held_dial = true,
        }
        Ok(())
    }

    async fn send(&mut self, intent: &ClientIntent) -> Result<(), Self::Error> {
        let mut state = self.state();
        if !state.session_open {
            return Err(SimDriverError(format!("{} sent without a session", intent.name())));
        }
        state.outgoing.push(intent.clone());
        Ok(())
    }

    async fn close(&mut self) {
        let mut state = self.state();
        state.session_open = false;
        state.held_dial = false;
        state.closes += 1;
    }

    fn now(&self) -> SimInstant {
        self.env.now()
    }

    fn render(&mut self, _app: &App<SimEnv>) -> Result<(), Self::Error> {
        self.state().renders += 1;
        Ok(())
    }

    fn notify(&mut self, message: &str) {
        self.state().notices.push(message.to_string());
    }

    fn stop(&mut self) {
        self.state().session_open = false;
    }
}

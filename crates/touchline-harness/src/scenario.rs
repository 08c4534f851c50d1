//! Scripted runs of the real runtime under virtual time.
//!
//! A [`Scenario`] wires an [`App`] and a [`SimDriver`] into a
//! [`Runtime`] with the standard invariants enabled, then lets a test play
//! user and server in turn. Every call processes inputs until the driver is
//! idle, so effects are observable as soon as the call returns.

use std::time::Duration;

use touchline_app::{App, AppAction, AppConfig, Driver, Runtime, ViewId};
use touchline_core::UserSession;
use touchline_proto::{DetailedMatch, Match, ServerEvent};

use crate::{
    SimEnv,
    invariants::InvariantRegistry,
    sim_driver::{SimDriver, SimDriverError},
    sim_env::SimInstant,
};

/// Runtime under test plus its scripted surroundings.
pub struct Scenario {
    runtime: Runtime<SimDriver>,
    quit: bool,
}

impl std::fmt::Debug for Scenario {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scenario").field("app", self.app()).field("quit", &self.quit).finish()
    }
}

impl Scenario {
    /// Scenario with the default configuration.
    pub fn new(seed: u64) -> Self {
        Self::with_config(seed, AppConfig::default())
    }

    /// Scenario with a custom configuration.
    pub fn with_config(seed: u64, config: AppConfig) -> Self {
        let env = SimEnv::with_seed(seed);
        let session = UserSession::generate(&env);
        let driver = SimDriver::new(env.clone()).with_invariants(InvariantRegistry::standard());
        let app = App::new(env, config, session);
        Self { runtime: Runtime::new(driver, app), quit: false }
    }

    /// App under test.
    pub fn app(&self) -> &App<SimEnv> {
        self.runtime.app()
    }

    /// Driver playing the server and the terminal.
    pub fn driver(&self) -> &SimDriver {
        self.runtime.driver()
    }

    /// Current virtual time.
    pub fn now(&self) -> SimInstant {
        self.runtime.driver().now()
    }

    /// Whether a quit was processed.
    pub fn has_quit(&self) -> bool {
        self.quit
    }

    /// Run a user interaction and everything it triggers.
    pub async fn act<F>(&mut self, input: F) -> Result<(), SimDriverError>
    where
        F: FnOnce(&mut App<SimEnv>, SimInstant) -> Vec<AppAction>,
    {
        let now = self.now();
        let actions = input(self.runtime.app_mut(), now);
        self.runtime.driver().check_invariants(self.runtime.app(), "after user action");
        self.quit |= self.runtime.process_actions(actions).await?;
        self.settle().await
    }

    /// Open a match view and settle.
    pub async fn open_match(&mut self, detail: DetailedMatch) -> Result<ViewId, SimDriverError> {
        self.open(|app| app.open_match_view(detail)).await
    }

    /// Open a board view and settle.
    pub async fn open_board(&mut self, matches: Vec<Match>) -> Result<ViewId, SimDriverError> {
        self.open(|app| app.open_board_view(matches)).await
    }

    /// Open a chat view and settle.
    pub async fn open_chat(&mut self, room_id: &str) -> Result<ViewId, SimDriverError> {
        self.open(|app| app.open_chat_view(room_id)).await
    }

    /// Deliver a server push and settle.
    pub async fn push(&mut self, event: ServerEvent) -> Result<(), SimDriverError> {
        self.runtime.driver().inject_push(event);
        self.settle().await
    }

    /// Advance virtual time by `duration` in one tick and settle.
    pub async fn advance(&mut self, duration: Duration) -> Result<(), SimDriverError> {
        self.runtime.driver().advance(duration);
        self.settle().await
    }

    /// Advance virtual time by `total`, ticking every `step`.
    pub async fn run_for(&mut self, total: Duration, step: Duration) -> Result<(), SimDriverError> {
        let until = self.now() + total;
        while self.now() < until {
            let remaining = until - self.now();
            self.advance(step.min(remaining)).await?;
        }
        Ok(())
    }

    /// Process pending inputs until the driver is idle.
    pub async fn settle(&mut self) -> Result<(), SimDriverError> {
        while self.runtime.driver().has_pending() {
            self.quit |= self.runtime.step().await?;
        }
        Ok(())
    }

    /// Give up the runtime, e.g. to call [`Runtime::run`] directly.
    pub fn into_runtime(self) -> Runtime<SimDriver> {
        self.runtime
    }

    async fn open<F>(&mut self, open: F) -> Result<ViewId, SimDriverError>
    where
        F: FnOnce(&mut App<SimEnv>) -> (ViewId, Vec<AppAction>),
    {
        let mut opened = None;
        self.act(|app, _| {
            let (id, actions) = open(app);
            opened = Some(id);
            actions
        })
        .await?;
        opened.ok_or_else(|| SimDriverError("view was not opened".to_string()))
    }
}

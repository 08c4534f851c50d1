//! Application context state machine.
//!
//! [`App`] is the explicit context object owning the single shared
//! connection, the room membership tracker, every open view and the local
//! identity. It consumes [`crate::AppEvent`]s and user calls and produces
//! [`crate::AppAction`]s for the runtime to execute.
//!
//! # Responsibilities
//!
//! - Connects lazily when the first view opens; tears down on `disconnect`.
//! - Acquires and releases room membership as views open and close.
//! - Routes every server push to the views observing its room.
//! - Emits intents only while connected. Chat messages issued while offline
//!   are queued and flushed after rooms are re-declared on connect;
//!   membership and typing intents are dropped. Queued messages for a room
//!   are discarded when its last chat view closes.

use std::{
    collections::{BTreeMap, VecDeque},
    time::Duration,
};

use touchline_core::{
    BoardFilter, ChatError, ChatRoom, ConnectionAction, ConnectionConfig, ConnectionManager,
    ConnectionState, ConnectionStatus, Environment, LocalTyping, MatchBoard, MatchSnapshot,
    RoomKey, RoomTracker, StatusBus, SubscriptionId, UserSession, chat::DEFAULT_TYPING_QUIET,
    validate_outbound,
};
use touchline_proto::{ClientIntent, DetailedMatch, Match};

use crate::{AppAction, AppEvent, View, ViewId};

/// Application configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    /// Shared connection settings
    pub connection: ConnectionConfig,
    /// Quiet period for typing indicators, local and remote
    pub typing_quiet: Duration,
    /// Most chat messages held while offline; the oldest is dropped first
    pub outbox_limit: usize,
}

/// Default bound on chat messages queued while offline.
pub const DEFAULT_OUTBOX_LIMIT: usize = 100;

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            connection: ConnectionConfig::default(),
            typing_quiet: DEFAULT_TYPING_QUIET,
            outbox_limit: DEFAULT_OUTBOX_LIMIT,
        }
    }
}

/// Application context.
///
/// Pure state machine; the environment only supplies randomness for redial
/// jitter. Time is passed to the operations that need it.
pub struct App<E: Environment> {
    env: E,
    config: AppConfig,
    session: UserSession,
    /// `None` until the first connect and after disconnect
    connection: Option<ConnectionManager<E::Instant>>,
    status: StatusBus,
    rooms: RoomTracker,
    views: BTreeMap<ViewId, View<E::Instant>>,
    next_view: u64,
    typing: LocalTyping<E::Instant>,
    /// Chat messages waiting for a connection
    outbox: VecDeque<ClientIntent>,
}

impl<E: Environment> std::fmt::Debug for App<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("session", &self.session)
            .field("connection", &self.connection)
            .field("rooms", &self.rooms)
            .field("views", &self.views.len())
            .field("outbox", &self.outbox.len())
            .finish_non_exhaustive()
    }
}

impl<E: Environment> App<E> {
    /// Create a context for `session`. Nothing connects until a view opens
    /// or [`connect`](Self::connect) is called.
    pub fn new(env: E, config: AppConfig, session: UserSession) -> Self {
        let typing =
            LocalTyping::new(session.user_id.clone(), session.username.clone(), config.typing_quiet);
        Self {
            env,
            config,
            session,
            connection: None,
            status: StatusBus::new(),
            rooms: RoomTracker::new(),
            views: BTreeMap::new(),
            next_view: 0,
            typing,
            outbox: VecDeque::new(),
        }
    }

    /// Process a transport event and return actions.
    pub fn handle(&mut self, event: AppEvent, now: E::Instant) -> Vec<AppAction> {
        let mut actions = Vec::new();

        match event {
            AppEvent::Tick => {
                if let Some(conn) = self.connection.as_mut() {
                    let redials = conn.tick(now);
                    self.apply_connection(redials, &mut actions);
                }
                if let Some(stop) = self.typing.tick(now) {
                    self.emit(stop, &mut actions);
                }
                let mut changed = false;
                for view in self.views.values_mut() {
                    changed |= view.tick(now);
                }
                if changed {
                    push_render(&mut actions);
                }
            },
            AppEvent::Connected => {
                let Some(conn) = self.connection.as_mut() else {
                    tracing::debug!("connected without a connection handle");
                    return actions;
                };
                let was_connected = conn.state() == ConnectionState::Connected;
                let transitions = conn.on_open();
                let now_connected = conn.state() == ConnectionState::Connected;
                self.apply_connection(transitions, &mut actions);

                if !was_connected && now_connected {
                    self.on_established(&mut actions);
                }
            },
            AppEvent::ConnectFailed { reason } => {
                let jitter = self.env.random_u64();
                if let Some(conn) = self.connection.as_mut() {
                    let transitions = conn.on_connect_error(reason, now, jitter);
                    self.apply_connection(transitions, &mut actions);
                }
            },
            AppEvent::Closed { reason } => {
                let jitter = self.env.random_u64();
                if let Some(conn) = self.connection.as_mut() {
                    let transitions = conn.on_closed(reason, now, jitter);
                    self.apply_connection(transitions, &mut actions);
                }
                self.typing.cancel();
            },
            AppEvent::ServerDisconnect => {
                if let Some(conn) = self.connection.as_mut() {
                    let transitions = conn.on_server_disconnect();
                    self.apply_connection(transitions, &mut actions);
                }
                self.typing.cancel();
            },
            AppEvent::Received(event) => {
                let mut changed = false;
                for view in self.views.values_mut() {
                    changed |= view.apply(&event, now);
                }
                if changed {
                    push_render(&mut actions);
                } else {
                    tracing::debug!(event = event.name(), room = event.room(), "no view applied push");
                }
            },
        }

        actions
    }

    /// Connect the shared connection, creating it on first use.
    ///
    /// No-op while connected or connecting.
    pub fn connect(&mut self) -> Vec<AppAction> {
        let conn = self
            .connection
            .get_or_insert_with(|| ConnectionManager::new(self.config.connection.clone()));
        let transitions = conn.connect();

        let mut actions = Vec::new();
        self.apply_connection(transitions, &mut actions);
        actions
    }

    /// Tear down the shared connection and discard its handle.
    ///
    /// Queued chat messages are dropped. Safe when never connected.
    pub fn disconnect(&mut self) -> Vec<AppAction> {
        let mut actions = Vec::new();
        if let Some(mut conn) = self.connection.take() {
            let transitions = conn.disconnect();
            self.apply_connection(transitions, &mut actions);
        }
        if !self.outbox.is_empty() {
            tracing::debug!(dropped = self.outbox.len(), "dropping queued messages");
            self.outbox.clear();
        }
        self.typing.cancel();
        actions
    }

    /// Current connection handle. `None` if never connected or torn down.
    pub fn connection(&self) -> Option<&ConnectionManager<E::Instant>> {
        self.connection.as_ref()
    }

    /// Last published connection status.
    pub fn status(&self) -> &ConnectionStatus {
        self.status.current()
    }

    /// Register a status observer. It runs immediately and on every change.
    pub fn on_status_change<F>(&mut self, observer: F) -> SubscriptionId
    where
        F: FnMut(&ConnectionStatus) + Send + 'static,
    {
        self.status.subscribe(observer)
    }

    /// Remove a status observer. Idempotent.
    pub fn remove_status_observer(&mut self, id: SubscriptionId) -> bool {
        self.status.unsubscribe(id)
    }

    /// Open a match detail view from the initial fetch.
    pub fn open_match_view(&mut self, detail: DetailedMatch) -> (ViewId, Vec<AppAction>) {
        let mut actions = Vec::new();
        if let Some(intent) = self.rooms.subscribe(&detail.summary.id) {
            self.emit(intent, &mut actions);
        }

        let id = self.insert_view(View::Match(MatchSnapshot::new(detail)));
        actions.extend(self.connect());
        push_render(&mut actions);
        (id, actions)
    }

    /// Open a match board view over the fetched listing.
    ///
    /// Subscribes to the feed of every listed match.
    pub fn open_board_view(&mut self, matches: Vec<Match>) -> (ViewId, Vec<AppAction>) {
        let mut actions = Vec::new();
        for fixture in &matches {
            if let Some(intent) = self.rooms.subscribe(&fixture.id) {
                self.emit(intent, &mut actions);
            }
        }

        let id = self.insert_view(View::Board(MatchBoard::new(matches)));
        actions.extend(self.connect());
        push_render(&mut actions);
        (id, actions)
    }

    /// Open a chat view on `room_id` under the local identity.
    pub fn open_chat_view(&mut self, room_id: &str) -> (ViewId, Vec<AppAction>) {
        let mut actions = Vec::new();
        let join = self.rooms.join(room_id, &self.session.user_id, &self.session.username);
        if let Some(intent) = join {
            self.emit(intent, &mut actions);
        }

        let room = ChatRoom::new(room_id, self.session.user_id.clone(), self.config.typing_quiet);
        let id = self.insert_view(View::Chat(room));
        actions.extend(self.connect());
        push_render(&mut actions);
        (id, actions)
    }

    /// Close a view and release its membership.
    ///
    /// Other views of the same room keep receiving updates. Unknown ids are
    /// ignored.
    pub fn close_view(&mut self, id: ViewId) -> Vec<AppAction> {
        let Some(view) = self.views.remove(&id) else {
            return Vec::new();
        };
        tracing::debug!(view = %id, kind = view.kind(), "closing view");

        let mut actions = Vec::new();
        match &view {
            View::Match(snapshot) => {
                if let Some(intent) = self.rooms.unsubscribe(snapshot.id()) {
                    self.emit(intent, &mut actions);
                }
            },
            View::Board(board) => {
                for match_id in board.match_ids() {
                    if let Some(intent) = self.rooms.unsubscribe(match_id) {
                        self.emit(intent, &mut actions);
                    }
                }
            },
            View::Chat(room) => {
                if self.typing.active_room() == Some(room.room_id()) {
                    let stop = self.typing.stop(room.room_id());
                    self.emit(stop, &mut actions);
                }
                if let Some(intent) = self.rooms.leave(room.room_id(), &self.session.user_id) {
                    self.emit(intent, &mut actions);
                }
                if !self.rooms.contains(&RoomKey::Chat(room.room_id().to_string())) {
                    self.discard_queued(room.room_id());
                }
            },
        }
        push_render(&mut actions);
        actions
    }

    /// A keystroke in a chat view's input.
    pub fn typing_input(&mut self, id: ViewId, now: E::Instant) -> Vec<AppAction> {
        let Some(room_id) = self.chat_room_id(id) else {
            return Vec::new();
        };

        let mut actions = Vec::new();
        for intent in self.typing.keystroke(&room_id, now) {
            self.emit(intent, &mut actions);
        }
        actions
    }

    /// Send a chat message from a chat view.
    ///
    /// Invalid text is rejected with a [`AppAction::Notice`] and changes
    /// nothing. Accepted text is sent verbatim and stops the typing
    /// indicator.
    pub fn send_message(&mut self, id: ViewId, text: &str) -> Vec<AppAction> {
        let Some(room_id) = self.chat_room_id(id) else {
            return vec![AppAction::Notice { message: ChatError::NoChatView.to_string() }];
        };
        if let Err(err) = validate_outbound(text) {
            tracing::debug!(room_id = %room_id, %err, "rejected outbound message");
            return vec![AppAction::Notice { message: err.to_string() }];
        }

        let mut actions = Vec::new();
        let message = ClientIntent::SendMessage {
            room_id: room_id.clone(),
            user_id: self.session.user_id.clone(),
            username: self.session.username.clone(),
            text: text.to_string(),
        };
        self.emit(message, &mut actions);
        let stop = self.typing.stop(&room_id);
        self.emit(stop, &mut actions);
        actions
    }

    /// Change the filter of a board view.
    pub fn set_board_filter(&mut self, id: ViewId, filter: BoardFilter) -> Vec<AppAction> {
        let Some(View::Board(board)) = self.views.get_mut(&id) else {
            return Vec::new();
        };
        if board.set_filter(filter) { vec![AppAction::Render] } else { Vec::new() }
    }

    /// Change the local display name.
    ///
    /// Applies to later joins, messages and typing signals; rooms already
    /// joined keep the identity they announced.
    pub fn set_username(&mut self, username: impl Into<String>) -> Vec<AppAction> {
        let username = username.into();
        self.typing.set_username(username.clone());
        self.session.username = username;
        vec![AppAction::Render]
    }

    /// Tear everything down and quit.
    pub fn quit(&mut self) -> Vec<AppAction> {
        let mut actions = self.disconnect();
        actions.push(AppAction::Quit);
        actions
    }

    /// Local identity.
    pub fn session(&self) -> &UserSession {
        &self.session
    }

    /// Configuration in use.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// State of an open view.
    pub fn view(&self, id: ViewId) -> Option<&View<E::Instant>> {
        self.views.get(&id)
    }

    /// Every open view in opening order.
    pub fn views(&self) -> impl Iterator<Item = (ViewId, &View<E::Instant>)> {
        self.views.iter().map(|(id, view)| (*id, view))
    }

    /// Room membership tracker.
    pub fn rooms(&self) -> &RoomTracker {
        &self.rooms
    }

    /// Local typing countdown.
    pub fn local_typing(&self) -> &LocalTyping<E::Instant> {
        &self.typing
    }

    /// Chat messages waiting for a connection.
    pub fn outbox(&self) -> impl Iterator<Item = &ClientIntent> {
        self.outbox.iter()
    }

    fn insert_view(&mut self, view: View<E::Instant>) -> ViewId {
        let id = ViewId(self.next_view);
        self.next_view += 1;
        tracing::debug!(view = %id, kind = view.kind(), "opened view");
        self.views.insert(id, view);
        id
    }

    fn chat_room_id(&self, id: ViewId) -> Option<String> {
        self.views.get(&id)?.as_chat().map(|room| room.room_id().to_string())
    }

    fn is_connected(&self) -> bool {
        self.connection.as_ref().is_some_and(|conn| conn.state() == ConnectionState::Connected)
    }

    /// Emit now if connected; otherwise queue chat messages and drop the rest.
    fn emit(&mut self, intent: ClientIntent, actions: &mut Vec<AppAction>) {
        if self.is_connected() {
            actions.push(AppAction::Emit(intent));
        } else if matches!(intent, ClientIntent::SendMessage { .. }) {
            tracing::debug!(room = intent.room(), "queueing message until connected");
            self.outbox.push_back(intent);
            while self.outbox.len() > self.config.outbox_limit {
                if let Some(dropped) = self.outbox.pop_front() {
                    tracing::warn!(room = dropped.room(), "outbox full, dropping oldest message");
                }
            }
        } else {
            tracing::debug!(intent = intent.name(), room = intent.room(), "dropping intent while offline");
        }
    }

    /// Drop messages queued for a room nobody observes any more.
    fn discard_queued(&mut self, room_id: &str) {
        let before = self.outbox.len();
        self.outbox.retain(|intent| intent.room() != room_id);
        if self.outbox.len() < before {
            tracing::debug!(room_id, dropped = before - self.outbox.len(), "discarding queued messages");
        }
    }

    /// Re-declare membership, then flush queued messages.
    fn on_established(&mut self, actions: &mut Vec<AppAction>) {
        let declarations = self.rooms.redeclare();
        tracing::info!(rooms = declarations.len(), queued = self.outbox.len(), "session established");

        actions.extend(declarations.into_iter().map(AppAction::Emit));
        actions.extend(self.outbox.drain(..).map(AppAction::Emit));
    }

    fn apply_connection(&mut self, transitions: Vec<ConnectionAction>, actions: &mut Vec<AppAction>) {
        for transition in transitions {
            match transition {
                ConnectionAction::Dial { url } => actions.push(AppAction::Dial { url }),
                ConnectionAction::Close => actions.push(AppAction::Close),
                ConnectionAction::StatusChanged(status) => {
                    self.status.publish(status);
                    push_render(actions);
                },
            }
        }
    }
}

fn push_render(actions: &mut Vec<AppAction>) {
    if !actions.contains(&AppAction::Render) {
        actions.push(AppAction::Render);
    }
}

//! Observable state snapshots for invariant checking.
//!
//! Snapshots capture the observable state of an [`App`] at a point in time.
//! Invariants operate on snapshots rather than live state so every check
//! sees one consistent picture.

use std::collections::BTreeMap;

use touchline_app::{App, View, ViewId};
use touchline_core::{ConnectionState, ConnectionStatus, Environment, RoomKey};
use touchline_proto::ClientIntent;

/// Snapshot of one client context.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    /// Local user id.
    pub local_user: String,
    /// Connection state. `None` when no connection handle exists.
    pub state: Option<ConnectionState>,
    /// Status last published to observers.
    pub published: ConnectionStatus,
    /// Status derived from the connection handle right now.
    pub derived: ConnectionStatus,
    /// Consumer count per tracked room.
    pub membership: BTreeMap<RoomKey, usize>,
    /// Every open view.
    pub views: BTreeMap<ViewId, ViewSnapshot>,
    /// Intents waiting for a connection.
    pub outbox: Vec<ClientIntent>,
    /// Entry ids per view at the previous check, for append-only checks.
    pub previous: BTreeMap<ViewId, Vec<String>>,
}

impl Snapshot {
    /// Capture `app` at `now`.
    pub fn from_app<E: Environment>(app: &App<E>, now: E::Instant) -> Self {
        let state = app.connection().map(touchline_core::ConnectionManager::state);
        let derived = app.connection().map(|conn| conn.status()).unwrap_or_default();
        let membership = app
            .rooms()
            .rooms()
            .map(|key| (key.clone(), app.rooms().consumers(key)))
            .collect();
        let views = app.views().map(|(id, view)| (id, ViewSnapshot::new(view, now))).collect();

        Self {
            local_user: app.session().user_id.clone(),
            state,
            published: app.status().clone(),
            derived,
            membership,
            views,
            outbox: app.outbox().cloned().collect(),
            previous: BTreeMap::new(),
        }
    }

    /// Attach the entry ids observed at the previous check.
    #[must_use]
    pub fn with_previous(mut self, previous: BTreeMap<ViewId, Vec<String>>) -> Self {
        self.previous = previous;
        self
    }

    /// Entry ids per view, to be passed to the next snapshot.
    pub fn entries(&self) -> BTreeMap<ViewId, Vec<String>> {
        self.views.iter().map(|(id, view)| (*id, view.entries.clone())).collect()
    }

    /// Whether the connection is established.
    pub fn is_connected(&self) -> bool {
        self.state == Some(ConnectionState::Connected)
    }
}

/// Snapshot of one open view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewSnapshot {
    /// `match`, `board` or `chat`
    pub kind: &'static str,
    /// Rooms this view holds membership of, one entry per hold.
    pub rooms: Vec<RoomKey>,
    /// Timeline event ids (match) or message ids (chat) in arrival order.
    pub entries: Vec<String>,
    /// Remote users shown as typing (chat only).
    pub typing: Vec<String>,
}

impl ViewSnapshot {
    /// Capture `view` at `now`.
    pub fn new<I: touchline_core::Timestamp>(view: &View<I>, now: I) -> Self {
        match view {
            View::Match(snapshot) => Self {
                kind: view.kind(),
                rooms: vec![RoomKey::Match(snapshot.id().to_string())],
                entries: snapshot.events().iter().map(|event| event.id.clone()).collect(),
                typing: Vec::new(),
            },
            View::Board(board) => Self {
                kind: view.kind(),
                rooms: board.match_ids().map(|id| RoomKey::Match(id.to_string())).collect(),
                entries: Vec::new(),
                typing: Vec::new(),
            },
            View::Chat(room) => Self {
                kind: view.kind(),
                rooms: vec![RoomKey::Chat(room.room_id().to_string())],
                entries: room.messages().iter().map(|message| message.id.clone()).collect(),
                typing: room.typing().typing_users(now).map(|(user, _)| user.to_string()).collect(),
            },
        }
    }
}

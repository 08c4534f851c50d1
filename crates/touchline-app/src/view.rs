//! Views: consumers of reducer output opened through the [`crate::App`].

use std::fmt;

use touchline_core::{ChatRoom, MatchBoard, MatchSnapshot, Timestamp};
use touchline_proto::ServerEvent;

/// Handle of an open view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ViewId(pub(crate) u64);

impl ViewId {
    /// Raw numeric id.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ViewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// State held by one open view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum View<I: Timestamp> {
    /// Match detail
    Match(MatchSnapshot),
    /// Match listing
    Board(MatchBoard),
    /// Chat room
    Chat(ChatRoom<I>),
}

impl<I: Timestamp> View<I> {
    /// Apply a server push. Returns `true` if the view changed.
    pub fn apply(&mut self, event: &ServerEvent, now: I) -> bool {
        match self {
            Self::Match(snapshot) => snapshot.apply(event),
            Self::Board(board) => board.apply(event),
            Self::Chat(room) => room.apply(event, now),
        }
    }

    /// Expire time-bound state. Returns `true` if the view changed.
    pub fn tick(&mut self, now: I) -> bool {
        match self {
            Self::Chat(room) => room.tick(now),
            Self::Match(_) | Self::Board(_) => false,
        }
    }

    /// Short kind name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Match(_) => "match",
            Self::Board(_) => "board",
            Self::Chat(_) => "chat",
        }
    }

    /// Chat room state, if this is a chat view.
    pub fn as_chat(&self) -> Option<&ChatRoom<I>> {
        match self {
            Self::Chat(room) => Some(room),
            _ => None,
        }
    }

    /// Match state, if this is a match view.
    pub fn as_match(&self) -> Option<&MatchSnapshot> {
        match self {
            Self::Match(snapshot) => Some(snapshot),
            _ => None,
        }
    }

    /// Board state, if this is a board view.
    pub fn as_board(&self) -> Option<&MatchBoard> {
        match self {
            Self::Board(board) => Some(board),
            _ => None,
        }
    }
}

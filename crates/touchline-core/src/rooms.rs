//! Reference-counted room membership.
//!
//! Every view that needs a room acquires it; the tracker emits the
//! subscribe/join intent only for the first consumer and the
//! unsubscribe/leave intent only when the last one releases. Releasing a
//! room that is not tracked is a no-op, so release is idempotent from the
//! server's point of view.

use std::collections::BTreeMap;

use touchline_proto::{ClientIntent, MatchId, RoomId};

/// A logical room multiplexed over the shared connection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RoomKey {
    /// Broadcast-only score feed of a match
    Match(MatchId),
    /// Chat room
    Chat(RoomId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Entry {
    consumers: usize,
    /// Intent that declared the room, replayed on reconnect
    declaration: ClientIntent,
}

/// Membership tracker keyed by room.
#[derive(Debug, Clone, Default)]
pub struct RoomTracker {
    rooms: BTreeMap<RoomKey, Entry>,
}

impl RoomTracker {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire a match feed. Emits `subscribe_match` for the first consumer.
    pub fn subscribe(&mut self, match_id: &str) -> Option<ClientIntent> {
        let declaration = ClientIntent::SubscribeMatch { match_id: match_id.to_string() };
        self.acquire(RoomKey::Match(match_id.to_string()), declaration)
    }

    /// Release a match feed. Emits `unsubscribe_match` for the last consumer.
    pub fn unsubscribe(&mut self, match_id: &str) -> Option<ClientIntent> {
        let last = self.release(&RoomKey::Match(match_id.to_string()));
        last.then(|| ClientIntent::UnsubscribeMatch { match_id: match_id.to_string() })
    }

    /// Acquire a chat room. Emits `join_chat` for the first consumer.
    ///
    /// The identity of the first join is the one announced to the server and
    /// replayed on reconnect.
    pub fn join(&mut self, room_id: &str, user_id: &str, username: &str) -> Option<ClientIntent> {
        let declaration = ClientIntent::JoinChat {
            room_id: room_id.to_string(),
            user_id: user_id.to_string(),
            username: username.to_string(),
        };
        self.acquire(RoomKey::Chat(room_id.to_string()), declaration)
    }

    /// Release a chat room. Emits `leave_chat` for the last consumer.
    pub fn leave(&mut self, room_id: &str, user_id: &str) -> Option<ClientIntent> {
        let last = self.release(&RoomKey::Chat(room_id.to_string()));
        last.then(|| ClientIntent::LeaveChat {
            room_id: room_id.to_string(),
            user_id: user_id.to_string(),
        })
    }

    /// Subscribe/join intents for every active room, in key order.
    ///
    /// The server forgets membership when a transport session ends, so this
    /// runs each time the connection is (re)established.
    pub fn redeclare(&self) -> Vec<ClientIntent> {
        self.rooms.values().map(|entry| entry.declaration.clone()).collect()
    }

    /// Number of consumers holding `key`. Zero if untracked.
    pub fn consumers(&self, key: &RoomKey) -> usize {
        self.rooms.get(key).map_or(0, |entry| entry.consumers)
    }

    /// Whether `key` has at least one consumer.
    pub fn contains(&self, key: &RoomKey) -> bool {
        self.rooms.contains_key(key)
    }

    /// Active rooms in key order.
    pub fn rooms(&self) -> impl Iterator<Item = &RoomKey> {
        self.rooms.keys()
    }

    /// Number of active rooms.
    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    /// Whether no room is active.
    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    fn acquire(&mut self, key: RoomKey, declaration: ClientIntent) -> Option<ClientIntent> {
        let entry = self.rooms.entry(key).or_insert(Entry { consumers: 0, declaration });
        entry.consumers += 1;
        (entry.consumers == 1).then(|| entry.declaration.clone())
    }

    fn release(&mut self, key: &RoomKey) -> bool {
        let Some(entry) = self.rooms.get_mut(key) else {
            tracing::debug!(?key, "release of untracked room ignored");
            return false;
        };

        entry.consumers -= 1;
        if entry.consumers == 0 {
            self.rooms.remove(key);
            true
        } else {
            false
        }
    }
}

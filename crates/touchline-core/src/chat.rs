//! Chat reducer, typing indicators and outbound validation.
//!
//! [`ChatRoom`] holds the message list and remote typing set of one room.
//! [`LocalTyping`] runs the single countdown of the local user: every
//! keystroke restarts it, and when it elapses a `typing_stop` goes out.

use std::{
    collections::{BTreeMap, HashSet},
    time::Duration,
};

use touchline_proto::{ChatMessage, ClientIntent, RoomId, ServerEvent, TypingIndicator, UserId};

use crate::{env::Timestamp, error::ChatError};

/// Longest accepted message, in characters.
pub const MAX_MESSAGE_CHARS: usize = 500;

/// Silence after the last keystroke before typing is considered over.
pub const DEFAULT_TYPING_QUIET: Duration = Duration::from_millis(3000);

/// Check outbound text before it is sent.
///
/// Text must contain something other than whitespace and be at most
/// [`MAX_MESSAGE_CHARS`] characters long. Length counts the text as typed,
/// surrounding whitespace included.
pub fn validate_outbound(text: &str) -> Result<(), ChatError> {
    if text.trim().is_empty() {
        return Err(ChatError::Empty);
    }
    let len = text.chars().count();
    if len > MAX_MESSAGE_CHARS {
        return Err(ChatError::TooLong { len, max: MAX_MESSAGE_CHARS });
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Typist<I> {
    username: String,
    expires_at: I,
}

/// Remote users currently typing in one room.
///
/// An entry lives until a stop signal or until the quiet period passes
/// without a refreshing start signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypingState<I: Timestamp> {
    typists: BTreeMap<UserId, Typist<I>>,
    quiet: Duration,
}

impl<I: Timestamp> TypingState<I> {
    /// Create an empty typing set with the given quiet period.
    pub fn new(quiet: Duration) -> Self {
        Self { typists: BTreeMap::new(), quiet }
    }

    /// Apply a start/stop signal. The caller filters out the local user.
    pub fn apply(&mut self, user_id: &str, username: &str, is_typing: bool, now: I) -> bool {
        if is_typing {
            let typist = Typist { username: username.to_string(), expires_at: now + self.quiet };
            self.typists.insert(user_id.to_string(), typist);
            true
        } else {
            self.typists.remove(user_id).is_some()
        }
    }

    /// Drop entries whose quiet period has passed. Returns `true` if any did.
    pub fn expire(&mut self, now: I) -> bool {
        let before = self.typists.len();
        self.typists.retain(|_, typist| typist.expires_at > now);
        self.typists.len() != before
    }

    /// Whether `user_id` counts as typing at `now`.
    pub fn is_typing(&self, user_id: &str, now: I) -> bool {
        self.typists.get(user_id).is_some_and(|typist| typist.expires_at > now)
    }

    /// `(user_id, username)` of everyone typing at `now`, in user id order.
    pub fn typing_users(&self, now: I) -> impl Iterator<Item = (&str, &str)> {
        self.typists
            .iter()
            .filter(move |(_, typist)| typist.expires_at > now)
            .map(|(id, typist)| (id.as_str(), typist.username.as_str()))
    }

    /// Whether an entry for `user_id` exists, expired or not.
    pub fn contains(&self, user_id: &str) -> bool {
        self.typists.contains_key(user_id)
    }

    /// Number of entries, expired or not.
    pub fn len(&self) -> usize {
        self.typists.len()
    }

    /// Whether there are no entries.
    pub fn is_empty(&self) -> bool {
        self.typists.is_empty()
    }
}

/// Message list and typing set of one observed chat room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRoom<I: Timestamp> {
    room_id: RoomId,
    local_user: UserId,
    messages: Vec<ChatMessage>,
    seen: HashSet<String>,
    typing: TypingState<I>,
}

impl<I: Timestamp> ChatRoom<I> {
    /// Observe `room_id` as `local_user`.
    pub fn new(room_id: impl Into<RoomId>, local_user: impl Into<UserId>, quiet: Duration) -> Self {
        Self {
            room_id: room_id.into(),
            local_user: local_user.into(),
            messages: Vec::new(),
            seen: HashSet::new(),
            typing: TypingState::new(quiet),
        }
    }

    /// Observed room id.
    pub fn room_id(&self) -> &str {
        &self.room_id
    }

    /// Messages in arrival order.
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Remote typing set.
    pub fn typing(&self) -> &TypingState<I> {
        &self.typing
    }

    /// Apply any server push. Returns `true` if the room changed.
    pub fn apply(&mut self, event: &ServerEvent, now: I) -> bool {
        match event {
            ServerEvent::ChatMessage(message) => self.receive_message(message),
            ServerEvent::TypingIndicator(indicator) => {
                self.receive_typing_indicator(indicator, now)
            },
            _ => false,
        }
    }

    /// Append a message for this room. Redelivered ids are ignored.
    pub fn receive_message(&mut self, message: &ChatMessage) -> bool {
        if message.room_id != self.room_id {
            return false;
        }
        if !self.seen.insert(message.id.clone()) {
            tracing::debug!(room_id = %self.room_id, message_id = %message.id, "duplicate message");
            return false;
        }
        self.messages.push(message.clone());
        true
    }

    /// Set or clear a remote user's typing flag. The local user is ignored.
    pub fn receive_typing_indicator(&mut self, indicator: &TypingIndicator, now: I) -> bool {
        if indicator.room_id != self.room_id || indicator.user_id == self.local_user {
            return false;
        }
        self.typing.apply(&indicator.user_id, &indicator.username, indicator.is_typing, now)
    }

    /// Expire stale typing entries. Returns `true` if any expired.
    pub fn tick(&mut self, now: I) -> bool {
        self.typing.expire(now)
    }
}

/// Countdown of the local user's typing indicator.
///
/// Only one countdown is live at a time. A keystroke in a different room
/// stops the previous room's indicator first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalTyping<I: Timestamp> {
    user_id: UserId,
    username: String,
    quiet: Duration,
    /// Room being typed in and when its countdown elapses
    active: Option<(RoomId, I)>,
}

impl<I: Timestamp> LocalTyping<I> {
    /// Countdown for the local identity.
    pub fn new(user_id: impl Into<UserId>, username: impl Into<String>, quiet: Duration) -> Self {
        Self { user_id: user_id.into(), username: username.into(), quiet, active: None }
    }

    /// Room with a live countdown, if any.
    pub fn active_room(&self) -> Option<&str> {
        self.active.as_ref().map(|(room, _)| room.as_str())
    }

    /// When the live countdown elapses, if any.
    pub fn deadline(&self) -> Option<I> {
        self.active.as_ref().map(|(_, at)| *at)
    }

    /// Change the name announced in later `typing_start` intents.
    pub fn set_username(&mut self, username: impl Into<String>) {
        self.username = username.into();
    }

    /// A keystroke in `room_id`. Emits `typing_start` every time.
    pub fn keystroke(&mut self, room_id: &str, now: I) -> Vec<ClientIntent> {
        let mut intents = Vec::with_capacity(2);
        if let Some((previous, _)) = self.active.take_if(|(previous, _)| previous != room_id) {
            intents.push(self.stop_intent(previous));
        }

        intents.push(ClientIntent::TypingStart {
            room_id: room_id.to_string(),
            user_id: self.user_id.clone(),
            username: self.username.clone(),
        });
        self.active = Some((room_id.to_string(), now + self.quiet));
        intents
    }

    /// Stop typing in `room_id` right away, as on message send.
    ///
    /// Always emits `typing_stop`; cancels the countdown if it was for this
    /// room.
    pub fn stop(&mut self, room_id: &str) -> ClientIntent {
        self.active.take_if(|(active, _)| active == room_id);
        self.stop_intent(room_id.to_string())
    }

    /// Emit `typing_stop` once the countdown has elapsed.
    pub fn tick(&mut self, now: I) -> Option<ClientIntent> {
        let (room_id, _) = self.active.take_if(|(_, deadline)| *deadline <= now)?;
        Some(self.stop_intent(room_id))
    }

    /// Drop the countdown without emitting anything.
    pub fn cancel(&mut self) {
        self.active = None;
    }

    fn stop_intent(&self, room_id: RoomId) -> ClientIntent {
        ClientIntent::TypingStop { room_id, user_id: self.user_id.clone() }
    }
}

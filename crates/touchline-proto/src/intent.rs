//! Outbound client intents.
//!
//! Intents are fire-and-forget: the server acknowledges none of them.

use serde_json::{Value, json};

use crate::{
    SocketPacket,
    errors::{ProtocolError, Result},
    model::{MatchId, RoomId, UserId},
};

/// Outbound event names.
pub mod names {
    /// Start receiving a match feed
    pub const SUBSCRIBE_MATCH: &str = "subscribe_match";
    /// Stop receiving a match feed
    pub const UNSUBSCRIBE_MATCH: &str = "unsubscribe_match";
    /// Enter a chat room
    pub const JOIN_CHAT: &str = "join_chat";
    /// Leave a chat room
    pub const LEAVE_CHAT: &str = "leave_chat";
    /// Post a chat line
    pub const SEND_MESSAGE: &str = "send_message";
    /// Local user started typing
    pub const TYPING_START: &str = "typing_start";
    /// Local user stopped typing
    pub const TYPING_STOP: &str = "typing_stop";
}

/// An intent emitted by the client over the shared connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientIntent {
    /// Declare interest in a match feed.
    SubscribeMatch {
        /// Match to follow
        match_id: MatchId,
    },
    /// Withdraw interest in a match feed.
    UnsubscribeMatch {
        /// Match to stop following
        match_id: MatchId,
    },
    /// Join a chat room under the local identity.
    JoinChat {
        /// Room to join
        room_id: RoomId,
        /// Local user id
        user_id: UserId,
        /// Local display name
        username: String,
    },
    /// Leave a chat room.
    LeaveChat {
        /// Room to leave
        room_id: RoomId,
        /// Local user id
        user_id: UserId,
    },
    /// Post a chat line.
    SendMessage {
        /// Target room
        room_id: RoomId,
        /// Local user id
        user_id: UserId,
        /// Local display name
        username: String,
        /// Validated message body
        text: String,
    },
    /// Announce that the local user is typing.
    TypingStart {
        /// Room being typed in
        room_id: RoomId,
        /// Local user id
        user_id: UserId,
        /// Local display name
        username: String,
    },
    /// Announce that the local user stopped typing.
    TypingStop {
        /// Room typed in
        room_id: RoomId,
        /// Local user id
        user_id: UserId,
    },
}

impl ClientIntent {
    /// Wire name of this intent.
    pub fn name(&self) -> &'static str {
        match self {
            Self::SubscribeMatch { .. } => names::SUBSCRIBE_MATCH,
            Self::UnsubscribeMatch { .. } => names::UNSUBSCRIBE_MATCH,
            Self::JoinChat { .. } => names::JOIN_CHAT,
            Self::LeaveChat { .. } => names::LEAVE_CHAT,
            Self::SendMessage { .. } => names::SEND_MESSAGE,
            Self::TypingStart { .. } => names::TYPING_START,
            Self::TypingStop { .. } => names::TYPING_STOP,
        }
    }

    /// Room the intent targets.
    pub fn room(&self) -> &str {
        match self {
            Self::SubscribeMatch { match_id } | Self::UnsubscribeMatch { match_id } => match_id,
            Self::JoinChat { room_id, .. }
            | Self::LeaveChat { room_id, .. }
            | Self::SendMessage { room_id, .. }
            | Self::TypingStart { room_id, .. }
            | Self::TypingStop { room_id, .. } => room_id,
        }
    }

    /// JSON payload as sent on the wire.
    pub fn payload(&self) -> Value {
        match self {
            Self::SubscribeMatch { match_id } | Self::UnsubscribeMatch { match_id } => {
                json!({ "matchId": match_id })
            },
            Self::JoinChat { room_id, user_id, username }
            | Self::TypingStart { room_id, user_id, username } => {
                json!({ "matchId": room_id, "userId": user_id, "username": username })
            },
            Self::LeaveChat { room_id, user_id } | Self::TypingStop { room_id, user_id } => {
                json!({ "matchId": room_id, "userId": user_id })
            },
            Self::SendMessage { room_id, user_id, username, text } => json!({
                "matchId": room_id,
                "userId": user_id,
                "username": username,
                "message": text,
            }),
        }
    }

    /// Encode as a Socket.IO event packet.
    pub fn to_packet(&self) -> SocketPacket {
        SocketPacket::event(self.name(), self.payload())
    }

    /// Decode an intent, as a server would. Unknown names yield `Ok(None)`.
    pub fn decode(name: &str, payload: &Value) -> Result<Option<Self>> {
        let field = |key: &str| -> Result<String> {
            payload
                .get(key)
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| ProtocolError::payload(name, format!("missing field `{key}`")))
        };

        let intent = match name {
            names::SUBSCRIBE_MATCH => Self::SubscribeMatch { match_id: field("matchId")? },
            names::UNSUBSCRIBE_MATCH => Self::UnsubscribeMatch { match_id: field("matchId")? },
            names::JOIN_CHAT => Self::JoinChat {
                room_id: field("matchId")?,
                user_id: field("userId")?,
                username: field("username")?,
            },
            names::LEAVE_CHAT => {
                Self::LeaveChat { room_id: field("matchId")?, user_id: field("userId")? }
            },
            names::SEND_MESSAGE => Self::SendMessage {
                room_id: field("matchId")?,
                user_id: field("userId")?,
                username: field("username")?,
                text: field("message")?,
            },
            names::TYPING_START => Self::TypingStart {
                room_id: field("matchId")?,
                user_id: field("userId")?,
                username: field("username")?,
            },
            names::TYPING_STOP => {
                Self::TypingStop { room_id: field("matchId")?, user_id: field("userId")? }
            },
            _ => return Ok(None),
        };
        Ok(Some(intent))
    }

    /// Decode a Socket.IO packet. Non-event packets yield `Ok(None)`.
    pub fn from_packet(packet: &SocketPacket) -> Result<Option<Self>> {
        match packet {
            SocketPacket::Event { name, args, .. } => {
                Self::decode(name, args.first().unwrap_or(&Value::Null))
            },
            _ => Ok(None),
        }
    }

    /// Membership declarations are replayed on reconnect instead of queued.
    pub fn is_membership(&self) -> bool {
        matches!(
            self,
            Self::SubscribeMatch { .. }
                | Self::UnsubscribeMatch { .. }
                | Self::JoinChat { .. }
                | Self::LeaveChat { .. }
        )
    }
}

//! Typed server-pushed events.
//!
//! Only the events the client state machines consume are modelled. Anything
//! else arriving on the default namespace decodes to `Ok(None)` and is
//! skipped by the caller.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    SocketPacket,
    errors::{ProtocolError, Result},
    model::{ChatMessage, MatchEvent, MatchId, MatchStatistics, MatchStatus, TypingIndicator},
};

/// Inbound event names.
pub mod names {
    /// Score changed
    pub const SCORE_UPDATE: &str = "score_update";
    /// Phase or clock changed
    pub const STATUS_CHANGE: &str = "status_change";
    /// Timeline event
    pub const MATCH_EVENT: &str = "match_event";
    /// Statistics replaced
    pub const STATS_UPDATE: &str = "stats_update";
    /// Chat line
    pub const CHAT_MESSAGE: &str = "chat_message";
    /// Typing notification
    pub const TYPING_INDICATOR: &str = "typing_indicator";
}

/// `score_update` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreUpdate {
    /// Target match
    pub match_id: MatchId,
    /// New home goals
    pub home_score: u32,
    /// New away goals
    pub away_score: u32,
}

/// `status_change` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusChange {
    /// Target match
    pub match_id: MatchId,
    /// New phase
    pub status: MatchStatus,
    /// New clock value
    pub minute: u32,
}

/// `match_event` payload: the event fields flattened next to the match id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchEventPush {
    /// Target match
    pub match_id: MatchId,
    /// The timeline entry
    #[serde(flatten)]
    pub event: MatchEvent,
}

/// `stats_update` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsUpdate {
    /// Target match
    pub match_id: MatchId,
    /// Replacement statistics
    pub statistics: MatchStatistics,
}

/// A decoded server push.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerEvent {
    /// Score changed
    ScoreUpdate(ScoreUpdate),
    /// Phase or clock changed
    StatusChange(StatusChange),
    /// Timeline event appended
    MatchEvent(MatchEventPush),
    /// Statistics replaced
    StatsUpdate(StatsUpdate),
    /// Chat line posted
    ChatMessage(ChatMessage),
    /// Someone started or stopped typing
    TypingIndicator(TypingIndicator),
}

impl ServerEvent {
    /// Wire name of this event.
    pub fn name(&self) -> &'static str {
        match self {
            Self::ScoreUpdate(_) => names::SCORE_UPDATE,
            Self::StatusChange(_) => names::STATUS_CHANGE,
            Self::MatchEvent(_) => names::MATCH_EVENT,
            Self::StatsUpdate(_) => names::STATS_UPDATE,
            Self::ChatMessage(_) => names::CHAT_MESSAGE,
            Self::TypingIndicator(_) => names::TYPING_INDICATOR,
        }
    }

    /// Room this event is scoped to (match id or chat room id).
    pub fn room(&self) -> &str {
        match self {
            Self::ScoreUpdate(e) => &e.match_id,
            Self::StatusChange(e) => &e.match_id,
            Self::MatchEvent(e) => &e.match_id,
            Self::StatsUpdate(e) => &e.match_id,
            Self::ChatMessage(m) => &m.room_id,
            Self::TypingIndicator(t) => &t.room_id,
        }
    }

    /// Decode a named event payload. Unknown names yield `Ok(None)`.
    pub fn decode(name: &str, payload: Value) -> Result<Option<Self>> {
        fn parse<T: serde::de::DeserializeOwned>(name: &str, payload: Value) -> Result<T> {
            serde_json::from_value(payload).map_err(|e| ProtocolError::payload(name, e))
        }

        let event = match name {
            names::SCORE_UPDATE => Self::ScoreUpdate(parse(name, payload)?),
            names::STATUS_CHANGE => Self::StatusChange(parse(name, payload)?),
            names::MATCH_EVENT => Self::MatchEvent(parse(name, payload)?),
            names::STATS_UPDATE => Self::StatsUpdate(parse(name, payload)?),
            names::CHAT_MESSAGE => Self::ChatMessage(parse(name, payload)?),
            names::TYPING_INDICATOR => Self::TypingIndicator(parse(name, payload)?),
            _ => return Ok(None),
        };
        Ok(Some(event))
    }

    /// Decode a Socket.IO packet. Non-event packets yield `Ok(None)`.
    pub fn from_packet(packet: SocketPacket) -> Result<Option<Self>> {
        match packet {
            SocketPacket::Event { name, args, .. } => {
                let payload = args.into_iter().next().unwrap_or(Value::Null);
                Self::decode(&name, payload)
            },
            _ => Ok(None),
        }
    }

    /// Encode as a Socket.IO event packet, as the server would send it.
    pub fn to_packet(&self) -> Result<SocketPacket> {
        let payload = match self {
            Self::ScoreUpdate(e) => serde_json::to_value(e),
            Self::StatusChange(e) => serde_json::to_value(e),
            Self::MatchEvent(e) => serde_json::to_value(e),
            Self::StatsUpdate(e) => serde_json::to_value(e),
            Self::ChatMessage(m) => serde_json::to_value(m),
            Self::TypingIndicator(t) => serde_json::to_value(t),
        }
        .map_err(|e| ProtocolError::payload(self.name(), e))?;

        Ok(SocketPacket::event(self.name(), payload))
    }
}

//! Wire protocol for Touchline
//!
//! Text codec for the Engine.IO v4 / Socket.IO v5 framing the score server
//! speaks, plus the typed records and events carried inside it.
//!
//! # Layers
//!
//! - [`EnginePacket`]: one WebSocket text frame (open, ping, pong, message)
//! - [`SocketPacket`]: namespace-level packet carried in an engine message
//! - [`ServerEvent`]: typed inbound push (score, status, chat, typing)
//! - [`ClientIntent`]: typed outbound intent (subscribe, join, send)
//!
//! Nothing in this crate performs I/O.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod errors;
pub mod event;
pub mod intent;
pub mod model;
pub mod packet;

pub use errors::{ProtocolError, Result};
pub use event::{MatchEventPush, ScoreUpdate, ServerEvent, StatsUpdate, StatusChange};
pub use intent::ClientIntent;
pub use model::{
    ApiResponse, ChatMessage, DetailedMatch, EventType, Match, MatchEvent, MatchId,
    MatchStatistics, MatchStatus, MatchesResponse, RoomId, StatPair, Team, TeamSide,
    TypingIndicator, UserId,
};
pub use packet::{DEFAULT_NAMESPACE, ENGINE_PROTOCOL, EnginePacket, Handshake, SocketPacket};

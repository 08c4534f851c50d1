//! Protocol error types.

use thiserror::Error;

/// Result alias for codec operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors produced while decoding or encoding wire packets.
///
/// None of these are fatal to a connection. The transport logs them and drops
/// the offending packet.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Text frame carried no packet type.
    #[error("empty packet")]
    EmptyPacket,

    /// Engine.IO packet type outside `0..=6`.
    #[error("unknown engine.io packet type {0:?}")]
    UnknownEngineType(char),

    /// Socket.IO packet type outside `0..=6`.
    #[error("unknown socket.io packet type {0:?}")]
    UnknownSocketType(char),

    /// Binary attachments are not part of the consumed contract.
    #[error("binary packets are not supported")]
    BinaryUnsupported,

    /// Engine.IO open packet did not carry a valid handshake.
    #[error("malformed handshake: {0}")]
    Handshake(String),

    /// Socket.IO packet body could not be parsed.
    #[error("malformed packet: {0}")]
    MalformedPacket(String),

    /// Event payload did not match the expected shape.
    #[error("invalid payload for {event}: {reason}")]
    InvalidPayload {
        /// Event name the payload arrived under
        event: String,
        /// Parser diagnostic
        reason: String,
    },
}

impl ProtocolError {
    pub(crate) fn payload(event: &str, err: impl std::fmt::Display) -> Self {
        Self::InvalidPayload { event: event.to_string(), reason: err.to_string() }
    }
}

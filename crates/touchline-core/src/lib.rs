//! Core state machines for Touchline
//!
//! Pure, I/O-free logic that keeps client-held view state in sync with the
//! server push feed. Every state machine takes time as a parameter and
//! returns the intents or actions its caller must execute.
//!
//! # Components
//!
//! - [`ConnectionManager`]: lifecycle and reconnect policy of the shared
//!   connection
//! - [`StatusBus`]: fan-out of [`ConnectionStatus`] to registered observers
//! - [`RoomTracker`]: reference-counted room membership
//! - [`MatchSnapshot`] / [`MatchBoard`]: score feed reducers
//! - [`ChatRoom`] / [`LocalTyping`]: chat reducer and local typing countdown
//! - [`UserSession`]: locally generated pseudo-identity

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod board;
pub mod chat;
pub mod connection;
pub mod env;
pub mod error;
pub mod match_state;
pub mod rooms;
pub mod session;
pub mod status;

pub use board::{BoardCounts, BoardFilter, MatchBoard};
pub use chat::{ChatRoom, LocalTyping, MAX_MESSAGE_CHARS, TypingState, validate_outbound};
pub use connection::{ConnectionAction, ConnectionConfig, ConnectionManager, ConnectionState};
pub use env::{Environment, Timestamp};
pub use error::{ChatError, FilterParseError};
pub use match_state::MatchSnapshot;
pub use rooms::{RoomKey, RoomTracker};
pub use session::UserSession;
pub use status::{ConnectionStatus, StatusBus, SubscriptionId};

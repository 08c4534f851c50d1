//! Error types for the core state machines.
//!
//! State machine operations never fail; they ignore input that does not
//! apply. Errors only exist where the caller must show something to the user.

use thiserror::Error;

/// Outbound chat text rejected before anything is sent.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChatError {
    /// Text is empty or whitespace only
    #[error("message is empty")]
    Empty,

    /// Text exceeds the character limit
    #[error("message is too long ({len} characters, max {max})")]
    TooLong {
        /// Length of the rejected text in characters
        len: usize,
        /// Maximum accepted length
        max: usize,
    },

    /// No chat view is open under this id
    #[error("no chat view open")]
    NoChatView,
}

/// Board filter name not recognized.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown filter {0:?}, expected one of: all, live, upcoming, finished")]
pub struct FilterParseError(pub String);

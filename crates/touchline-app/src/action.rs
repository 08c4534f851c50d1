//! Application side-effects.
//!
//! [`AppAction`]s are produced by the [`crate::App`] state machine and
//! executed by the [`crate::Runtime`] through a [`crate::Driver`].

use touchline_proto::ClientIntent;

/// Instruction for the runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppAction {
    /// State changed; redraw
    Render,

    /// Leave the event loop
    Quit,

    /// Open the transport to `url`; the outcome comes back as an event
    Dial {
        /// Server base URL
        url: String,
    },

    /// Close the transport
    Close,

    /// Send an intent over the connection
    Emit(ClientIntent),

    /// Show a user-facing message
    Notice {
        /// Text to show
        message: String,
    },
}

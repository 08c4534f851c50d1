//! Application input events.
//!
//! Transport outcomes and server pushes reported by the driver. User
//! commands do not go through here; drivers call the [`crate::App`] methods
//! directly.

use touchline_proto::ServerEvent;

/// Input to [`crate::App::handle`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    /// Periodic timer; fires redials and typing expiry
    Tick,

    /// Namespace handshake completed
    Connected,

    /// Dial or namespace handshake failed
    ConnectFailed {
        /// Failure detail
        reason: String,
    },

    /// Transport dropped
    Closed {
        /// Drop detail
        reason: String,
    },

    /// Server ended the namespace session
    ServerDisconnect,

    /// Server push
    Received(ServerEvent),
}

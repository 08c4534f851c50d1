//! Driver trait for abstracting I/O operations.
//!
//! The [`Driver`] trait decouples the application runtime from specific I/O
//! implementations. The production client drives a WebSocket and the
//! terminal; the simulation harness scripts both sides in virtual time.
//! The generic [`crate::Runtime`] handles all orchestration.

use std::future::Future;

use touchline_core::Environment;
use touchline_proto::ClientIntent;

use crate::{App, AppAction};

/// Abstracts I/O operations for the application runtime.
///
/// # Implementations
///
/// - **Client**: tokio-tungstenite transport, stdin commands, stdout render
/// - **Simulation**: in-memory queues under virtual time
///
/// # Associated Types
///
/// - [`Error`](Driver::Error): Platform-specific error type
/// - [`Env`](Driver::Env): Environment supplying time and randomness
pub trait Driver: Send {
    /// Platform-specific error type.
    type Error: std::error::Error + Send + 'static;

    /// Environment the [`App`] runs under.
    type Env: Environment;

    /// Wait for the next input and feed it to `app`.
    ///
    /// Transport outcomes go through [`App::handle`]; user commands call the
    /// matching `App` method. Returns the actions produced, possibly none.
    ///
    /// # Errors
    ///
    /// Returns an error if the input source failed irrecoverably.
    fn poll_event(
        &mut self,
        app: &mut App<Self::Env>,
    ) -> impl Future<Output = Result<Vec<AppAction>, Self::Error>> + Send;

    /// Start a transport session to `url`.
    ///
    /// Completion is reported later through `poll_event` as
    /// [`crate::AppEvent::Connected`] or [`crate::AppEvent::ConnectFailed`].
    ///
    /// # Errors
    ///
    /// Returns an error if the dial could not even be started.
    fn dial(&mut self, url: &str) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Send an intent over the live session.
    ///
    /// # Errors
    ///
    /// Returns an error if no session is open or the write failed.
    fn send(
        &mut self,
        intent: &ClientIntent,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Close the transport session, if any.
    fn close(&mut self) -> impl Future<Output = ()> + Send;

    /// Current time instant.
    fn now(&self) -> <Self::Env as Environment>::Instant;

    /// Render the application state.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering fails.
    fn render(&mut self, app: &App<Self::Env>) -> Result<(), Self::Error>;

    /// Show a one-off message to the user.
    fn notify(&mut self, message: &str);

    /// Stop and clean up resources.
    fn stop(&mut self);
}

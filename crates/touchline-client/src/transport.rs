//! Socket.IO transport over a WebSocket.
//!
//! Provides [`Connection`] which runs the Engine.IO session on a spawned
//! task. This is a thin layer that only frames, heartbeats and decodes;
//! connection policy stays in the Sans-IO [`touchline_core::ConnectionManager`].
//!
//! The task reports exactly one terminal [`TransportEvent`] (connect error,
//! close or server disconnect) unless the local side closed it. Events are
//! queued without bound so the task keeps draining outbound packets while
//! the driver is busy sending.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::{net::TcpStream, sync::mpsc, time::Instant};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};
use touchline_proto::{
    DEFAULT_NAMESPACE, ENGINE_PROTOCOL, EnginePacket, Handshake, ProtocolError, ServerEvent,
    SocketPacket,
};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

const CHANNEL_CAPACITY: usize = 64;

/// Budget for the WebSocket dial plus the Engine.IO open packet.
pub const DIAL_TIMEOUT: Duration = Duration::from_secs(20);

/// Transport errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Server URL is not http(s) or ws(s).
    #[error("invalid server url: {0}")]
    InvalidUrl(String),

    /// WebSocket dial or I/O failed.
    #[error("websocket error: {0}")]
    WebSocket(String),

    /// Engine.IO handshake was missing or malformed.
    #[error("handshake failed: {0}")]
    Handshake(String),

    /// Server refused the namespace connection.
    #[error("connection refused by server: {0}")]
    Rejected(String),

    /// Dial or open packet did not complete in time.
    #[error("no open packet within {0:?}")]
    DialTimeout(Duration),

    /// No ping within `pingInterval + pingTimeout`.
    #[error("no ping from server within {0:?}")]
    PingTimeout(Duration),

    /// Transport closed underneath the session.
    #[error("transport closed: {0}")]
    Closed(String),

    /// Session task is gone.
    #[error("transport task has stopped")]
    TaskStopped,
}

impl From<tokio_tungstenite::tungstenite::Error> for TransportError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::WebSocket(err.to_string())
    }
}

/// Outcome reported by the session task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// Namespace handshake completed
    Open,
    /// Dial or handshake failed before the session opened
    ConnectError(String),
    /// Transport dropped after the session opened
    Closed(String),
    /// Server ended the namespace session
    ServerDisconnect,
    /// Decoded server push
    Event(ServerEvent),
}

impl TransportEvent {
    /// Whether the task ends after reporting this event.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::ConnectError(_) | Self::Closed(_) | Self::ServerDisconnect)
    }
}

enum Command {
    Send(SocketPacket),
    Close,
}

/// Handle to a transport session.
///
/// Dropping the handle closes the session gracefully once the task notices.
pub struct Connection {
    commands: mpsc::Sender<Command>,
    events: mpsc::UnboundedReceiver<TransportEvent>,
    abort_handle: tokio::task::AbortHandle,
}

impl Connection {
    /// Queue a packet for the server.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::TaskStopped`] if the session has ended.
    pub async fn send(&self, packet: SocketPacket) -> Result<(), TransportError> {
        self.commands.send(Command::Send(packet)).await.map_err(|_| TransportError::TaskStopped)
    }

    /// Next event from the session. `None` once the task has ended.
    pub async fn recv(&mut self) -> Option<TransportEvent> {
        self.events.recv().await
    }

    /// Say goodbye to the server and close the socket.
    pub async fn close(&self) {
        if self.commands.send(Command::Close).await.is_err() {
            tracing::debug!("close requested after transport task ended");
        }
    }

    /// Abort the session task without a goodbye.
    pub fn stop(&self) {
        self.abort_handle.abort();
    }
}

/// Start a session to the Socket.IO server at `server_url`.
///
/// Returns immediately; the dial runs on a spawned task and its outcome
/// arrives as [`TransportEvent::Open`] or [`TransportEvent::ConnectError`].
/// Must be called within a tokio runtime.
///
/// # Errors
///
/// Returns [`TransportError::InvalidUrl`] if `server_url` cannot be turned
/// into a WebSocket endpoint.
pub fn connect(server_url: &str) -> Result<Connection, TransportError> {
    connect_with_timeout(server_url, DIAL_TIMEOUT)
}

/// [`connect`] with a custom budget for the dial and open packet.
///
/// # Errors
///
/// Returns [`TransportError::InvalidUrl`] if `server_url` cannot be turned
/// into a WebSocket endpoint.
pub fn connect_with_timeout(
    server_url: &str,
    dial_timeout: Duration,
) -> Result<Connection, TransportError> {
    let url = socket_url(server_url)?;

    let (command_tx, command_rx) = mpsc::channel(CHANNEL_CAPACITY);
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let handle = tokio::spawn(run_session(url, dial_timeout, command_rx, event_tx));

    Ok(Connection { commands: command_tx, events: event_rx, abort_handle: handle.abort_handle() })
}

/// WebSocket endpoint of the Socket.IO server at `server_url`.
///
/// # Errors
///
/// Returns [`TransportError::InvalidUrl`] for unsupported schemes.
pub fn socket_url(server_url: &str) -> Result<String, TransportError> {
    let trimmed = server_url.trim().trim_end_matches('/');
    let (scheme, rest) = trimmed
        .split_once("://")
        .ok_or_else(|| TransportError::InvalidUrl(server_url.to_string()))?;

    let ws_scheme = match scheme.to_ascii_lowercase().as_str() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        _ => return Err(TransportError::InvalidUrl(server_url.to_string())),
    };
    if rest.is_empty() {
        return Err(TransportError::InvalidUrl(server_url.to_string()));
    }

    Ok(format!("{ws_scheme}://{rest}/socket.io/?EIO={ENGINE_PROTOCOL}&transport=websocket"))
}

/// Run one session and report its terminal event.
async fn run_session(
    url: String,
    dial_timeout: Duration,
    mut commands: mpsc::Receiver<Command>,
    events: mpsc::UnboundedSender<TransportEvent>,
) {
    let mut session = Session { events, opened: false };

    let terminal = match session.drive(&url, dial_timeout, &mut commands).await {
        Ok(Some(event)) => event,
        Ok(None) => return,
        Err(err) if session.opened => TransportEvent::Closed(err.to_string()),
        Err(err) => TransportEvent::ConnectError(err.to_string()),
    };

    tracing::debug!(?terminal, "transport session ended");
    if session.events.send(terminal).is_err() {
        tracing::debug!("transport event dropped, driver is gone");
    }
}

struct Session {
    events: mpsc::UnboundedSender<TransportEvent>,
    /// Namespace connect acknowledged
    opened: bool,
}

impl Session {
    /// Returns the terminal event, or `None` if the local side ended it.
    async fn drive(
        &mut self,
        url: &str,
        dial_timeout: Duration,
        commands: &mut mpsc::Receiver<Command>,
    ) -> Result<Option<TransportEvent>, TransportError> {
        tracing::debug!(%url, "dialing");
        let (mut sink, mut stream, handshake) = tokio::time::timeout(dial_timeout, open(url))
            .await
            .map_err(|_| TransportError::DialTimeout(dial_timeout))??;
        tracing::debug!(sid = %handshake.sid, ping_interval = handshake.ping_interval, "engine session open");

        sink.send(frame(&EnginePacket::message(&SocketPacket::connect()))).await?;

        let deadline = handshake.ping_deadline();
        let watchdog = tokio::time::sleep(deadline);
        tokio::pin!(watchdog);

        loop {
            tokio::select! {
                () = &mut watchdog => return Err(TransportError::PingTimeout(deadline)),

                command = commands.recv() => match command {
                    Some(Command::Send(packet)) => {
                        sink.send(frame(&EnginePacket::message(&packet))).await?;
                    },
                    Some(Command::Close) | None => {
                        let goodbye = SocketPacket::Disconnect { namespace: DEFAULT_NAMESPACE.to_string() };
                        if let Err(err) = sink.send(frame(&EnginePacket::message(&goodbye))).await {
                            tracing::debug!(error = %err, "goodbye not delivered");
                        }
                        if let Err(err) = sink.close().await {
                            tracing::debug!(error = %err, "websocket close failed");
                        }
                        return Ok(None);
                    },
                },

                message = stream.next() => {
                    let Some(message) = message else {
                        return Err(TransportError::Closed("stream ended".to_string()));
                    };
                    match message? {
                        Message::Text(text) => match EnginePacket::decode(text.as_str()) {
                            Ok(EnginePacket::Ping(body)) => {
                                watchdog.as_mut().reset(Instant::now() + deadline);
                                sink.send(frame(&EnginePacket::Pong(body))).await?;
                            },
                            Ok(EnginePacket::Message(body)) => {
                                if let Some(end) = self.on_message(&body)? {
                                    return Ok(Some(end));
                                }
                            },
                            Ok(EnginePacket::Close) => {
                                return Err(TransportError::Closed("server closed the transport".to_string()));
                            },
                            Ok(EnginePacket::Open(_) | EnginePacket::Pong(_) | EnginePacket::Upgrade | EnginePacket::Noop) => {},
                            Err(err) => tracing::warn!(error = %err, "dropping malformed engine packet"),
                        },
                        Message::Close(close) => {
                            let reason = close.map_or_else(|| "websocket closed".to_string(), |c| c.reason.as_str().to_string());
                            return Err(TransportError::Closed(reason));
                        },
                        Message::Binary(_) => tracing::warn!("dropping binary frame"),
                        Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => {},
                    }
                }
            }
        }
    }

    /// Handle one Socket.IO packet. Returns the terminal event if the server
    /// ended the session.
    fn on_message(&mut self, body: &str) -> Result<Option<TransportEvent>, TransportError> {
        let packet = match SocketPacket::decode(body) {
            Ok(packet) => packet,
            Err(err) => {
                tracing::warn!(error = %err, "dropping malformed socket packet");
                return Ok(None);
            },
        };
        if packet.namespace() != DEFAULT_NAMESPACE {
            tracing::debug!(namespace = packet.namespace(), "ignoring foreign namespace");
            return Ok(None);
        }

        match packet {
            SocketPacket::Connect { .. } => {
                self.opened = true;
                self.report(TransportEvent::Open)?;
            },
            SocketPacket::ConnectError { .. } => {
                let reason = packet.error_message().unwrap_or_default();
                return Err(TransportError::Rejected(reason));
            },
            SocketPacket::Disconnect { .. } => return Ok(Some(TransportEvent::ServerDisconnect)),
            SocketPacket::Event { .. } => match ServerEvent::from_packet(packet) {
                Ok(Some(event)) => self.report(TransportEvent::Event(event))?,
                Ok(None) => tracing::debug!("ignoring unknown event"),
                Err(err) => log_protocol_error(&err),
            },
            SocketPacket::Ack { .. } => {},
        }
        Ok(None)
    }

    fn report(&self, event: TransportEvent) -> Result<(), TransportError> {
        self.events.send(event).map_err(|_| TransportError::TaskStopped)
    }
}

type WsSink = futures_util::stream::SplitSink<WsStream, Message>;
type WsSource = futures_util::stream::SplitStream<WsStream>;

/// Dial and read the Engine.IO open packet.
async fn open(url: &str) -> Result<(WsSink, WsSource, Handshake), TransportError> {
    let (ws, _) = connect_async(url).await?;
    let (sink, mut stream) = ws.split();

    match next_engine_packet(&mut stream).await? {
        EnginePacket::Open(handshake) => Ok((sink, stream, handshake)),
        other => Err(TransportError::Handshake(format!("expected open packet, got {other:?}"))),
    }
}

fn log_protocol_error(err: &ProtocolError) {
    tracing::warn!(error = %err, "dropping malformed event");
}

async fn next_engine_packet(stream: &mut WsSource) -> Result<EnginePacket, TransportError> {
    while let Some(message) = stream.next().await {
        match message? {
            Message::Text(text) => {
                return EnginePacket::decode(text.as_str())
                    .map_err(|err| TransportError::Handshake(err.to_string()));
            },
            Message::Close(_) => break,
            _ => {},
        }
    }
    Err(TransportError::Handshake("closed before open packet".to_string()))
}

fn frame(packet: &EnginePacket) -> Message {
    Message::text(packet.encode())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_maps_to_ws() {
        assert_eq!(
            socket_url("http://localhost:3001").unwrap(),
            "ws://localhost:3001/socket.io/?EIO=4&transport=websocket"
        );
    }

    #[test]
    fn https_maps_to_wss_and_trailing_slash_dropped() {
        assert_eq!(
            socket_url("https://scores.example.com/").unwrap(),
            "wss://scores.example.com/socket.io/?EIO=4&transport=websocket"
        );
    }

    #[test]
    fn ws_schemes_pass_through() {
        assert!(socket_url("ws://127.0.0.1:9").unwrap().starts_with("ws://127.0.0.1:9/"));
        assert!(socket_url("WSS://host").unwrap().starts_with("wss://host/"));
    }

    #[test]
    fn unsupported_urls_rejected() {
        for url in ["localhost:3001", "ftp://host", "http://", ""] {
            assert!(matches!(socket_url(url), Err(TransportError::InvalidUrl(_))), "{url}");
        }
    }

    #[test]
    fn terminal_events() {
        assert!(TransportEvent::ServerDisconnect.is_terminal());
        assert!(TransportEvent::Closed("x".into()).is_terminal());
        assert!(!TransportEvent::Open.is_terminal());
    }

    #[tokio::test]
    async fn unreachable_server_reports_connect_error() {
        let mut connection = connect("http://127.0.0.1:9").unwrap();

        let event = tokio::time::timeout(Duration::from_secs(10), connection.recv()).await.unwrap();

        assert!(matches!(event, Some(TransportEvent::ConnectError(_))));
        assert_eq!(connection.recv().await, None);
    }
}

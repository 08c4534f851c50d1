//! Engine.IO v4 and Socket.IO v5 text packet codec.
//!
//! Every WebSocket text frame is one Engine.IO packet: a single type digit
//! followed by its body. Socket.IO packets ride inside Engine.IO `message`
//! packets, so a Socket.IO event on the wire looks like
//! `42["score_update",{...}]`.
//!
//! ```text
//! engine:  <type>[body]
//! socket:  <type>[<namespace>,][<ack id>][<json>]
//! ```
//!
//! Binary attachments (socket types 5 and 6, engine `b` prefix) are rejected.

use std::{fmt::Write as _, time::Duration};

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::errors::{ProtocolError, Result};

/// Engine.IO protocol revision requested in the handshake query.
pub const ENGINE_PROTOCOL: u8 = 4;

/// Default Socket.IO namespace.
pub const DEFAULT_NAMESPACE: &str = "/";

/// Session parameters sent by the server in the Engine.IO `open` packet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Handshake {
    /// Engine.IO session id
    pub sid: String,
    /// Transports the session could upgrade to
    #[serde(default)]
    pub upgrades: Vec<String>,
    /// Interval between server pings, in milliseconds
    pub ping_interval: u64,
    /// Grace period after a missed ping, in milliseconds
    pub ping_timeout: u64,
    /// Largest payload the server accepts, in bytes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_payload: Option<u64>,
}

impl Handshake {
    /// Longest silence tolerated before the transport counts as dropped.
    pub fn ping_deadline(&self) -> Duration {
        Duration::from_millis(self.ping_interval.saturating_add(self.ping_timeout))
    }
}

/// A single Engine.IO packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnginePacket {
    /// Session open (server to client)
    Open(Handshake),
    /// Transport close
    Close,
    /// Heartbeat ping with optional probe body
    Ping(String),
    /// Heartbeat reply echoing the ping body
    Pong(String),
    /// Carries one encoded Socket.IO packet
    Message(String),
    /// Transport upgrade
    Upgrade,
    /// No-op filler
    Noop,
}

impl EnginePacket {
    /// Parse a WebSocket text frame.
    pub fn decode(text: &str) -> Result<Self> {
        let mut chars = text.chars();
        let kind = chars.next().ok_or(ProtocolError::EmptyPacket)?;
        let body = chars.as_str();

        match kind {
            '0' => serde_json::from_str(body)
                .map(Self::Open)
                .map_err(|e| ProtocolError::Handshake(e.to_string())),
            '1' => Ok(Self::Close),
            '2' => Ok(Self::Ping(body.to_string())),
            '3' => Ok(Self::Pong(body.to_string())),
            '4' => Ok(Self::Message(body.to_string())),
            '5' => Ok(Self::Upgrade),
            '6' => Ok(Self::Noop),
            'b' => Err(ProtocolError::BinaryUnsupported),
            other => Err(ProtocolError::UnknownEngineType(other)),
        }
    }

    /// Serialize to a WebSocket text frame.
    pub fn encode(&self) -> String {
        match self {
            Self::Open(handshake) => {
                let mut body = json!({
                    "sid": handshake.sid,
                    "upgrades": handshake.upgrades,
                    "pingInterval": handshake.ping_interval,
                    "pingTimeout": handshake.ping_timeout,
                });
                if let (Some(max), Some(map)) = (handshake.max_payload, body.as_object_mut()) {
                    map.insert("maxPayload".to_string(), json!(max));
                }
                format!("0{body}")
            },
            Self::Close => "1".to_string(),
            Self::Ping(body) => format!("2{body}"),
            Self::Pong(body) => format!("3{body}"),
            Self::Message(body) => format!("4{body}"),
            Self::Upgrade => "5".to_string(),
            Self::Noop => "6".to_string(),
        }
    }

    /// Wrap a Socket.IO packet in an Engine.IO message.
    pub fn message(packet: &SocketPacket) -> Self {
        Self::Message(packet.encode())
    }
}

/// A single Socket.IO packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketPacket {
    /// Namespace connect request (client) or acceptance (server)
    Connect {
        /// Namespace, `/` by default
        namespace: String,
        /// Auth payload (client) or `{sid}` (server)
        data: Option<Value>,
    },
    /// Namespace disconnect
    Disconnect {
        /// Namespace, `/` by default
        namespace: String,
    },
    /// Named event with arguments
    Event {
        /// Namespace, `/` by default
        namespace: String,
        /// Acknowledgement id if the sender expects an ack
        id: Option<u64>,
        /// Event name
        name: String,
        /// Event arguments after the name
        args: Vec<Value>,
    },
    /// Acknowledgement of an earlier event
    Ack {
        /// Namespace, `/` by default
        namespace: String,
        /// Id of the acknowledged event
        id: u64,
        /// Acknowledgement arguments
        args: Vec<Value>,
    },
    /// Namespace connection refused
    ConnectError {
        /// Namespace, `/` by default
        namespace: String,
        /// Error detail, usually `{"message": ...}`
        data: Value,
    },
}

impl SocketPacket {
    /// Connect request for the default namespace.
    pub fn connect() -> Self {
        Self::Connect { namespace: DEFAULT_NAMESPACE.to_string(), data: None }
    }

    /// Event on the default namespace with a single argument.
    pub fn event(name: impl Into<String>, data: Value) -> Self {
        Self::Event {
            namespace: DEFAULT_NAMESPACE.to_string(),
            id: None,
            name: name.into(),
            args: vec![data],
        }
    }

    /// Namespace this packet is addressed to.
    pub fn namespace(&self) -> &str {
        match self {
            Self::Connect { namespace, .. }
            | Self::Disconnect { namespace }
            | Self::Event { namespace, .. }
            | Self::Ack { namespace, .. }
            | Self::ConnectError { namespace, .. } => namespace,
        }
    }

    /// Human-readable detail of a `ConnectError`, if any.
    pub fn error_message(&self) -> Option<String> {
        match self {
            Self::ConnectError { data, .. } => Some(
                data.get("message")
                    .and_then(Value::as_str)
                    .map_or_else(|| data.to_string(), str::to_string),
            ),
            _ => None,
        }
    }

    /// Parse the body of an Engine.IO message packet.
    pub fn decode(body: &str) -> Result<Self> {
        let mut chars = body.chars();
        let kind = chars.next().ok_or(ProtocolError::EmptyPacket)?;
        if matches!(kind, '5' | '6') {
            return Err(ProtocolError::BinaryUnsupported);
        }
        if !matches!(kind, '0'..='4') {
            return Err(ProtocolError::UnknownSocketType(kind));
        }
        let rest = chars.as_str();

        let (namespace, rest) = if rest.starts_with('/') {
            match rest.split_once(',') {
                Some((namespace, rest)) => (namespace, rest),
                None => (rest, ""),
            }
        } else {
            (DEFAULT_NAMESPACE, rest)
        };
        let namespace = namespace.to_string();

        let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
        let (id, json) = rest.split_at(digits);
        let id = if id.is_empty() {
            None
        } else {
            Some(id.parse::<u64>().map_err(|e| ProtocolError::MalformedPacket(e.to_string()))?)
        };

        let data = if json.is_empty() {
            None
        } else {
            Some(
                serde_json::from_str::<Value>(json)
                    .map_err(|e| ProtocolError::MalformedPacket(e.to_string()))?,
            )
        };

        match kind {
            '0' => Ok(Self::Connect { namespace, data }),
            '1' => Ok(Self::Disconnect { namespace }),
            '2' => {
                let Some(Value::Array(items)) = data else {
                    return Err(ProtocolError::MalformedPacket(
                        "event body must be a JSON array".to_string(),
                    ));
                };
                let mut items = items.into_iter();
                let name = match items.next() {
                    Some(Value::String(name)) => name,
                    _ => {
                        return Err(ProtocolError::MalformedPacket(
                            "event name must be a string".to_string(),
                        ));
                    },
                };
                Ok(Self::Event { namespace, id, name, args: items.collect() })
            },
            '3' => {
                let id = id.ok_or_else(|| {
                    ProtocolError::MalformedPacket("ack without id".to_string())
                })?;
                let args = match data {
                    Some(Value::Array(args)) => args,
                    Some(other) => vec![other],
                    None => Vec::new(),
                };
                Ok(Self::Ack { namespace, id, args })
            },
            _ => Ok(Self::ConnectError { namespace, data: data.unwrap_or(Value::Null) }),
        }
    }

    /// Serialize to the body of an Engine.IO message packet.
    pub fn encode(&self) -> String {
        let (kind, id, data) = match self {
            Self::Connect { data, .. } => ('0', None, data.clone()),
            Self::Disconnect { .. } => ('1', None, None),
            Self::Event { id, name, args, .. } => {
                let mut items = Vec::with_capacity(args.len() + 1);
                items.push(Value::String(name.clone()));
                items.extend(args.iter().cloned());
                ('2', *id, Some(Value::Array(items)))
            },
            Self::Ack { id, args, .. } => ('3', Some(*id), Some(Value::Array(args.clone()))),
            Self::ConnectError { data, .. } => ('4', None, Some(data.clone())),
        };

        let mut out = String::new();
        out.push(kind);
        let namespace = self.namespace();
        if namespace != DEFAULT_NAMESPACE {
            out.push_str(namespace);
            out.push(',');
        }
        if let Some(id) = id {
            let _ = write!(out, "{id}");
        }
        if let Some(data) = data {
            let _ = write!(out, "{data}");
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_open_handshake() {
        let packet = EnginePacket::decode(
            r#"0{"sid":"abc","upgrades":[],"pingInterval":25000,"pingTimeout":20000,"maxPayload":1000000}"#,
        )
        .unwrap();

        let EnginePacket::Open(handshake) = packet else { panic!("expected open") };
        assert_eq!(handshake.sid, "abc");
        assert_eq!(handshake.ping_deadline(), Duration::from_millis(45_000));
        assert_eq!(handshake.max_payload, Some(1_000_000));
    }

    #[test]
    fn decodes_event_inside_message() {
        let engine = EnginePacket::decode(r#"42["score_update",{"matchId":"m1"}]"#).unwrap();
        let EnginePacket::Message(body) = engine else { panic!("expected message") };

        let packet = SocketPacket::decode(&body).unwrap();
        assert_eq!(
            packet,
            SocketPacket::Event {
                namespace: "/".to_string(),
                id: None,
                name: "score_update".to_string(),
                args: vec![json!({"matchId": "m1"})],
            }
        );
    }

    #[test]
    fn decodes_namespace_and_ack_id() {
        let packet = SocketPacket::decode(r#"2/admin,12["ping",1]"#).unwrap();
        assert_eq!(
            packet,
            SocketPacket::Event {
                namespace: "/admin".to_string(),
                id: Some(12),
                name: "ping".to_string(),
                args: vec![json!(1)],
            }
        );
        assert_eq!(packet.encode(), r#"2/admin,12["ping",1]"#);
    }

    #[test]
    fn connect_request_is_bare_type() {
        assert_eq!(EnginePacket::message(&SocketPacket::connect()).encode(), "40");
    }

    #[test]
    fn connect_error_exposes_message() {
        let packet = SocketPacket::decode(r#"4{"message":"Not authorized"}"#).unwrap();
        assert_eq!(packet.error_message().as_deref(), Some("Not authorized"));
    }

    #[test]
    fn rejects_binary_and_unknown_types() {
        assert_eq!(SocketPacket::decode("51-[]"), Err(ProtocolError::BinaryUnsupported));
        assert_eq!(SocketPacket::decode("9"), Err(ProtocolError::UnknownSocketType('9')));
        assert_eq!(EnginePacket::decode("bAAAA"), Err(ProtocolError::BinaryUnsupported));
        assert_eq!(EnginePacket::decode(""), Err(ProtocolError::EmptyPacket));
    }

    #[test]
    fn rejects_event_without_name() {
        assert!(matches!(SocketPacket::decode("2[1,2]"), Err(ProtocolError::MalformedPacket(_))));
        assert!(matches!(SocketPacket::decode("2{}"), Err(ProtocolError::MalformedPacket(_))));
    }

    #[test]
    fn ping_echoes_probe_body() {
        assert_eq!(EnginePacket::decode("2probe").unwrap(), EnginePacket::Ping("probe".into()));
        assert_eq!(EnginePacket::Pong("probe".into()).encode(), "3probe");
    }
}

//! Fuzz target for the Engine.IO / Socket.IO text codec
//!
//! Feeds arbitrary WebSocket text frames through the same decode path the
//! transport uses: Engine.IO packet, Socket.IO packet, then server event.
//!
//! # Invariants
//!
//! - NEVER panic on malformed input; every failure is an `Err`
//! - A decoded Socket.IO packet re-encodes to text that decodes to the same
//!   packet
//! - Unknown event names are skipped, not rejected

#![no_main]

use libfuzzer_sys::fuzz_target;
use touchline_proto::{EnginePacket, ServerEvent, SocketPacket};

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    let Ok(EnginePacket::Message(body)) = EnginePacket::decode(text) else {
        return;
    };
    let Ok(packet) = SocketPacket::decode(&body) else {
        return;
    };

    let reencoded = packet.encode();
    let again = SocketPacket::decode(&reencoded).expect("re-encoded packet must decode");
    assert_eq!(packet, again, "round trip changed {body:?} via {reencoded:?}");

    if let Ok(Some(event)) = ServerEvent::from_packet(packet) {
        assert!(!event.name().is_empty());
    }
});

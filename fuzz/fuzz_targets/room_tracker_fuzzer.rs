//! Fuzz target for reference-counted room membership
//!
//! Applies arbitrary acquire/release sequences to `RoomTracker` and checks
//! it against a plain consumer-count model.
//!
//! # Invariants
//!
//! - Subscribe/join intents are emitted exactly on the first acquisition
//! - Unsubscribe/leave intents are emitted exactly on the last release
//! - Releasing an untracked room is a silent no-op
//! - Consumer counts match the model; re-declaration covers every room once

#![no_main]

use std::collections::BTreeMap;

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use touchline_core::{RoomKey, RoomTracker};
use touchline_proto::ClientIntent;

#[derive(Debug, Clone, Arbitrary)]
enum Op {
    Subscribe(u8),
    Unsubscribe(u8),
    Join(u8),
    Leave(u8),
}

fuzz_target!(|ops: Vec<Op>| {
    let mut tracker = RoomTracker::new();
    let mut model: BTreeMap<RoomKey, usize> = BTreeMap::new();

    for op in ops {
        let (key, acquire, intent) = match op {
            Op::Subscribe(n) => {
                let id = format!("m{}", n % 4);
                (RoomKey::Match(id.clone()), true, tracker.subscribe(&id))
            },
            Op::Unsubscribe(n) => {
                let id = format!("m{}", n % 4);
                (RoomKey::Match(id.clone()), false, tracker.unsubscribe(&id))
            },
            Op::Join(n) => {
                let id = format!("room{}", n % 4);
                (RoomKey::Chat(id.clone()), true, tracker.join(&id, "user_fuzz", "Fan1"))
            },
            Op::Leave(n) => {
                let id = format!("room{}", n % 4);
                (RoomKey::Chat(id.clone()), false, tracker.leave(&id, "user_fuzz"))
            },
        };

        let count = model.entry(key.clone()).or_default();
        if acquire {
            *count += 1;
            assert_eq!(intent.is_some(), *count == 1, "{key:?} acquire #{count}");
        } else if *count == 0 {
            assert!(intent.is_none(), "{key:?} released while untracked");
        } else {
            *count -= 1;
            assert_eq!(intent.is_some(), *count == 0, "{key:?} release to {count}");
        }
        assert!(intent.as_ref().is_none_or(ClientIntent::is_membership));
        model.retain(|_, count| *count > 0);

        for (key, count) in &model {
            assert_eq!(tracker.consumers(key), *count);
        }
        assert_eq!(tracker.len(), model.len());
        assert_eq!(tracker.redeclare().len(), model.len());
    }
});

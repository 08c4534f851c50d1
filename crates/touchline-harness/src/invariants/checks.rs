//! Standard invariant checks.
//!
//! These invariants capture behavioral properties that must always hold.
//! They verify WHAT must be true, not specific test scenarios.

use std::collections::{BTreeMap, HashSet};

use touchline_core::RoomKey;
use touchline_proto::ClientIntent;

use super::{Invariant, InvariantResult, Snapshot, Violation};

/// Room membership is exactly the sum of what open views hold.
///
/// Every open view holds one consumer reference per room it observes. A
/// tracked room with no holder, or a holder with no tracked room, is a leak.
pub struct MembershipMatchesViews;

impl Invariant for MembershipMatchesViews {
    fn name(&self) -> &'static str {
        "membership_matches_views"
    }

    fn check(&self, state: &Snapshot) -> InvariantResult {
        let mut expected: BTreeMap<RoomKey, usize> = BTreeMap::new();
        for view in state.views.values() {
            for key in &view.rooms {
                *expected.entry(key.clone()).or_default() += 1;
            }
        }

        if expected != state.membership {
            return Err(Violation {
                invariant: self.name(),
                message: format!("views hold {expected:?}, tracker has {:?}", state.membership),
            });
        }
        Ok(())
    }
}

/// The local user never shows up in a typing set.
pub struct TypingExcludesSelf;

impl Invariant for TypingExcludesSelf {
    fn name(&self) -> &'static str {
        "typing_excludes_self"
    }

    fn check(&self, state: &Snapshot) -> InvariantResult {
        for (id, view) in &state.views {
            if view.typing.iter().any(|user| *user == state.local_user) {
                return Err(Violation {
                    invariant: self.name(),
                    message: format!("view {id} shows local user {} typing", state.local_user),
                });
            }
        }
        Ok(())
    }
}

/// Observers were told the current connection status.
///
/// Without a connection handle the published status must be the default
/// disconnected one.
pub struct StatusMatchesConnection;

impl Invariant for StatusMatchesConnection {
    fn name(&self) -> &'static str {
        "status_matches_connection"
    }

    fn check(&self, state: &Snapshot) -> InvariantResult {
        if state.published != state.derived {
            return Err(Violation {
                invariant: self.name(),
                message: format!(
                    "published {:?} but connection is {:?} ({:?})",
                    state.published, state.derived, state.state
                ),
            });
        }
        if state.published.is_connected && state.published.is_connecting {
            return Err(Violation {
                invariant: self.name(),
                message: "status is both connected and connecting".to_string(),
            });
        }
        Ok(())
    }
}

/// Only chat messages wait for a connection, and only while offline.
///
/// Every queued message targets a chat room that is still joined, so a
/// flush never reaches a room the server was not told about.
pub struct OutboxOnlyWhileOffline;

impl Invariant for OutboxOnlyWhileOffline {
    fn name(&self) -> &'static str {
        "outbox_only_while_offline"
    }

    fn check(&self, state: &Snapshot) -> InvariantResult {
        if state.is_connected() && !state.outbox.is_empty() {
            return Err(Violation {
                invariant: self.name(),
                message: format!("{} queued intents while connected", state.outbox.len()),
            });
        }
        if let Some(intent) =
            state.outbox.iter().find(|intent| !matches!(intent, ClientIntent::SendMessage { .. }))
        {
            return Err(Violation {
                invariant: self.name(),
                message: format!("queued {} for room {}", intent.name(), intent.room()),
            });
        }
        if let Some(intent) = state
            .outbox
            .iter()
            .find(|intent| !state.membership.contains_key(&RoomKey::Chat(intent.room().to_string())))
        {
            return Err(Violation {
                invariant: self.name(),
                message: format!("message queued for unjoined room {}", intent.room()),
            });
        }
        Ok(())
    }
}

/// Timelines and message lists only grow at the end.
///
/// For a view open at both checks, the previous entries are a prefix of the
/// current ones. Redelivered and reordered pushes must never rewrite history.
pub struct TimelineAppendOnly;

impl Invariant for TimelineAppendOnly {
    fn name(&self) -> &'static str {
        "timeline_append_only"
    }

    fn check(&self, state: &Snapshot) -> InvariantResult {
        for (id, before) in &state.previous {
            let Some(view) = state.views.get(id) else {
                continue;
            };
            if !view.entries.starts_with(before) {
                return Err(Violation {
                    invariant: self.name(),
                    message: format!("view {id}: {before:?} rewritten to {:?}", view.entries),
                });
            }
        }
        Ok(())
    }
}

/// No entry id appears twice in a view.
pub struct EntriesUnique;

impl Invariant for EntriesUnique {
    fn name(&self) -> &'static str {
        "entries_unique"
    }

    fn check(&self, state: &Snapshot) -> InvariantResult {
        for (id, view) in &state.views {
            let mut seen = HashSet::with_capacity(view.entries.len());
            if let Some(duplicate) = view.entries.iter().find(|entry| !seen.insert(*entry)) {
                return Err(Violation {
                    invariant: self.name(),
                    message: format!("view {id}: entry {duplicate} appears twice"),
                });
            }
        }
        Ok(())
    }
}

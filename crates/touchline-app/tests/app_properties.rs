//! Property-based tests for the App context.
//!
//! Arbitrary interleavings of view lifecycle, user input and transport
//! outcomes must keep room membership, emission and typing state consistent.

use std::{
    collections::BTreeMap,
    time::{Duration, Instant},
};

use proptest::prelude::*;
use touchline_app::{App, AppAction, AppConfig, AppEvent, View, ViewId};
use touchline_core::{Environment, RoomKey, UserSession};
use touchline_proto::{
    ClientIntent, DetailedMatch, Match, MatchStatistics, MatchStatus, ServerEvent, Team,
    TypingIndicator,
};

#[derive(Clone)]
struct TestEnv;

impl Environment for TestEnv {
    type Instant = Instant;

    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, _duration: Duration) -> impl std::future::Future<Output = ()> + Send {
        async {}
    }

    fn random_bytes(&self, buffer: &mut [u8]) {
        buffer.fill(0x5a);
    }

    fn unix_millis(&self) -> u64 {
        0
    }
}

#[derive(Debug, Clone)]
enum Op {
    OpenMatch(u8),
    OpenBoard(Vec<u8>),
    OpenChat(u8),
    Close(usize),
    Keystroke(usize),
    Send(usize, String),
    Connect,
    Connected,
    ConnectFailed,
    Closed,
    ServerDisconnect,
    Typing(u8, bool),
    Advance(u64),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (0u8..4).prop_map(Op::OpenMatch),
        1 => prop::collection::vec(0u8..4, 0..4).prop_map(Op::OpenBoard),
        3 => (0u8..3).prop_map(Op::OpenChat),
        3 => (0usize..8).prop_map(Op::Close),
        2 => (0usize..8).prop_map(Op::Keystroke),
        2 => ((0usize..8), "[ a-z]{0,12}").prop_map(|(v, t)| Op::Send(v, t)),
        1 => Just(Op::Connect),
        3 => Just(Op::Connected),
        1 => Just(Op::ConnectFailed),
        1 => Just(Op::Closed),
        1 => Just(Op::ServerDisconnect),
        1 => ((0u8..3), any::<bool>()).prop_map(|(u, t)| Op::Typing(u, t)),
        2 => (0u64..5000).prop_map(Op::Advance),
    ]
}

fn fixture(index: u8) -> Match {
    let team = |name: &str| Team { id: None, name: name.into(), short_name: name.into(), logo: None };
    Match {
        id: format!("m{index}"),
        home_team: team("HOM"),
        away_team: team("AWY"),
        home_score: 0,
        away_score: 0,
        minute: 0,
        status: MatchStatus::FirstHalf,
        start_time: String::new(),
        venue: None,
        round: None,
    }
}

fn room_name(index: u8) -> String {
    if index == 0 { "lobby".to_string() } else { format!("m{index}") }
}

fn new_app() -> App<TestEnv> {
    let session = UserSession { user_id: "user_local".into(), username: "Fan1".into() };
    App::new(TestEnv, AppConfig::default(), session)
}

fn nth_view(app: &App<TestEnv>, index: usize) -> Option<ViewId> {
    let ids: Vec<ViewId> = app.views().map(|(id, _)| id).collect();
    if ids.is_empty() { None } else { Some(ids[index % ids.len()]) }
}

fn apply(app: &mut App<TestEnv>, op: Op, now: &mut Instant) -> Vec<AppAction> {
    match op {
        Op::OpenMatch(index) => {
            let detail = DetailedMatch {
                summary: fixture(index),
                events: Vec::new(),
                statistics: MatchStatistics::default(),
            };
            app.open_match_view(detail).1
        },
        Op::OpenBoard(indices) => app.open_board_view(indices.into_iter().map(fixture).collect()).1,
        Op::OpenChat(index) => app.open_chat_view(&room_name(index)).1,
        Op::Close(index) => nth_view(app, index).map(|id| app.close_view(id)).unwrap_or_default(),
        Op::Keystroke(index) => {
            nth_view(app, index).map(|id| app.typing_input(id, *now)).unwrap_or_default()
        },
        Op::Send(index, text) => {
            nth_view(app, index).map(|id| app.send_message(id, &text)).unwrap_or_default()
        },
        Op::Connect => app.connect(),
        Op::Connected => app.handle(AppEvent::Connected, *now),
        Op::ConnectFailed => app.handle(AppEvent::ConnectFailed { reason: "refused".into() }, *now),
        Op::Closed => app.handle(AppEvent::Closed { reason: "reset".into() }, *now),
        Op::ServerDisconnect => app.handle(AppEvent::ServerDisconnect, *now),
        Op::Typing(index, is_typing) => {
            let user_id = if index == 0 { "user_local".to_string() } else { format!("user_{index}") };
            let indicator = TypingIndicator {
                room_id: "lobby".into(),
                user_id,
                username: format!("Fan{index}"),
                is_typing,
            };
            app.handle(AppEvent::Received(ServerEvent::TypingIndicator(indicator)), *now)
        },
        Op::Advance(ms) => {
            *now += Duration::from_millis(ms);
            app.handle(AppEvent::Tick, *now)
        },
    }
}

/// Consumers each room should have, counted from the open views.
fn expected_consumers(app: &App<TestEnv>) -> BTreeMap<RoomKey, usize> {
    let mut expected = BTreeMap::new();
    for (_, view) in app.views() {
        let keys: Vec<RoomKey> = match view {
            View::Match(snapshot) => vec![RoomKey::Match(snapshot.id().to_string())],
            View::Board(board) => board.match_ids().map(|id| RoomKey::Match(id.to_string())).collect(),
            View::Chat(room) => vec![RoomKey::Chat(room.room_id().to_string())],
        };
        for key in keys {
            *expected.entry(key).or_insert(0) += 1;
        }
    }
    expected
}

proptest! {
    #[test]
    fn prop_membership_matches_open_views(ops in prop::collection::vec(op_strategy(), 0..60)) {
        let mut app = new_app();
        let mut now = Instant::now();

        for op in ops {
            apply(&mut app, op, &mut now);

            let expected = expected_consumers(&app);
            prop_assert_eq!(app.rooms().len(), expected.len());
            for (key, count) in &expected {
                prop_assert_eq!(app.rooms().consumers(key), *count);
            }
        }
    }

    #[test]
    fn prop_emits_only_while_connected(ops in prop::collection::vec(op_strategy(), 0..60)) {
        let mut app = new_app();
        let mut now = Instant::now();

        for op in ops {
            let actions = apply(&mut app, op, &mut now);
            let emitted = actions.iter().any(|a| matches!(a, AppAction::Emit(_)));
            prop_assert!(!emitted || app.status().is_connected);
            if !app.status().is_connected {
                let only_messages = app.outbox().all(|i| matches!(i, ClientIntent::SendMessage { .. }));
                prop_assert!(only_messages);
                let rooms_joined = app
                    .outbox()
                    .all(|i| app.rooms().contains(&RoomKey::Chat(i.room().to_string())));
                prop_assert!(rooms_joined);
            }
        }
    }

    #[test]
    fn prop_local_user_never_typing(ops in prop::collection::vec(op_strategy(), 0..60)) {
        let mut app = new_app();
        let mut now = Instant::now();

        for op in ops {
            apply(&mut app, op, &mut now);
            for (_, view) in app.views() {
                if let View::Chat(room) = view {
                    prop_assert!(!room.typing().contains("user_local"));
                }
            }
        }
    }

    #[test]
    fn prop_outbox_empty_once_connected(ops in prop::collection::vec(op_strategy(), 0..60)) {
        let mut app = new_app();
        let mut now = Instant::now();

        for op in ops {
            apply(&mut app, op, &mut now);
            if app.status().is_connected {
                prop_assert_eq!(app.outbox().count(), 0);
            }
        }
    }

    #[test]
    fn prop_closing_every_view_releases_every_room(
        opens in prop::collection::vec(0u8..4, 1..10),
        connected in any::<bool>(),
    ) {
        let mut app = new_app();
        let now = Instant::now();
        if connected {
            app.connect();
            app.handle(AppEvent::Connected, now);
        }

        let ids: Vec<ViewId> = opens
            .iter()
            .map(|index| if index % 2 == 0 { app.open_chat_view(&room_name(*index)).0 } else {
                app.open_match_view(DetailedMatch {
                    summary: fixture(*index),
                    events: Vec::new(),
                    statistics: MatchStatistics::default(),
                }).0
            })
            .collect();

        let mut released = Vec::new();
        for id in ids {
            for action in app.close_view(id) {
                if let AppAction::Emit(intent) = action {
                    released.push(intent);
                }
            }
        }

        prop_assert!(app.rooms().is_empty());
        if connected {
            let distinct: std::collections::BTreeSet<u8> = opens.into_iter().collect();
            let releases = released.iter().filter(|i| {
                matches!(i, ClientIntent::UnsubscribeMatch { .. } | ClientIntent::LeaveChat { .. })
            });
            prop_assert_eq!(releases.count(), distinct.len());
        } else {
            prop_assert!(released.is_empty());
        }
    }
}

//! Property-based simulation over arbitrary user and server scripts.
//!
//! Every run goes through `Runtime<SimDriver>` with the standard invariants
//! asserted after each processed input, so a generated script that breaks
//! membership, status, outbox or timeline rules fails the property.

use std::time::Duration;

use proptest::prelude::*;
use touchline_app::{AppConfig, ViewId};
use touchline_core::ConnectionConfig;
use touchline_harness::{DialPolicy, Scenario, SimInstant};
use touchline_proto::{
    ChatMessage, ClientIntent, DetailedMatch, EventType, Match, MatchEvent, MatchEventPush,
    MatchStatistics, MatchStatus, ServerEvent, Team, TeamSide, TypingIndicator,
};

#[derive(Debug, Clone)]
enum Op {
    OpenMatch(u8),
    OpenChat(u8),
    Close(usize),
    Keystroke(usize),
    Send(usize, String),
    Chat { room: u8, id: u8, from_self: bool },
    Goal { fixture: u8, id: u8 },
    Typing { room: u8, from_self: bool, is_typing: bool },
    Drop,
    ServerDisconnect,
    Connect,
    Disconnect,
    Policy(DialPolicy),
    AcceptHeld,
    Advance(u64),
}

fn policy_strategy() -> impl Strategy<Value = DialPolicy> {
    prop_oneof![Just(DialPolicy::Accept), Just(DialPolicy::Refuse), Just(DialPolicy::Hold)]
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (0u8..3).prop_map(Op::OpenMatch),
        3 => (0u8..3).prop_map(Op::OpenChat),
        2 => (0usize..8).prop_map(Op::Close),
        2 => (0usize..8).prop_map(Op::Keystroke),
        2 => ((0usize..8), "[ a-z]{0,10}").prop_map(|(v, t)| Op::Send(v, t)),
        3 => ((0u8..3), (0u8..6), any::<bool>())
            .prop_map(|(room, id, from_self)| Op::Chat { room, id, from_self }),
        3 => ((0u8..3), (0u8..6)).prop_map(|(fixture, id)| Op::Goal { fixture, id }),
        2 => ((0u8..3), any::<bool>(), any::<bool>())
            .prop_map(|(room, from_self, is_typing)| Op::Typing { room, from_self, is_typing }),
        1 => Just(Op::Drop),
        1 => Just(Op::ServerDisconnect),
        1 => Just(Op::Connect),
        1 => Just(Op::Disconnect),
        1 => policy_strategy().prop_map(Op::Policy),
        1 => Just(Op::AcceptHeld),
        3 => (0u64..6000).prop_map(Op::Advance),
    ]
}

fn detail(index: u8) -> DetailedMatch {
    let team = |name: &str| Team { id: None, name: name.into(), short_name: name.into(), logo: None };
    DetailedMatch {
        summary: Match {
            id: format!("m{index}"),
            home_team: team("HOM"),
            away_team: team("AWY"),
            home_score: 0,
            away_score: 0,
            minute: 30,
            status: MatchStatus::FirstHalf,
            start_time: String::new(),
            venue: None,
            round: None,
        },
        events: Vec::new(),
        statistics: MatchStatistics::default(),
    }
}

fn room_name(index: u8) -> String {
    format!("room{index}")
}

fn nth_view(sim: &Scenario, index: usize) -> Option<ViewId> {
    let ids: Vec<ViewId> = sim.app().views().map(|(id, _)| id).collect();
    if ids.is_empty() { None } else { Some(ids[index % ids.len()]) }
}

fn config() -> AppConfig {
    AppConfig {
        connection: ConnectionConfig { reconnect_attempts: 4, ..ConnectionConfig::default() },
        ..AppConfig::default()
    }
}

async fn apply(sim: &mut Scenario, op: Op) {
    let me = sim.app().session().clone();
    let user = |from_self: bool| {
        if from_self { me.user_id.clone() } else { "user_remote".to_string() }
    };

    match op {
        Op::OpenMatch(index) => {
            sim.open_match(detail(index)).await.unwrap();
        },
        Op::OpenChat(index) => {
            sim.open_chat(&room_name(index)).await.unwrap();
        },
        Op::Close(index) => {
            if let Some(id) = nth_view(sim, index) {
                sim.act(|app, _| app.close_view(id)).await.unwrap();
            }
        },
        Op::Keystroke(index) => {
            if let Some(id) = nth_view(sim, index) {
                sim.act(|app, now| app.typing_input(id, now)).await.unwrap();
            }
        },
        Op::Send(index, text) => {
            if let Some(id) = nth_view(sim, index) {
                sim.act(|app, _| app.send_message(id, &text)).await.unwrap();
            }
        },
        Op::Chat { room, id, from_self } => {
            let message = ChatMessage {
                id: format!("c{id}"),
                room_id: room_name(room),
                user_id: user(from_self),
                username: "Someone".into(),
                text: "hello".into(),
                timestamp: String::new(),
            };
            sim.push(ServerEvent::ChatMessage(message)).await.unwrap();
        },
        Op::Goal { fixture, id } => {
            let push = MatchEventPush {
                match_id: format!("m{fixture}"),
                event: MatchEvent {
                    id: format!("e{id}"),
                    kind: EventType::Goal,
                    minute: u32::from(id) * 7,
                    team: TeamSide::Away,
                    player: "Player".into(),
                    assist_player: None,
                    description: String::new(),
                    timestamp: String::new(),
                },
            };
            sim.push(ServerEvent::MatchEvent(push)).await.unwrap();
        },
        Op::Typing { room, from_self, is_typing } => {
            let indicator = TypingIndicator {
                room_id: room_name(room),
                user_id: user(from_self),
                username: "Someone".into(),
                is_typing,
            };
            sim.push(ServerEvent::TypingIndicator(indicator)).await.unwrap();
        },
        Op::Drop => {
            sim.driver().drop_connection("reset by peer");
            sim.settle().await.unwrap();
        },
        Op::ServerDisconnect => {
            if sim.driver().is_session_open() {
                sim.driver().server_disconnect();
                sim.settle().await.unwrap();
            }
        },
        Op::Connect => sim.act(|app, _| app.connect()).await.unwrap(),
        Op::Disconnect => sim.act(|app, _| app.disconnect()).await.unwrap(),
        Op::Policy(policy) => sim.driver().set_dial_policy(policy),
        Op::AcceptHeld => {
            sim.driver().accept_dial();
            sim.settle().await.unwrap();
        },
        Op::Advance(ms) => sim.advance(Duration::from_millis(ms)).await.unwrap(),
    }
}

/// Observable trace of one run.
type Trace = (Vec<(SimInstant, String)>, Vec<ClientIntent>, Vec<String>);

fn run(seed: u64, ops: Vec<Op>) -> Trace {
    let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
    runtime.block_on(async {
        let mut sim = Scenario::with_config(seed, config());
        for op in ops {
            apply(&mut sim, op).await;
        }
        (sim.driver().dials(), sim.driver().take_outgoing(), sim.driver().take_notices())
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Standard invariants hold under arbitrary scripts.
    #[test]
    fn prop_invariants_hold(seed in any::<u64>(), ops in prop::collection::vec(op_strategy(), 0..60)) {
        run(seed, ops);
    }

    /// A seed and a script fully determine what the client does and when.
    #[test]
    fn prop_same_seed_same_trace(seed in any::<u64>(), ops in prop::collection::vec(op_strategy(), 0..40)) {
        let first = run(seed, ops.clone());
        let second = run(seed, ops);
        prop_assert_eq!(first, second);
    }

    /// A refusing server sees at most the configured number of dials.
    #[test]
    fn prop_refused_dials_are_capped(seed in any::<u64>(), steps in prop::collection::vec(0u64..8000, 0..40)) {
        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let dials = runtime.block_on(async {
            let mut sim = Scenario::with_config(seed, config());
            sim.driver().set_dial_policy(DialPolicy::Refuse);
            sim.open_chat("room0").await.unwrap();
            for ms in steps {
                sim.advance(Duration::from_millis(ms)).await.unwrap();
            }
            sim.driver().dial_count()
        });
        prop_assert!((1..=4).contains(&dials), "{} dials", dials);
    }
}

//! End-to-end scenarios through the real runtime under virtual time.
//!
//! Each test plays user and server against `Runtime<SimDriver>` with the
//! standard invariants checked after every processed input.

use std::time::Duration;

use touchline_app::AppConfig;
use touchline_core::ConnectionConfig;
use touchline_harness::{DialPolicy, Scenario};
use touchline_proto::{
    ChatMessage, ClientIntent, DetailedMatch, EventType, Match, MatchEvent, MatchEventPush,
    MatchStatistics, MatchStatus, ScoreUpdate, ServerEvent, StatusChange, Team, TeamSide,
    TypingIndicator,
};

fn fixture(id: &str) -> Match {
    let team = |name: &str| Team {
        id: None,
        name: name.to_string(),
        short_name: name[..3].to_uppercase(),
        logo: None,
    };
    Match {
        id: id.to_string(),
        home_team: team("Rovers"),
        away_team: team("United"),
        home_score: 0,
        away_score: 0,
        minute: 12,
        status: MatchStatus::FirstHalf,
        start_time: "2025-01-01T15:00:00Z".to_string(),
        venue: None,
        round: None,
    }
}

fn detail(id: &str) -> DetailedMatch {
    DetailedMatch { summary: fixture(id), events: Vec::new(), statistics: MatchStatistics::default() }
}

fn goal(match_id: &str, event_id: &str, minute: u32) -> ServerEvent {
    ServerEvent::MatchEvent(MatchEventPush {
        match_id: match_id.to_string(),
        event: MatchEvent {
            id: event_id.to_string(),
            kind: EventType::Goal,
            minute,
            team: TeamSide::Home,
            player: "Okafor".to_string(),
            assist_player: None,
            description: "Header from a corner".to_string(),
            timestamp: "2025-01-01T15:40:00Z".to_string(),
        },
    })
}

fn chat(room: &str, id: &str, user: &str, text: &str) -> ServerEvent {
    ServerEvent::ChatMessage(ChatMessage {
        id: id.to_string(),
        room_id: room.to_string(),
        user_id: user.to_string(),
        username: "Fan42".to_string(),
        text: text.to_string(),
        timestamp: "2025-01-01T15:41:00Z".to_string(),
    })
}

fn capped(attempts: u32) -> AppConfig {
    AppConfig {
        connection: ConnectionConfig { reconnect_attempts: attempts, ..ConnectionConfig::default() },
        ..AppConfig::default()
    }
}

const STEP: Duration = Duration::from_millis(250);

#[tokio::test]
async fn opening_a_match_view_connects_then_subscribes() {
    let mut sim = Scenario::new(1);

    sim.open_match(detail("m1")).await.unwrap();

    assert_eq!(sim.driver().dial_count(), 1);
    assert!(sim.driver().renders() > 0);
    assert!(sim.app().status().is_connected);
    assert_eq!(sim.driver().take_outgoing(), vec![ClientIntent::SubscribeMatch {
        match_id: "m1".into()
    }]);
}

#[tokio::test]
async fn score_status_and_timeline_pushes_reach_the_view() {
    let mut sim = Scenario::new(2);
    let view = sim.open_match(detail("m1")).await.unwrap();

    sim.push(ServerEvent::ScoreUpdate(ScoreUpdate {
        match_id: "m1".into(),
        home_score: 2,
        away_score: 1,
    }))
    .await
    .unwrap();
    sim.push(ServerEvent::StatusChange(StatusChange {
        match_id: "m1".into(),
        status: MatchStatus::SecondHalf,
        minute: 67,
    }))
    .await
    .unwrap();
    sim.push(goal("m1", "e1", 64)).await.unwrap();
    sim.push(goal("m1", "e1", 64)).await.unwrap();
    sim.push(ServerEvent::ScoreUpdate(ScoreUpdate {
        match_id: "m2".into(),
        home_score: 9,
        away_score: 9,
    }))
    .await
    .unwrap();

    let snapshot = sim.app().view(view).and_then(|v| v.as_match()).unwrap();
    let summary = &snapshot.detail().summary;
    assert_eq!((summary.home_score, summary.away_score), (2, 1));
    assert_eq!(summary.status, MatchStatus::SecondHalf);
    assert_eq!(summary.minute, 67);
    assert_eq!(snapshot.events().len(), 1);
}

#[tokio::test]
async fn board_tracks_every_listed_match() {
    let mut sim = Scenario::new(3);
    let board = sim.open_board(vec![fixture("m1"), fixture("m2")]).await.unwrap();

    let mut outgoing = sim.driver().take_outgoing();
    outgoing.sort_by_key(|intent| intent.room().to_string());
    assert_eq!(outgoing, vec![
        ClientIntent::SubscribeMatch { match_id: "m1".into() },
        ClientIntent::SubscribeMatch { match_id: "m2".into() },
    ]);

    sim.push(ServerEvent::StatusChange(StatusChange {
        match_id: "m2".into(),
        status: MatchStatus::FullTime,
        minute: 90,
    }))
    .await
    .unwrap();

    let listing = sim.app().view(board).and_then(|v| v.as_board()).unwrap();
    assert_eq!(listing.counts().finished, 1);
    assert_eq!(listing.counts().live, 1);
}

#[tokio::test]
async fn refused_dials_stop_after_the_attempt_cap() {
    let mut sim = Scenario::with_config(4, capped(3));
    sim.driver().set_dial_policy(DialPolicy::Refuse);

    sim.open_chat("lobby").await.unwrap();
    sim.run_for(Duration::from_secs(120), STEP).await.unwrap();

    assert_eq!(sim.driver().dial_count(), 3);
    let status = sim.app().status();
    assert!(!status.is_connected);
    assert!(!status.is_connecting);
    assert_eq!(status.reconnect_attempts, 3);
    assert_eq!(status.error.as_deref(), Some("connection refused"));

    // An explicit connect starts over.
    sim.driver().set_dial_policy(DialPolicy::Accept);
    sim.act(|app, _| app.connect()).await.unwrap();

    assert_eq!(sim.driver().dial_count(), 4);
    assert!(sim.app().status().is_connected);
    assert_eq!(sim.app().status().reconnect_attempts, 0);
}

#[tokio::test]
async fn redials_back_off() {
    let mut sim = Scenario::with_config(5, capped(4));
    sim.driver().set_dial_policy(DialPolicy::Refuse);

    sim.open_chat("lobby").await.unwrap();
    sim.run_for(Duration::from_secs(120), STEP).await.unwrap();

    let times: Vec<Duration> = sim.driver().dials().iter().map(|(at, _)| at.elapsed()).collect();
    assert_eq!(times.len(), 4);
    for (gap, (low, high)) in times.windows(2).map(|w| w[1] - w[0]).zip([
        (1500, 4500 + 250),
        (3000, 9000 + 250),
        (6000, 10_000 + 250),
    ]) {
        let gap = gap.as_millis();
        assert!((low..=high).contains(&gap), "gap {gap}ms outside {low}..={high}");
    }
}

#[tokio::test]
async fn transient_drop_redeclares_then_flushes_queued_messages() {
    let mut sim = Scenario::new(6);
    let view = sim.open_chat("lobby").await.unwrap();
    let session = sim.app().session().clone();
    sim.driver().take_outgoing();

    sim.driver().drop_connection("connection reset");
    sim.settle().await.unwrap();
    assert!(sim.app().status().is_connecting);

    sim.act(|app, _| app.send_message(view, "  still here ")).await.unwrap();
    assert_eq!(sim.app().outbox().count(), 1);
    assert!(sim.driver().take_outgoing().is_empty());

    sim.run_for(Duration::from_secs(15), STEP).await.unwrap();

    assert_eq!(sim.driver().dial_count(), 2);
    assert!(sim.app().status().is_connected);
    assert_eq!(sim.app().outbox().count(), 0);
    assert_eq!(sim.driver().take_outgoing(), vec![
        ClientIntent::JoinChat {
            room_id: "lobby".into(),
            user_id: session.user_id.clone(),
            username: session.username.clone(),
        },
        ClientIntent::SendMessage {
            room_id: "lobby".into(),
            user_id: session.user_id,
            username: session.username,
            text: "  still here ".into(),
        },
    ]);
}

#[tokio::test]
async fn server_disconnect_is_not_retried() {
    let mut sim = Scenario::new(7);
    sim.open_match(detail("m1")).await.unwrap();

    sim.driver().server_disconnect();
    sim.run_for(Duration::from_secs(60), STEP).await.unwrap();

    assert_eq!(sim.driver().dial_count(), 1);
    assert_eq!(sim.driver().closes(), 1);
    assert_eq!(sim.app().status().label(), "disconnected");
}

#[tokio::test]
async fn two_chat_views_share_one_membership() {
    let mut sim = Scenario::new(8);
    let first = sim.open_chat("lobby").await.unwrap();
    let second = sim.open_chat("lobby").await.unwrap();
    let user = sim.app().session().user_id.clone();

    let joins = sim.driver().take_outgoing();
    assert_eq!(joins.len(), 1);
    assert!(matches!(&joins[0], ClientIntent::JoinChat { room_id, .. } if room_id == "lobby"));

    sim.push(chat("lobby", "c1", "user_other", "what a save")).await.unwrap();
    sim.push(chat("lobby", "c1", "user_other", "what a save")).await.unwrap();
    for id in [first, second] {
        let room = sim.app().view(id).and_then(|v| v.as_chat()).unwrap();
        assert_eq!(room.messages().len(), 1);
    }

    sim.act(|app, _| app.close_view(first)).await.unwrap();
    assert!(sim.driver().take_outgoing().is_empty());

    sim.push(chat("lobby", "c2", "user_other", "still watching")).await.unwrap();
    let room = sim.app().view(second).and_then(|v| v.as_chat()).unwrap();
    assert_eq!(room.messages().len(), 2);

    sim.act(|app, _| app.close_view(second)).await.unwrap();
    assert_eq!(sim.driver().take_outgoing(), vec![ClientIntent::LeaveChat {
        room_id: "lobby".into(),
        user_id: user
    }]);
    assert!(sim.app().rooms().is_empty());
}

#[tokio::test]
async fn typing_stops_after_quiet_period() {
    let mut sim = Scenario::new(9);
    let view = sim.open_chat("lobby").await.unwrap();
    sim.driver().take_outgoing();

    sim.act(|app, now| app.typing_input(view, now)).await.unwrap();
    sim.advance(Duration::from_millis(1000)).await.unwrap();
    sim.act(|app, now| app.typing_input(view, now)).await.unwrap();

    let starts = sim.driver().take_outgoing();
    assert_eq!(starts.len(), 2);
    assert!(starts.iter().all(|intent| matches!(intent, ClientIntent::TypingStart { .. })));

    sim.advance(Duration::from_millis(2999)).await.unwrap();
    assert!(sim.driver().take_outgoing().is_empty());

    sim.advance(Duration::from_millis(1)).await.unwrap();
    let stops = sim.driver().take_outgoing();
    assert!(matches!(stops.as_slice(), [ClientIntent::TypingStop { room_id, .. }] if room_id == "lobby"));
}

#[tokio::test]
async fn remote_typing_expires_and_own_echo_is_ignored() {
    let mut sim = Scenario::new(10);
    let view = sim.open_chat("lobby").await.unwrap();
    let me = sim.app().session().clone();

    let indicator = |user_id: &str, username: &str| {
        ServerEvent::TypingIndicator(TypingIndicator {
            room_id: "lobby".into(),
            user_id: user_id.to_string(),
            username: username.to_string(),
            is_typing: true,
        })
    };
    sim.push(indicator("user_other", "Fan42")).await.unwrap();
    sim.push(indicator(&me.user_id, &me.username)).await.unwrap();

    let now = sim.now();
    let room = sim.app().view(view).and_then(|v| v.as_chat()).unwrap();
    let typing: Vec<_> = room.typing().typing_users(now).map(|(user, _)| user.to_string()).collect();
    assert_eq!(typing, vec!["user_other".to_string()]);

    sim.advance(Duration::from_secs(3)).await.unwrap();
    let now = sim.now();
    let room = sim.app().view(view).and_then(|v| v.as_chat()).unwrap();
    assert_eq!(room.typing().typing_users(now).count(), 0);
}

#[tokio::test]
async fn invalid_message_only_notifies() {
    let mut sim = Scenario::new(11);
    let view = sim.open_chat("lobby").await.unwrap();
    sim.driver().take_outgoing();

    sim.act(|app, _| app.send_message(view, "   ")).await.unwrap();
    sim.act(|app, _| app.send_message(view, &"x".repeat(501))).await.unwrap();

    assert!(sim.driver().take_outgoing().is_empty());
    assert_eq!(sim.driver().take_notices().len(), 2);
}

#[tokio::test]
async fn held_dial_resolves_when_the_server_answers() {
    let mut sim = Scenario::new(12);
    sim.driver().set_dial_policy(DialPolicy::Hold);

    sim.open_chat("lobby").await.unwrap();
    assert!(sim.app().status().is_connecting);
    assert!(sim.driver().take_outgoing().is_empty());

    sim.driver().accept_dial();
    sim.settle().await.unwrap();
    assert!(sim.app().status().is_connected);
    assert_eq!(sim.driver().take_outgoing().len(), 1);
}

#[tokio::test]
async fn message_for_a_closed_chat_is_never_flushed() {
    let mut sim = Scenario::new(14);
    sim.driver().set_dial_policy(DialPolicy::Hold);
    sim.open_match(detail("m1")).await.unwrap();
    let lobby = sim.open_chat("lobby").await.unwrap();

    sim.act(|app, _| app.send_message(lobby, "queued")).await.unwrap();
    sim.act(|app, _| app.close_view(lobby)).await.unwrap();
    assert_eq!(sim.app().outbox().count(), 0);

    sim.driver().accept_dial();
    sim.settle().await.unwrap();
    assert_eq!(sim.driver().take_outgoing(), vec![ClientIntent::SubscribeMatch {
        match_id: "m1".to_string()
    }]);
}

#[tokio::test]
async fn quit_tears_down_before_pending_inputs() {
    let mut runtime = Scenario::new(13).into_runtime();
    runtime.driver().inject_user(|app, _| app.open_chat_view("lobby").1);
    runtime.driver().inject_user(|app, _| app.quit());

    // The accepted dial queues `Connected` behind the quit input.
    assert!(!runtime.step().await.unwrap());
    assert_eq!(runtime.driver().dial_count(), 1);
    assert!(runtime.step().await.unwrap());

    assert_eq!(runtime.driver().closes(), 1);
    assert!(!runtime.driver().is_session_open());
    assert!(runtime.app().connection().is_none());
    assert_eq!(runtime.app().status().label(), "disconnected");
}

#[tokio::test]
async fn run_loop_returns_after_quit() {
    let runtime = Scenario::new(14).into_runtime();
    runtime.driver().inject_user(|app, _| app.open_board_view(vec![fixture("m1")]).1);
    runtime.driver().inject_user(|app, _| app.quit());

    runtime.run().await.unwrap();
}

//! Plain-text rendering of the open views.

use std::fmt::Write as _;

use touchline_app::{App, View, ViewId};
use touchline_core::{ChatRoom, Environment, MatchBoard, MatchSnapshot, Timestamp};
use touchline_proto::{EventType, Match, MatchEvent, MatchStatus, TeamSide};

const TIMELINE_LINES: usize = 5;
const CHAT_LINES: usize = 8;

/// Render every open view as one text frame.
pub fn render_frame<E: Environment>(app: &App<E>, now: E::Instant, focus: Option<ViewId>) -> String {
    let mut out = String::new();
    let session = app.session();
    let _ = writeln!(out, "-- {} | {} ({})", app.status(), session.username, session.user_id);

    for (id, view) in app.views() {
        let marker = if Some(id) == focus { " *" } else { "" };
        match view {
            View::Match(snapshot) => render_match(&mut out, id, snapshot),
            View::Board(board) => render_board(&mut out, id, board),
            View::Chat(room) => render_chat(&mut out, id, marker, room, now),
        }
    }
    out
}

fn render_match(out: &mut String, id: ViewId, snapshot: &MatchSnapshot) {
    let detail = snapshot.detail();
    let _ = writeln!(out, "{id} match {}", scoreline(&detail.summary));

    let stats = &detail.statistics;
    let _ = writeln!(
        out,
        "   possession {}-{}  shots {}-{}  on target {}-{}  corners {}-{}",
        stats.possession.home,
        stats.possession.away,
        stats.shots.home,
        stats.shots.away,
        stats.shots_on_target.home,
        stats.shots_on_target.away,
        stats.corners.home,
        stats.corners.away,
    );
    for event in snapshot.timeline().into_iter().take(TIMELINE_LINES) {
        let _ = writeln!(out, "   {}", event_line(&detail.summary, event));
    }
}

fn render_board(out: &mut String, id: ViewId, board: &MatchBoard) {
    let counts = board.counts();
    let _ = writeln!(
        out,
        "{id} board [{}] all {} live {} upcoming {} finished {}",
        board.filter(),
        counts.all,
        counts.live,
        counts.upcoming,
        counts.finished,
    );
    for fixture in board.visible() {
        let _ = writeln!(out, "   {:<12} {}", fixture.id, scoreline(fixture));
    }
}

fn render_chat<I: Timestamp>(out: &mut String, id: ViewId, marker: &str, room: &ChatRoom<I>, now: I) {
    let _ = writeln!(out, "{id} chat {}{marker}", room.room_id());

    let messages = room.messages();
    for message in &messages[messages.len().saturating_sub(CHAT_LINES)..] {
        let _ = writeln!(out, "   <{}> {}", message.username, message.text);
    }

    let typing: Vec<&str> = room.typing().typing_users(now).map(|(_, name)| name).collect();
    if !typing.is_empty() {
        let _ = writeln!(out, "   {} typing...", typing.join(", "));
    }
}

fn scoreline(fixture: &Match) -> String {
    let clock = match fixture.status {
        MatchStatus::FirstHalf | MatchStatus::SecondHalf => format!("{}'", fixture.minute),
        MatchStatus::NotStarted => "KO".to_string(),
        MatchStatus::HalfTime => "HT".to_string(),
        MatchStatus::FullTime => "FT".to_string(),
    };
    format!(
        "{} {}-{} {}  {clock}",
        fixture.home_team.short_name,
        fixture.home_score,
        fixture.away_score,
        fixture.away_team.short_name,
    )
}

fn event_line(fixture: &Match, event: &MatchEvent) -> String {
    let kind = match event.kind {
        EventType::Goal => "GOAL",
        EventType::YellowCard => "YELLOW",
        EventType::RedCard => "RED",
        EventType::Substitution => "SUB",
        EventType::Foul => "FOUL",
        EventType::Shot => "SHOT",
    };
    let team = match event.team {
        TeamSide::Home => &fixture.home_team.short_name,
        TeamSide::Away => &fixture.away_team.short_name,
    };
    let mut line = format!("{:>3}' {kind:<6} {team} {}", event.minute, event.player);
    if let Some(assist) = &event.assist_player {
        let _ = write!(line, " (assist {assist})");
    }
    line
}

#[cfg(test)]
mod tests {
    use touchline_proto::Team;

    use super::*;

    fn fixture(status: MatchStatus, minute: u32) -> Match {
        let team = |name: &str| Team { id: None, name: name.into(), short_name: name.into(), logo: None };
        Match {
            id: "m1".into(),
            home_team: team("MAN"),
            away_team: team("LIV"),
            home_score: 2,
            away_score: 1,
            minute,
            status,
            start_time: String::new(),
            venue: None,
            round: None,
        }
    }

    #[test]
    fn scoreline_shows_clock_or_phase() {
        assert_eq!(scoreline(&fixture(MatchStatus::SecondHalf, 67)), "MAN 2-1 LIV  67'");
        assert_eq!(scoreline(&fixture(MatchStatus::HalfTime, 45)), "MAN 2-1 LIV  HT");
    }

    #[test]
    fn event_line_names_team_and_assist() {
        let event = MatchEvent {
            id: "e1".into(),
            kind: EventType::Goal,
            minute: 9,
            team: TeamSide::Away,
            player: "Salah".into(),
            assist_player: Some("Szoboszlai".into()),
            description: String::new(),
            timestamp: String::new(),
        };

        assert_eq!(
            event_line(&fixture(MatchStatus::FirstHalf, 9), &event),
            "  9' GOAL   LIV Salah (assist Szoboszlai)"
        );
    }
}

//! Domain records shared by the REST collaborator and the push feed.
//!
//! Field names follow the JSON contract (camelCase). Chat records keep the
//! server's naming on the wire (`matchId`, `message`) but expose room/text
//! names in Rust, since chat rooms are not always matches (the lobby room).

use serde::{Deserialize, Serialize};

/// Match identifier. Also the room id of its score feed.
pub type MatchId = String;

/// Chat room identifier.
pub type RoomId = String;

/// Locally generated user identifier.
pub type UserId = String;

/// Match phase as pushed by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchStatus {
    /// Kick-off has not happened
    NotStarted,
    /// First half in play
    FirstHalf,
    /// Half-time break
    HalfTime,
    /// Second half in play
    SecondHalf,
    /// Final whistle
    FullTime,
}

impl MatchStatus {
    /// Ball is in play (either half).
    pub fn is_live(self) -> bool {
        matches!(self, Self::FirstHalf | Self::SecondHalf)
    }
}

/// Kind of timeline event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    /// Goal scored
    Goal,
    /// Yellow card shown
    YellowCard,
    /// Red card shown
    RedCard,
    /// Player substituted
    Substitution,
    /// Foul committed
    Foul,
    /// Shot attempted
    Shot,
}

/// Which side of the fixture an event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TeamSide {
    /// Home team
    Home,
    /// Away team
    Away,
}

/// A club. Immutable for the life of a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    /// Team id, absent in some listings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Full name
    pub name: String,
    /// Three-letter abbreviation
    pub short_name: String,
    /// Crest URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
}

/// Listing record for one fixture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Match {
    /// Match id
    pub id: MatchId,
    /// Home side
    pub home_team: Team,
    /// Away side
    pub away_team: Team,
    /// Home goals
    pub home_score: u32,
    /// Away goals
    pub away_score: u32,
    /// Match clock in minutes
    #[serde(default)]
    pub minute: u32,
    /// Current phase
    pub status: MatchStatus,
    /// Kick-off time, ISO-8601
    pub start_time: String,
    /// Stadium
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub venue: Option<String>,
    /// League round
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub round: Option<u32>,
}

/// One entry of a match timeline. Immutable once received.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchEvent {
    /// Event id
    pub id: String,
    /// Event kind
    #[serde(rename = "type")]
    pub kind: EventType,
    /// Match minute the event happened in
    pub minute: u32,
    /// Side the event is credited to
    pub team: TeamSide,
    /// Main player
    pub player: String,
    /// Assisting player, goals only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assist_player: Option<String>,
    /// Free-text description
    pub description: String,
    /// Server timestamp, ISO-8601
    pub timestamp: String,
}

/// Home/away counter pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatPair {
    /// Home value
    pub home: u32,
    /// Away value
    pub away: u32,
}

/// Match statistics. Replaced wholesale on every update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchStatistics {
    /// Ball possession, percent
    pub possession: StatPair,
    /// Total shots
    pub shots: StatPair,
    /// Shots on target
    pub shots_on_target: StatPair,
    /// Corner kicks
    pub corners: StatPair,
    /// Fouls committed
    pub fouls: StatPair,
    /// Yellow cards
    pub yellow_cards: StatPair,
    /// Red cards
    pub red_cards: StatPair,
}

/// Detail record: a match plus its timeline and statistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailedMatch {
    /// Listing fields
    #[serde(flatten)]
    pub summary: Match,
    /// Timeline in arrival order
    #[serde(default)]
    pub events: Vec<MatchEvent>,
    /// Latest statistics
    #[serde(default)]
    pub statistics: MatchStatistics,
}

/// A chat line. Immutable once received.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    /// Message id
    pub id: String,
    /// Room the message was posted in
    #[serde(rename = "matchId")]
    pub room_id: RoomId,
    /// Author id
    pub user_id: UserId,
    /// Author display name
    pub username: String,
    /// Message body
    #[serde(rename = "message")]
    pub text: String,
    /// Server timestamp, ISO-8601
    pub timestamp: String,
}

/// Typing notification for one user in one room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypingIndicator {
    /// Room the user is typing in
    #[serde(rename = "matchId")]
    pub room_id: RoomId,
    /// Typing user
    pub user_id: UserId,
    /// Typing user's display name
    pub username: String,
    /// Start (`true`) or stop (`false`)
    pub is_typing: bool,
}

/// Envelope of every REST response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    /// Request outcome
    pub success: bool,
    /// Response body
    pub data: T,
}

/// Body of the match listing endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchesResponse {
    /// Listed fixtures
    pub matches: Vec<Match>,
    /// Total fixtures known to the server
    #[serde(default)]
    pub total: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detailed_match_parses_listing_shape() {
        let body = r#"{
            "id": "match_001",
            "homeTeam": {"name": "Manchester United", "shortName": "MAN", "logo": "x"},
            "awayTeam": {"name": "Liverpool", "shortName": "LIV"},
            "homeScore": 2,
            "awayScore": 1,
            "status": "FIRST_HALF",
            "startTime": "2025-01-01T15:00:00Z",
            "venue": "Old Trafford",
            "round": 28,
            "events": [{
                "id": "e1", "type": "GOAL", "minute": 12, "team": "home",
                "player": "Rashford", "assistPlayer": "Fernandes",
                "description": "Header", "timestamp": "2025-01-01T15:12:00Z"
            }]
        }"#;

        let detail: DetailedMatch = serde_json::from_str(body).unwrap();
        assert_eq!(detail.summary.minute, 0);
        assert_eq!(detail.summary.status, MatchStatus::FirstHalf);
        assert_eq!(detail.summary.venue.as_deref(), Some("Old Trafford"));
        assert_eq!(detail.events[0].kind, EventType::Goal);
        assert_eq!(detail.events[0].assist_player.as_deref(), Some("Fernandes"));
        assert_eq!(detail.statistics, MatchStatistics::default());
    }

    #[test]
    fn chat_message_uses_wire_names() {
        let message = ChatMessage {
            id: "c1".into(),
            room_id: "lobby".into(),
            user_id: "u1".into(),
            username: "Fan7".into(),
            text: "hi".into(),
            timestamp: "t".into(),
        };

        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(value["matchId"], "lobby");
        assert_eq!(value["message"], "hi");
        assert_eq!(value["userId"], "u1");
    }

    #[test]
    fn only_halves_are_live() {
        assert!(MatchStatus::FirstHalf.is_live());
        assert!(MatchStatus::SecondHalf.is_live());
        assert!(!MatchStatus::HalfTime.is_live());
        assert!(!MatchStatus::NotStarted.is_live());
        assert!(!MatchStatus::FullTime.is_live());
    }
}

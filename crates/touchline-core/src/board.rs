//! Match board reducer.
//!
//! Keeps the listing of fixtures current from score and status pushes and
//! exposes the filtered view with per-filter counts.

use std::{fmt, str::FromStr};

use touchline_proto::{Match, MatchStatus, ScoreUpdate, ServerEvent, StatusChange};

use crate::error::FilterParseError;

/// Listing filter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum BoardFilter {
    /// Every fixture
    #[default]
    All,
    /// Ball in play (either half)
    Live,
    /// Not kicked off yet
    Upcoming,
    /// Final whistle blown
    Finished,
}

impl BoardFilter {
    /// Every filter in display order.
    pub const ALL: [Self; 4] = [Self::All, Self::Live, Self::Upcoming, Self::Finished];

    /// Whether `fixture` passes this filter.
    pub fn admits(self, fixture: &Match) -> bool {
        match self {
            Self::All => true,
            Self::Live => fixture.status.is_live(),
            Self::Upcoming => fixture.status == MatchStatus::NotStarted,
            Self::Finished => fixture.status == MatchStatus::FullTime,
        }
    }

    /// Lowercase name, as accepted by [`FromStr`].
    pub fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Live => "live",
            Self::Upcoming => "upcoming",
            Self::Finished => "finished",
        }
    }
}

impl fmt::Display for BoardFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BoardFilter {
    type Err = FilterParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|filter| filter.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| FilterParseError(s.to_string()))
    }
}

/// Number of fixtures passing each filter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BoardCounts {
    /// Every fixture
    pub all: usize,
    /// Live fixtures
    pub live: usize,
    /// Upcoming fixtures
    pub upcoming: usize,
    /// Finished fixtures
    pub finished: usize,
}

/// Live listing of fixtures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchBoard {
    matches: Vec<Match>,
    filter: BoardFilter,
}

impl MatchBoard {
    /// Start from the fetched listing.
    pub fn new(matches: Vec<Match>) -> Self {
        Self { matches, filter: BoardFilter::All }
    }

    /// Every listed fixture in listing order.
    pub fn matches(&self) -> &[Match] {
        &self.matches
    }

    /// Ids of the listed fixtures.
    pub fn match_ids(&self) -> impl Iterator<Item = &str> {
        self.matches.iter().map(|fixture| fixture.id.as_str())
    }

    /// Active filter.
    pub fn filter(&self) -> BoardFilter {
        self.filter
    }

    /// Change the active filter. Returns `true` if it changed.
    pub fn set_filter(&mut self, filter: BoardFilter) -> bool {
        let changed = self.filter != filter;
        self.filter = filter;
        changed
    }

    /// Fixtures passing the active filter.
    pub fn visible(&self) -> impl Iterator<Item = &Match> {
        self.matches.iter().filter(|fixture| self.filter.admits(fixture))
    }

    /// Per-filter counts.
    pub fn counts(&self) -> BoardCounts {
        let count = |filter: BoardFilter| self.matches.iter().filter(|m| filter.admits(m)).count();
        BoardCounts {
            all: self.matches.len(),
            live: count(BoardFilter::Live),
            upcoming: count(BoardFilter::Upcoming),
            finished: count(BoardFilter::Finished),
        }
    }

    /// Apply any server push. Returns `true` if a listed fixture changed.
    pub fn apply(&mut self, event: &ServerEvent) -> bool {
        match event {
            ServerEvent::ScoreUpdate(update) => self.apply_score_update(update),
            ServerEvent::StatusChange(change) => self.apply_status_change(change),
            _ => false,
        }
    }

    /// Replace the score of a listed fixture.
    pub fn apply_score_update(&mut self, update: &ScoreUpdate) -> bool {
        let Some(fixture) = self.find_mut(&update.match_id) else { return false };
        fixture.home_score = update.home_score;
        fixture.away_score = update.away_score;
        true
    }

    /// Replace status and minute of a listed fixture.
    pub fn apply_status_change(&mut self, change: &StatusChange) -> bool {
        let Some(fixture) = self.find_mut(&change.match_id) else { return false };
        fixture.status = change.status;
        fixture.minute = change.minute;
        true
    }

    fn find_mut(&mut self, match_id: &str) -> Option<&mut Match> {
        self.matches.iter_mut().find(|fixture| fixture.id == match_id)
    }
}

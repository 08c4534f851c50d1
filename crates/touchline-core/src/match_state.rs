//! Match detail reducer.
//!
//! Applies pushed score, status, timeline and statistics deltas onto one
//! [`DetailedMatch`]. Every operation is keyed by match id and ignores
//! messages for other matches. Status values are accepted as pushed; the
//! client does not validate phase transitions.

use std::collections::HashSet;

use touchline_proto::{
    DetailedMatch, MatchEvent, MatchEventPush, ScoreUpdate, ServerEvent, StatsUpdate, StatusChange,
};

/// In-memory state of one observed match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchSnapshot {
    detail: DetailedMatch,
    /// Ids already in the timeline
    seen: HashSet<String>,
}

impl MatchSnapshot {
    /// Start from the initial detail fetch.
    ///
    /// Duplicate ids in the fetched timeline keep their first occurrence.
    pub fn new(mut detail: DetailedMatch) -> Self {
        let mut seen = HashSet::with_capacity(detail.events.len());
        detail.events.retain(|event| seen.insert(event.id.clone()));
        Self { detail, seen }
    }

    /// Observed match id.
    pub fn id(&self) -> &str {
        &self.detail.summary.id
    }

    /// Current state.
    pub fn detail(&self) -> &DetailedMatch {
        &self.detail
    }

    /// Timeline in arrival order.
    pub fn events(&self) -> &[MatchEvent] {
        &self.detail.events
    }

    /// Timeline in display order: minute descending, ties in arrival order.
    pub fn timeline(&self) -> Vec<&MatchEvent> {
        let mut events: Vec<&MatchEvent> = self.detail.events.iter().collect();
        events.sort_by(|a, b| b.minute.cmp(&a.minute));
        events
    }

    /// Apply any server push. Returns `true` if the snapshot changed.
    pub fn apply(&mut self, event: &ServerEvent) -> bool {
        match event {
            ServerEvent::ScoreUpdate(update) => self.apply_score_update(update),
            ServerEvent::StatusChange(change) => self.apply_status_change(change),
            ServerEvent::MatchEvent(push) => self.apply_match_event(push),
            ServerEvent::StatsUpdate(update) => self.apply_stats_update(update),
            ServerEvent::ChatMessage(_) | ServerEvent::TypingIndicator(_) => false,
        }
    }

    /// Replace both score fields.
    pub fn apply_score_update(&mut self, update: &ScoreUpdate) -> bool {
        if !self.observes(&update.match_id) {
            return false;
        }
        self.detail.summary.home_score = update.home_score;
        self.detail.summary.away_score = update.away_score;
        true
    }

    /// Replace status and minute.
    pub fn apply_status_change(&mut self, change: &StatusChange) -> bool {
        if !self.observes(&change.match_id) {
            return false;
        }
        self.detail.summary.status = change.status;
        self.detail.summary.minute = change.minute;
        true
    }

    /// Append a timeline event. A redelivered id is ignored.
    pub fn apply_match_event(&mut self, push: &MatchEventPush) -> bool {
        if !self.observes(&push.match_id) {
            return false;
        }
        if !self.seen.insert(push.event.id.clone()) {
            tracing::debug!(match_id = %push.match_id, event_id = %push.event.id, "duplicate event");
            return false;
        }
        self.detail.events.push(push.event.clone());
        true
    }

    /// Replace the statistics record wholesale.
    pub fn apply_stats_update(&mut self, update: &StatsUpdate) -> bool {
        if !self.observes(&update.match_id) {
            return false;
        }
        self.detail.statistics = update.statistics.clone();
        true
    }

    fn observes(&self, match_id: &str) -> bool {
        self.detail.summary.id == match_id
    }
}

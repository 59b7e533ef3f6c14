//! Per-match timeline: filter, dedup, order, truncate, split by side.
//!
//! Upstream repeats events with drifting tags and spellings. Two entries
//! without an upstream id are the same event when side, minute, kind and
//! player agree after normalization. The first one seen wins.

use std::collections::HashSet;

use serde::Deserialize;

use crate::normalize::{casefold, event_kind, parse_minute, player_name, resolve_side};
use crate::types::{MatchEvent, Side};

/// Which events a timeline shows. Call sites disagree on this, so every
/// knob is explicit.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct TimelinePolicy {
    #[serde(default = "default_true")]
    pub exclude_substitutions: bool,
    #[serde(default = "default_true")]
    pub exclude_yellow_cards: bool,
    /// Display filter: drop events whose normalized player is empty.
    #[serde(default = "default_true")]
    pub require_player: bool,
    #[serde(default)]
    pub require_minute: bool,
    /// Keep at most this many events after ordering.
    #[serde(default)]
    pub limit: Option<usize>,
}

impl Default for TimelinePolicy {
    fn default() -> Self {
        Self {
            exclude_substitutions: true,
            exclude_yellow_cards: true,
            require_player: true,
            require_minute: false,
            limit: None,
        }
    }
}

fn default_true() -> bool {
    true
}

impl TimelinePolicy {
    /// Everything passes, nothing is truncated.
    pub fn permissive() -> Self {
        Self {
            exclude_substitutions: false,
            exclude_yellow_cards: false,
            require_player: false,
            require_minute: false,
            limit: None,
        }
    }

    pub fn admits(&self, e: &MatchEvent) -> bool {
        let kind = event_kind(e.kind.as_deref().unwrap_or_default());
        if self.exclude_substitutions && kind.contains("SUB") {
            return false;
        }
        if self.exclude_yellow_cards && kind.contains("YELLOW") {
            return false;
        }
        let minute = e.minute_raw.as_deref().unwrap_or_default();
        if self.require_minute && minute.trim().is_empty() {
            return false;
        }
        if self.require_player && !has_player(e) {
            return false;
        }
        true
    }

    pub fn apply<'a>(&self, events: &'a [MatchEvent]) -> Vec<&'a MatchEvent> {
        dedup_sorted(events, |e| self.admits(e), self.limit)
    }

    pub fn split<'a>(&self, events: &'a [MatchEvent]) -> SideBuckets<'a> {
        partition_by_side(self.apply(events))
    }
}

pub fn has_player(e: &MatchEvent) -> bool {
    !player_name(e.player.as_deref().unwrap_or_default()).is_empty()
}

pub fn event_minute(e: &MatchEvent) -> f64 {
    parse_minute(e.minute_raw.as_deref().unwrap_or_default())
}

/// Upstream id when present, else `side|minute|kind|player` in normalized form.
pub fn dedup_key(e: &MatchEvent) -> String {
    if let Some(id) = e.id.as_deref().map(str::trim).filter(|id| !id.is_empty()) {
        return format!("id:{id}");
    }
    format!(
        "ev:{}|{}|{}|{}",
        casefold(e.side.as_deref().unwrap_or_default()),
        event_minute(e),
        event_kind(e.kind.as_deref().unwrap_or_default()),
        player_name(e.player.as_deref().unwrap_or_default()),
    )
}

/// Filters with `keep`, drops repeated keys (first seen wins), orders most
/// recent first and truncates to `limit`. Equal minutes keep input order.
pub fn dedup_sorted<'a, F>(
    events: &'a [MatchEvent],
    keep: F,
    limit: Option<usize>,
) -> Vec<&'a MatchEvent>
where
    F: Fn(&MatchEvent) -> bool,
{
    let mut seen: HashSet<String> = HashSet::new();
    let mut out: Vec<&MatchEvent> = events
        .iter()
        .filter(|e| keep(*e))
        .filter(|e| seen.insert(dedup_key(*e)))
        .collect();

    out.sort_by(|a, b| event_minute(b).total_cmp(&event_minute(a)));

    if let Some(limit) = limit {
        out.truncate(limit);
    }
    out
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SideBuckets<'a> {
    pub home: Vec<&'a MatchEvent>,
    pub away: Vec<&'a MatchEvent>,
    pub unknown: Vec<&'a MatchEvent>,
}

impl SideBuckets<'_> {
    pub fn is_empty(&self) -> bool {
        self.home.is_empty() && self.away.is_empty() && self.unknown.is_empty()
    }

    pub fn len(&self) -> usize {
        self.home.len() + self.away.len() + self.unknown.len()
    }
}

/// Splits an ordered timeline by side without reordering inside a bucket.
pub fn partition_by_side<'a>(events: Vec<&'a MatchEvent>) -> SideBuckets<'a> {
    let mut buckets = SideBuckets::default();
    for e in events {
        match resolve_side(e.side.as_deref().unwrap_or_default()) {
            Side::Home => buckets.home.push(e),
            Side::Away => buckets.away.push(e),
            Side::Unknown => buckets.unknown.push(e),
        }
    }
    buckets
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ev(side: &str, minute: &str, kind: &str, player: &str) -> MatchEvent {
        MatchEvent {
            id: None,
            kind: Some(kind.to_string()),
            minute_raw: Some(minute.to_string()),
            player: Some(player.to_string()),
            side: Some(side.to_string()),
        }
    }

    fn with_id(mut e: MatchEvent, id: &str) -> MatchEvent {
        e.id = Some(id.to_string());
        e
    }

    #[test]
    fn near_duplicates_collapse_first_seen() {
        let events = vec![
            ev("home", "12'", "goal", "J. Smith"),
            ev("HOME", "12", " GOAL ", "j smith"),
            ev("home", "12", "GOAL", "J.Smith"),
        ];
        let out = dedup_sorted(&events, |_| true, None);
        assert_eq!(out.len(), 1);
        assert!(std::ptr::eq(out[0], &events[0]));
    }

    #[test]
    fn upstream_id_wins_over_content() {
        let events = vec![
            with_id(ev("home", "12", "GOAL", "Smith"), "a"),
            with_id(ev("home", "12", "GOAL", "Smith"), "b"),
            with_id(ev("away", "80", "RED", "Jones"), "a"),
        ];
        let out = dedup_sorted(&events, |_| true, None);
        assert_eq!(out.len(), 2);
        assert!(std::ptr::eq(out[0], &events[0]));
        assert!(std::ptr::eq(out[1], &events[1]));
    }

    #[test]
    fn blank_id_falls_back_to_content_key() {
        let events = vec![
            with_id(ev("home", "12", "GOAL", "Smith"), " "),
            ev("home", "12", "GOAL", "Smith"),
        ];
        assert_eq!(dedup_sorted(&events, |_| true, None).len(), 1);
    }

    #[test]
    fn orders_most_recent_first_with_stable_ties() {
        let events = vec![
            ev("home", "10", "GOAL", "A"),
            ev("away", "45+2", "RED", "B"),
            ev("home", "46", "GOAL", "C"),
            ev("away", "45", "GOAL", "D"),
            ev("home", "", "GOAL", "E"),
            ev("away", "10", "GOAL", "F"),
        ];
        let out = dedup_sorted(&events, |_| true, None);
        let players: Vec<&str> = out.iter().filter_map(|e| e.player.as_deref()).collect();
        assert_eq!(players, vec!["E", "C", "B", "D", "A", "F"]);
        for pair in out.windows(2) {
            assert!(event_minute(pair[0]) >= event_minute(pair[1]));
        }
    }

    #[test]
    fn truncates_after_ordering() {
        let events = vec![
            ev("home", "5", "GOAL", "A"),
            ev("home", "50", "GOAL", "B"),
            ev("home", "70", "GOAL", "C"),
        ];
        let out = dedup_sorted(&events, |_| true, Some(2));
        let players: Vec<&str> = out.iter().filter_map(|e| e.player.as_deref()).collect();
        assert_eq!(players, vec!["C", "B"]);
    }

    #[test]
    fn default_policy_drops_subs_yellows_and_anonymous() {
        let events = vec![
            ev("home", "10", "SUBSTITUTION", "A"),
            ev("home", "11", "YELLOW_CARD", "B"),
            ev("home", "12", "GOAL", "..."),
            ev("home", "13", "GOAL", "C"),
            ev("away", "14", "RED_CARD", "D"),
        ];
        let out = TimelinePolicy::default().apply(&events);
        let players: Vec<&str> = out.iter().filter_map(|e| e.player.as_deref()).collect();
        assert_eq!(players, vec!["D", "C"]);

        let all = TimelinePolicy::permissive().apply(&events);
        assert_eq!(all.len(), 5);
    }

    #[test]
    fn require_minute_drops_blank_minutes() {
        let policy = TimelinePolicy {
            require_minute: true,
            ..TimelinePolicy::permissive()
        };
        let events = vec![ev("home", " ", "GOAL", "A"), ev("home", "3", "GOAL", "B")];
        let out = policy.apply(&events);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].player.as_deref(), Some("B"));
    }

    #[test]
    fn anonymous_events_still_dedup_without_player_filter() {
        let events = vec![ev("home", "30", "GOAL", ""), ev("home", "30", "GOAL", "-")];
        let out = dedup_sorted(&events, |_| true, None);
        assert_eq!(out.len(), 1);
        assert!(!has_player(out[0]));
    }

    #[test]
    fn partition_keeps_bucket_order() {
        let events = vec![
            ev("h", "80", "GOAL", "A"),
            ev("visitor", "70", "GOAL", "B"),
            ev("??", "60", "GOAL", "C"),
            ev("local", "50", "GOAL", "D"),
            ev("team2", "40", "GOAL", "E"),
        ];
        let buckets = TimelinePolicy::permissive().split(&events);
        let names = |v: &Vec<&MatchEvent>| -> Vec<String> {
            v.iter().filter_map(|e| e.player.clone()).collect()
        };
        assert_eq!(names(&buckets.home), vec!["A", "D"]);
        assert_eq!(names(&buckets.away), vec!["B", "E"]);
        assert_eq!(names(&buckets.unknown), vec!["C"]);
        assert_eq!(buckets.len(), 5);
    }
}

//! Board data model.
//!
//! Wire payloads are loosely typed (ids arrive as numbers or strings, most
//! fields may be missing). Each domain type deserializes through a private
//! wire mirror so the rest of the crate only sees the canonical shape.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Deserialize;

use crate::json_util::{de_loose_string, de_object, de_object_list};

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum MatchStatus {
    NotStarted,
    Scheduled,
    InPlay,
    AddedTime,
    HalfTimeBreak,
    Finished,
    /// Unrecognized upstream status, kept verbatim.
    Other(String),
}

impl MatchStatus {
    /// `None` for an empty status, which is treated like an absent one.
    pub fn from_wire(raw: &str) -> Option<Self> {
        let status = match raw {
            "" => return None,
            "NOT STARTED" => MatchStatus::NotStarted,
            "SCHEDULED" => MatchStatus::Scheduled,
            "IN PLAY" => MatchStatus::InPlay,
            "ADDED TIME" => MatchStatus::AddedTime,
            "HALF TIME BREAK" => MatchStatus::HalfTimeBreak,
            "FINISHED" => MatchStatus::Finished,
            other => MatchStatus::Other(other.to_string()),
        };
        Some(status)
    }

    pub fn as_str(&self) -> &str {
        match self {
            MatchStatus::NotStarted => "NOT STARTED",
            MatchStatus::Scheduled => "SCHEDULED",
            MatchStatus::InPlay => "IN PLAY",
            MatchStatus::AddedTime => "ADDED TIME",
            MatchStatus::HalfTimeBreak => "HALF TIME BREAK",
            MatchStatus::Finished => "FINISHED",
            MatchStatus::Other(s) => s,
        }
    }

    /// Kickoff has not happened yet.
    pub fn is_upcoming(&self) -> bool {
        matches!(self, MatchStatus::NotStarted | MatchStatus::Scheduled)
    }

    pub fn is_in_play(&self) -> bool {
        matches!(self, MatchStatus::InPlay | MatchStatus::AddedTime)
    }
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct CompetitionRef {
    #[serde(default, deserialize_with = "de_loose_string")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "de_loose_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "de_loose_string")]
    pub country: Option<String>,
}

impl CompetitionRef {
    /// Identifier usable for a standings request, if any.
    pub fn resolvable_id(&self) -> Option<&str> {
        self.id.as_deref().map(str::trim).filter(|id| !id.is_empty())
    }

    /// Name usable as a group label; blank names count as missing.
    pub fn label(&self) -> Option<&str> {
        self.name.as_deref().filter(|name| !name.trim().is_empty())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct TeamRef {
    #[serde(default, deserialize_with = "de_loose_string")]
    pub name: Option<String>,
    #[serde(default, rename = "logo", deserialize_with = "de_loose_string")]
    pub logo_url: Option<String>,
}

/// One timeline entry as received. Upstream tagging is free text and may
/// repeat the same real-world event several times.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct MatchEvent {
    #[serde(default, deserialize_with = "de_loose_string")]
    pub id: Option<String>,
    #[serde(default, rename = "event", deserialize_with = "de_loose_string")]
    pub kind: Option<String>,
    #[serde(default, rename = "time", deserialize_with = "de_loose_string")]
    pub minute_raw: Option<String>,
    #[serde(default, deserialize_with = "de_loose_string")]
    pub player: Option<String>,
    #[serde(default, rename = "home_away", deserialize_with = "de_loose_string")]
    pub side: Option<String>,
}

/// One live match. Identity is `id`; a re-delivered match replaces the
/// previous record wholesale.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "WireMatch")]
pub struct MatchState {
    pub id: Option<String>,
    pub competition: Option<CompetitionRef>,
    pub status: Option<MatchStatus>,
    pub clock_minute: Option<String>,
    pub scheduled_time: Option<String>,
    pub home_team: TeamRef,
    pub away_team: TeamRef,
    pub score_text: Option<String>,
    pub timeline: Vec<MatchEvent>,
}

#[derive(Deserialize)]
struct WireMatch {
    #[serde(default, deserialize_with = "de_loose_string")]
    id: Option<String>,
    #[serde(default, deserialize_with = "de_loose_string")]
    scheduled: Option<String>,
    #[serde(default, deserialize_with = "de_loose_string")]
    status: Option<String>,
    #[serde(default, deserialize_with = "de_loose_string")]
    time: Option<String>,
    #[serde(default, deserialize_with = "de_object")]
    competition: Option<CompetitionRef>,
    #[serde(default, deserialize_with = "de_object")]
    home: Option<TeamRef>,
    #[serde(default, deserialize_with = "de_object")]
    away: Option<TeamRef>,
    #[serde(default, deserialize_with = "de_object")]
    scores: Option<WireScores>,
    #[serde(default, rename = "lastEvents", deserialize_with = "de_object_list")]
    last_events: Option<Vec<MatchEvent>>,
}

#[derive(Deserialize)]
struct WireScores {
    #[serde(default, deserialize_with = "de_loose_string")]
    score: Option<String>,
}

impl From<WireMatch> for MatchState {
    fn from(w: WireMatch) -> Self {
        Self {
            id: w.id,
            competition: w.competition,
            status: w.status.as_deref().and_then(MatchStatus::from_wire),
            clock_minute: w.time,
            scheduled_time: w.scheduled,
            home_team: w.home.unwrap_or_default(),
            away_team: w.away.unwrap_or_default(),
            score_text: w.scores.and_then(|s| s.score),
            timeline: w.last_events.unwrap_or_default(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Side {
    Home,
    Away,
    /// Unrecognized side tag; displayed in its own column.
    Unknown,
}

impl Side {
    pub const fn as_str(self) -> &'static str {
        match self {
            Side::Home => "home",
            Side::Away => "away",
            Side::Unknown => "unknown",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connected,
}

impl ConnectionState {
    pub const fn as_str(self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connected => "connected",
        }
    }
}

pub fn now_ms() -> u64 {
    let d = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    d.as_millis() as u64
}

//! Pure normalizers for loosely-typed upstream values.

use crate::types::Side;

/// Sort key for events whose minute cannot be read; sorts after every real minute.
pub const UNKNOWN_MINUTE: f64 = 999.0;

const MINUTE_MARK: char = '\'';

/// Trimmed, lowercased text for loose side/name comparisons.
pub fn casefold(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Trimmed, uppercased event tag; kind checks are substring tests on this form.
pub fn event_kind(raw: &str) -> String {
    raw.trim().to_uppercase()
}

/// Player name key: lowercase letters and digits separated by single spaces.
///
/// Periods and any other punctuation act as separators, so `J. Smith`,
/// `j smith` and `J.Smith` all become `j smith`.
pub fn player_name(raw: &str) -> String {
    let spaced: String = raw
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_alphabetic() || c.is_numeric() {
                c
            } else {
                ' '
            }
        })
        .collect();
    spaced.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Minute as a sort key.
///
/// One digit run reads as that minute. With two or more runs the second is
/// stoppage time and lands as a tenth: `45+2` is `45.2`, after `45` and
/// before `46`. No digits (or an unreadable number) gives [`UNKNOWN_MINUTE`].
pub fn parse_minute(raw: &str) -> f64 {
    let cleaned = raw.replacen(MINUTE_MARK, "", 1);
    let mut runs = cleaned
        .split(|c: char| !c.is_ascii_digit())
        .filter(|run| !run.is_empty());

    let Some(base) = runs.next().and_then(|run| run.parse::<f64>().ok()) else {
        return UNKNOWN_MINUTE;
    };
    let added = match runs.next() {
        Some(run) => match run.parse::<f64>() {
            Ok(v) => v,
            Err(_) => return UNKNOWN_MINUTE,
        },
        None => 0.0,
    };

    let minute = base + added / 10.0;
    if minute.is_finite() {
        minute
    } else {
        UNKNOWN_MINUTE
    }
}

pub fn resolve_side(raw: &str) -> Side {
    match casefold(raw).as_str() {
        "home" | "h" | "local" | "team1" => Side::Home,
        "away" | "a" | "visitor" | "team2" => Side::Away,
        _ => Side::Unknown,
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    Goal,
    YellowCard,
    RedCard,
    MissedPenalty,
    Substitution,
    Other,
}

impl EventKind {
    /// Classifies by substring on the uppercased tag. Precedence matters:
    /// `OWN_GOAL` is a goal, `YELLOW_RED` is a yellow card.
    pub fn classify(raw: &str) -> Self {
        let kind = event_kind(raw);
        if kind.contains("GOAL") {
            EventKind::Goal
        } else if kind.contains("YELLOW") {
            EventKind::YellowCard
        } else if kind.contains("RED") {
            EventKind::RedCard
        } else if kind.contains("MISSED_PENALTY") {
            EventKind::MissedPenalty
        } else if kind.contains("SUB") {
            EventKind::Substitution
        } else {
            EventKind::Other
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            EventKind::Goal => "goal",
            EventKind::YellowCard => "yellow",
            EventKind::RedCard => "red",
            EventKind::MissedPenalty => "missed_penalty",
            EventKind::Substitution => "sub",
            EventKind::Other => "other",
        }
    }
}

//! Status and score display text.

use crate::types::{MatchState, MatchStatus};

pub const NO_TIME: &str = "--:--";
pub const IN_PROGRESS: &str = "LIVE";
pub const HALF_TIME: &str = "HT";
pub const MATCH_ENDED: &str = "FT";
pub const UPCOMING: &str = "UPCOMING";
pub const DEFAULT_SCORE: &str = "0 : 0";
pub const HOME_FALLBACK: &str = "Home";
pub const AWAY_FALLBACK: &str = "Away";

/// Status line for a match. Total over every input combination.
pub fn status_label(
    status: Option<&MatchStatus>,
    clock_minute: Option<&str>,
    scheduled_time: Option<&str>,
) -> String {
    let Some(status) = status else {
        return scheduled_time.unwrap_or(NO_TIME).to_string();
    };
    match status {
        MatchStatus::InPlay | MatchStatus::AddedTime => match clock_minute {
            Some(minute) if !minute.is_empty() => format!("{minute}'"),
            _ => IN_PROGRESS.to_string(),
        },
        MatchStatus::HalfTimeBreak => HALF_TIME.to_string(),
        MatchStatus::Finished => MATCH_ENDED.to_string(),
        MatchStatus::NotStarted | MatchStatus::Scheduled => {
            scheduled_time.unwrap_or(UPCOMING).to_string()
        }
        MatchStatus::Other(raw) => raw.clone(),
    }
}

pub fn is_upcoming(status: Option<&MatchStatus>) -> bool {
    status.is_some_and(MatchStatus::is_upcoming)
}

/// Text for the score box: kickoff time for upcoming matches, otherwise the
/// upstream score. A missing score is shown as `0 : 0`, never inferred.
pub fn score_text(m: &MatchState) -> String {
    if is_upcoming(m.status.as_ref()) {
        return m.scheduled_time.as_deref().unwrap_or(NO_TIME).to_string();
    }
    m.score_text.as_deref().unwrap_or(DEFAULT_SCORE).to_string()
}

impl MatchState {
    pub fn status_label(&self) -> String {
        status_label(
            self.status.as_ref(),
            self.clock_minute.as_deref(),
            self.scheduled_time.as_deref(),
        )
    }

    pub fn score_display(&self) -> String {
        score_text(self)
    }

    pub fn home_name(&self) -> &str {
        team_name(self.home_team.name.as_deref(), HOME_FALLBACK)
    }

    pub fn away_name(&self) -> &str {
        team_name(self.away_team.name.as_deref(), AWAY_FALLBACK)
    }
}

fn team_name<'a>(name: Option<&'a str>, fallback: &'a str) -> &'a str {
    match name.map(str::trim) {
        Some(n) if !n.is_empty() => n,
        _ => fallback,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn other(s: &str) -> MatchStatus {
        MatchStatus::Other(s.to_string())
    }

    #[test]
    fn absent_status_uses_schedule() {
        assert_eq!(status_label(None, None, Some("18:00")), "18:00");
        assert_eq!(status_label(None, Some("12"), None), NO_TIME);
    }

    #[test]
    fn in_play_shows_minute() {
        assert_eq!(
            status_label(Some(&MatchStatus::InPlay), Some("67"), None),
            "67'"
        );
        assert_eq!(
            status_label(Some(&MatchStatus::AddedTime), Some("90+3"), Some("20:00")),
            "90+3'"
        );
        assert_eq!(
            status_label(Some(&MatchStatus::InPlay), None, Some("20:00")),
            IN_PROGRESS
        );
        assert_eq!(
            status_label(Some(&MatchStatus::InPlay), Some(""), None),
            IN_PROGRESS
        );
    }

    #[test]
    fn fixed_placeholders() {
        assert_eq!(
            status_label(Some(&MatchStatus::HalfTimeBreak), Some("45"), None),
            HALF_TIME
        );
        assert_eq!(
            status_label(Some(&MatchStatus::Finished), Some("90"), Some("18:00")),
            MATCH_ENDED
        );
    }

    #[test]
    fn upcoming_prefers_schedule() {
        assert_eq!(
            status_label(Some(&MatchStatus::NotStarted), None, Some("21:00")),
            "21:00"
        );
        assert_eq!(
            status_label(Some(&MatchStatus::Scheduled), None, None),
            UPCOMING
        );
    }

    #[test]
    fn unknown_status_passes_through() {
        assert_eq!(
            status_label(Some(&other("POSTPONED")), Some("10"), Some("18:00")),
            "POSTPONED"
        );
    }

    #[test]
    fn score_box() {
        let mut m = MatchState {
            status: Some(MatchStatus::Scheduled),
            scheduled_time: Some("18:00".to_string()),
            score_text: Some("2 : 1".to_string()),
            ..MatchState::default()
        };
        assert_eq!(score_text(&m), "18:00");

        m.scheduled_time = None;
        assert_eq!(score_text(&m), NO_TIME);

        m.status = Some(MatchStatus::InPlay);
        assert_eq!(score_text(&m), "2 : 1");

        m.score_text = None;
        assert_eq!(score_text(&m), DEFAULT_SCORE);

        m.status = None;
        assert_eq!(m.score_display(), DEFAULT_SCORE);
    }

    #[test]
    fn blank_team_names_fall_back() {
        let mut m = MatchState::default();
        m.home_team.name = Some("  ".to_string());
        m.away_team.name = Some("Lyon".to_string());
        assert_eq!(m.home_name(), HOME_FALLBACK);
        assert_eq!(m.away_name(), "Lyon");
    }
}

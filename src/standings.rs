//! Standings table extraction.
//!
//! Upstream tables come in several envelope shapes. Each shape is a
//! predicate/extractor pair tried in fixed precedence; the first that finds a
//! row array wins. Rows are then mapped field by field, each field taking the
//! first key that is present.

use std::fmt;

use serde_json::Value;

use crate::json_util::{first_present, lookup, parse_f64, raw_text};

pub const TEAM_FALLBACK: &str = "Team";
pub const MISSING_CELL: &str = "--";

type Extractor = for<'a> fn(&'a Value) -> Option<&'a [Value]>;

/// Envelope shapes in precedence order.
pub const EXTRACTORS: &[(&str, Extractor)] = &[
    ("bare_array", bare_array),
    ("table", table_field),
    ("response", response_field),
    ("standings", standings_field),
    ("data_table", data_table_field),
];

fn array_at<'a>(v: &'a Value, path: &[&str]) -> Option<&'a [Value]> {
    lookup(v, path)?.as_array().map(Vec::as_slice)
}

/// First inner array of an array-of-arrays.
fn first_inner(v: &Value) -> Option<&[Value]> {
    v.as_array()?.first()?.as_array().map(Vec::as_slice)
}

pub fn bare_array(v: &Value) -> Option<&[Value]> {
    v.as_array().map(Vec::as_slice)
}

pub fn table_field(v: &Value) -> Option<&[Value]> {
    array_at(v, &["table"])
}

/// `response[*].table`, else the first `response[*].league.standings[0]`.
pub fn response_field(v: &Value) -> Option<&[Value]> {
    let entries = array_at(v, &["response"])?;
    entries
        .iter()
        .find_map(|entry| array_at(entry, &["table"]))
        .or_else(|| {
            entries
                .iter()
                .find_map(|entry| lookup(entry, &["league", "standings"]).and_then(first_inner))
        })
}

pub fn standings_field(v: &Value) -> Option<&[Value]> {
    lookup(v, &["standings"]).and_then(first_inner)
}

pub fn data_table_field(v: &Value) -> Option<&[Value]> {
    array_at(v, &["data", "table"])
}

/// Row array and the name of the shape that produced it.
pub fn locate_rows(payload: &Value) -> Option<(&'static str, &[Value])> {
    EXTRACTORS
        .iter()
        .find_map(|(name, extract)| extract(payload).map(|rows| (*name, rows)))
}

/// One table cell: a parsed number, the upstream text when it did not parse,
/// or nothing at all.
#[derive(Clone, Debug, PartialEq)]
pub enum Cell {
    Number(f64),
    Raw(String),
    Missing,
}

impl Cell {
    pub fn from_value(v: Option<&Value>) -> Self {
        match v {
            None => Cell::Missing,
            Some(v) => match parse_f64(Some(v)) {
                Some(n) => Cell::Number(n),
                None => Cell::Raw(raw_text(v)),
            },
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Number(n) => Some(*n),
            Cell::Raw(_) | Cell::Missing => None,
        }
    }

    fn render(&self, number: impl Fn(f64) -> String) -> String {
        match self {
            Cell::Number(n) => number(*n),
            Cell::Raw(s) => s.clone(),
            Cell::Missing => MISSING_CELL.to_string(),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(format_number))
    }
}

/// Shortest decimal form: `12`, `1.5`, never `-0`.
pub fn format_number(n: f64) -> String {
    if n == 0.0 {
        return "0".to_string();
    }
    format!("{n}")
}

#[derive(Clone, Debug, PartialEq)]
pub struct StandingsRow {
    pub rank: Cell,
    pub team_name: String,
    pub points: Cell,
    pub played: Cell,
    pub goal_difference: Cell,
}

impl StandingsRow {
    pub fn rank_text(&self) -> String {
        self.rank.to_string()
    }

    pub fn points_text(&self) -> String {
        self.points.render(|n| format!("{}pts", format_number(n)))
    }

    pub fn played_text(&self) -> String {
        self.played.to_string()
    }

    pub fn goal_difference_text(&self) -> String {
        self.goal_difference.render(|n| {
            if n > 0.0 {
                format!("+{}", format_number(n))
            } else {
                format_number(n)
            }
        })
    }
}

/// Maps one upstream row. `index` is the row position, used as the rank when
/// no rank field is present.
pub fn map_row(row: &Value, index: usize) -> StandingsRow {
    let rank = match first_present(row, &[&["rank"], &["position"], &["rg"], &["place"]]) {
        Some(v) => Cell::from_value(Some(v)),
        None => Cell::Number((index + 1) as f64),
    };

    let team_name = first_present(
        row,
        &[&["team", "name"], &["club", "name"], &["teamName"], &["name"]],
    )
    .map(raw_text)
    .unwrap_or_else(|| TEAM_FALLBACK.to_string());

    let points = Cell::from_value(first_present(row, &[&["points"], &["pts"]]));

    let played = Cell::from_value(first_present(
        row,
        &[
            &["played"],
            &["matchesPlayed"],
            &["playedGames"],
            &["all", "played"],
        ],
    ));

    let goal_difference = match first_present(row, &[&["diff"], &["goalDiff"], &["goalsDiff"]]) {
        Some(v) => Cell::from_value(Some(v)),
        None => computed_difference(row, &["goals"])
            .or_else(|| computed_difference(row, &["all", "goals"]))
            .map(Cell::Number)
            .unwrap_or(Cell::Missing),
    };

    StandingsRow {
        rank,
        team_name,
        points,
        played,
        goal_difference,
    }
}

/// `for - against` under `base`, when both sides are numeric.
fn computed_difference(row: &Value, base: &[&str]) -> Option<f64> {
    let goals = lookup(row, base)?;
    let scored = parse_f64(lookup(goals, &["for"]))?;
    let conceded = parse_f64(lookup(goals, &["against"]))?;
    Some(scored - conceded)
}

/// Canonical rows for any payload. Unknown shapes give an empty table.
pub fn extract_rows(payload: &Value) -> Vec<StandingsRow> {
    let Some((_, rows)) = locate_rows(payload) else {
        return Vec::new();
    };
    rows.iter()
        .enumerate()
        .map(|(index, row)| map_row(row, index))
        .collect()
}

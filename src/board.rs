//! Live board aggregator.
//!
//! Holds exactly the latest full match array and the observed connection
//! state. Every delivery replaces the array; nothing is merged. The grouped
//! view is recomputed on each change and published on a watch channel.

use std::collections::HashMap;

use tokio::sync::watch;
use tracing::{debug, warn};

use crate::error::FeedError;
use crate::types::{CompetitionRef, ConnectionState, MatchState};

pub const OTHER_COMPETITION: &str = "Other";

/// Inputs to the aggregator, serialized onto one task in arrival order.
#[derive(Clone, Debug, PartialEq)]
pub enum FeedUpdate {
    /// Result of the cold-start snapshot fetch.
    Snapshot(Vec<MatchState>),
    /// The push channel reported it is open.
    Connected,
    /// Raw push payload: the full match array as JSON text.
    Message(String),
    /// The push channel failed; the transport reconnects on its own.
    ChannelError(String),
}

/// Outcome of applying one update.
#[derive(Clone, Debug, PartialEq)]
pub enum Applied {
    Replaced { matches: usize },
    ConnectionChanged(ConnectionState),
    Unchanged,
    /// Push payload did not parse; prior state kept.
    Dropped(FeedError),
    /// Update arrived after teardown.
    Ignored,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum GroupKey {
    Id(String),
    Name(String),
    Other,
}

impl GroupKey {
    pub fn of(competition: Option<&CompetitionRef>) -> Self {
        let Some(c) = competition else {
            return GroupKey::Other;
        };
        if let Some(id) = c.id.as_deref().filter(|id| !id.is_empty()) {
            return GroupKey::Id(id.to_string());
        }
        match c.label() {
            Some(name) => GroupKey::Name(name.to_string()),
            None => GroupKey::Other,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct CompetitionGroup {
    pub key: GroupKey,
    pub id: Option<String>,
    pub name: String,
    pub country: Option<String>,
    pub matches: Vec<MatchState>,
}

impl CompetitionGroup {
    /// Reference used to request this group's standings.
    pub fn competition(&self) -> CompetitionRef {
        CompetitionRef {
            id: self.id.clone(),
            name: Some(self.name.clone()),
            country: self.country.clone(),
        }
    }
}

/// Groups by competition in first-seen order. Within a group, matches are
/// ordered by scheduled time (plain string order, missing first), ties in
/// input order.
pub fn group_by_competition(matches: &[MatchState]) -> Vec<CompetitionGroup> {
    let mut index: HashMap<GroupKey, usize> = HashMap::new();
    let mut groups: Vec<CompetitionGroup> = Vec::new();

    for m in matches {
        let key = GroupKey::of(m.competition.as_ref());
        let slot = *index.entry(key.clone()).or_insert_with(|| {
            let c = m.competition.clone().unwrap_or_default();
            let name = c.label().unwrap_or(OTHER_COMPETITION).to_string();
            groups.push(CompetitionGroup {
                key,
                id: c.id.filter(|id| !id.is_empty()),
                name,
                country: c.country,
                matches: Vec::new(),
            });
            groups.len() - 1
        });
        groups[slot].matches.push(m.clone());
    }

    for g in &mut groups {
        g.matches.sort_by(|a, b| {
            let a = a.scheduled_time.as_deref().unwrap_or_default();
            let b = b.scheduled_time.as_deref().unwrap_or_default();
            a.cmp(b)
        });
    }
    groups
}

/// What consumers observe.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BoardView {
    pub connection: ConnectionState,
    pub matches: Vec<MatchState>,
    pub groups: Vec<CompetitionGroup>,
}

pub struct LiveBoard {
    connection: ConnectionState,
    matches: Vec<MatchState>,
    view_tx: watch::Sender<BoardView>,
    torn_down: bool,
}

impl Default for LiveBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl LiveBoard {
    pub fn new() -> Self {
        let (view_tx, _) = watch::channel(BoardView::default());
        Self {
            connection: ConnectionState::Disconnected,
            matches: Vec::new(),
            view_tx,
            torn_down: false,
        }
    }

    /// Receivers see every published view until the board is dropped.
    pub fn subscribe(&self) -> watch::Receiver<BoardView> {
        self.view_tx.subscribe()
    }

    pub fn view(&self) -> BoardView {
        self.view_tx.borrow().clone()
    }

    pub fn connection(&self) -> ConnectionState {
        self.connection
    }

    pub fn matches(&self) -> &[MatchState] {
        &self.matches
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    /// After teardown no update mutates observable state.
    pub fn teardown(&mut self) {
        self.torn_down = true;
    }

    pub fn apply(&mut self, update: FeedUpdate) -> Applied {
        if self.torn_down {
            debug!("update after teardown ignored");
            return Applied::Ignored;
        }

        match update {
            FeedUpdate::Snapshot(matches) => {
                let n = matches.len();
                self.matches = matches;
                self.publish();
                Applied::Replaced { matches: n }
            }
            FeedUpdate::Connected => self.set_connection(ConnectionState::Connected),
            FeedUpdate::Message(raw) => match serde_json::from_str::<Vec<MatchState>>(&raw) {
                Ok(matches) => {
                    let n = matches.len();
                    self.matches = matches;
                    self.connection = ConnectionState::Connected;
                    self.publish();
                    Applied::Replaced { matches: n }
                }
                Err(e) => {
                    warn!(error = %e, bytes = raw.len(), "push message dropped");
                    Applied::Dropped(FeedError::from(e))
                }
            },
            FeedUpdate::ChannelError(reason) => {
                debug!(%reason, "push channel error");
                self.set_connection(ConnectionState::Disconnected)
            }
        }
    }

    fn set_connection(&mut self, state: ConnectionState) -> Applied {
        if self.connection == state {
            return Applied::Unchanged;
        }
        self.connection = state;
        self.publish();
        Applied::ConnectionChanged(state)
    }

    fn publish(&self) {
        let view = BoardView {
            connection: self.connection,
            matches: self.matches.clone(),
            groups: group_by_competition(&self.matches),
        };
        self.view_tx.send_replace(view);
    }
}

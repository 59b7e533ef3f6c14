//! Standings request lifecycle for the selected competition.
//!
//! One request at a time. Changing the selection aborts the pending task and
//! bumps a generation counter; a task only writes state while its generation
//! is still current, so late results from an old selection are discarded.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::FeedError;
use crate::standings::{extract_rows, StandingsRow};
use crate::types::CompetitionRef;

pub const ERROR_MESSAGE: &str = "standings unavailable right now";
pub const EMPTY_MESSAGE: &str = "no standings data";

/// Anything that can fetch a raw standings payload for a competition id.
pub trait StandingsSource: Send + Sync + 'static {
    fn fetch_standings(
        &self,
        competition_id: &str,
    ) -> impl Future<Output = Result<Value, FeedError>> + Send;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Extra attempts after an empty table.
    pub max_retries: u32,
    pub retry_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            retry_delay: Duration::from_secs(1),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RequestStatus {
    #[default]
    Idle,
    Loading,
    Error,
}

impl RequestStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            RequestStatus::Idle => "idle",
            RequestStatus::Loading => "loading",
            RequestStatus::Error => "error",
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct StandingsState {
    pub competition: Option<CompetitionRef>,
    pub status: RequestStatus,
    pub rows: Vec<StandingsRow>,
    /// Fetches completed for the current selection.
    pub attempts: u32,
    generation: u64,
}

impl StandingsState {
    /// Status line to show instead of the table, if any.
    pub fn message(&self) -> Option<&'static str> {
        match self.status {
            RequestStatus::Error => Some(ERROR_MESSAGE),
            RequestStatus::Idle if self.competition.is_some() && self.rows.is_empty() => {
                Some(EMPTY_MESSAGE)
            }
            RequestStatus::Idle | RequestStatus::Loading => None,
        }
    }

    pub fn is_settled(&self) -> bool {
        self.status != RequestStatus::Loading
    }
}

pub struct StandingsPanel<S> {
    source: Arc<S>,
    policy: RetryPolicy,
    state_tx: watch::Sender<StandingsState>,
    generation: u64,
    pending: Option<JoinHandle<()>>,
}

impl<S: StandingsSource> StandingsPanel<S> {
    pub fn new(source: Arc<S>, policy: RetryPolicy) -> Self {
        let (state_tx, _) = watch::channel(StandingsState::default());
        Self {
            source,
            policy,
            state_tx,
            generation: 0,
            pending: None,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<StandingsState> {
        self.state_tx.subscribe()
    }

    pub fn state(&self) -> StandingsState {
        self.state_tx.borrow().clone()
    }

    /// Switches the panel to `competition`, or clears it with `None`.
    ///
    /// Must be called from within a tokio runtime; the fetch runs as a task.
    pub fn select(&mut self, competition: Option<CompetitionRef>) {
        if let Some(pending) = self.pending.take() {
            pending.abort();
        }
        self.generation += 1;
        let generation = self.generation;

        let Some(competition) = competition else {
            self.state_tx.send_replace(StandingsState {
                generation,
                ..StandingsState::default()
            });
            return;
        };

        let Some(competition_id) = competition.resolvable_id().map(str::to_string) else {
            warn!(name = ?competition.name, "competition has no id; standings unavailable");
            self.state_tx.send_replace(StandingsState {
                competition: Some(competition),
                status: RequestStatus::Error,
                generation,
                ..StandingsState::default()
            });
            return;
        };

        debug!(%competition_id, generation, "standings requested");
        self.state_tx.send_replace(StandingsState {
            competition: Some(competition),
            status: RequestStatus::Loading,
            generation,
            ..StandingsState::default()
        });

        self.pending = Some(tokio::spawn(load_table(
            self.source.clone(),
            competition_id,
            self.policy,
            generation,
            self.state_tx.clone(),
        )));
    }

    pub fn clear(&mut self) {
        self.select(None);
    }

    /// Waits until the current selection leaves `Loading`.
    pub async fn settled(&self) -> StandingsState {
        let generation = self.generation;
        let mut rx = self.state_tx.subscribe();
        let res = rx
            .wait_for(|s| s.generation != generation || s.is_settled())
            .await
            .map(|s| s.clone());
        match res {
            Ok(state) => state,
            Err(_) => self.state(),
        }
    }
}

impl<S> Drop for StandingsPanel<S> {
    fn drop(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.abort();
        }
    }
}

/// Applies `f` only while `generation` is still the current selection.
fn update_if_current(
    state_tx: &watch::Sender<StandingsState>,
    generation: u64,
    f: impl FnOnce(&mut StandingsState),
) -> bool {
    state_tx.send_if_modified(|s| {
        if s.generation != generation {
            return false;
        }
        f(s);
        true
    })
}

async fn load_table<S: StandingsSource>(
    source: Arc<S>,
    competition_id: String,
    policy: RetryPolicy,
    generation: u64,
    state_tx: watch::Sender<StandingsState>,
) {
    let mut attempt: u32 = 0;
    loop {
        let res = source.fetch_standings(&competition_id).await;
        let attempts = attempt + 1;

        let payload = match res {
            Ok(v) => v,
            Err(e) => {
                warn!(%competition_id, attempts, error = %e, "standings fetch failed");
                update_if_current(&state_tx, generation, |s| {
                    s.status = RequestStatus::Error;
                    s.rows.clear();
                    s.attempts = attempts;
                });
                return;
            }
        };

        let rows = extract_rows(&payload);
        if rows.is_empty() && attempt < policy.max_retries {
            let still_current = update_if_current(&state_tx, generation, |s| {
                s.attempts = attempts;
            });
            if !still_current {
                return;
            }
            debug!(
                %competition_id,
                attempts,
                delay_ms = policy.retry_delay.as_millis() as u64,
                "empty standings; retrying"
            );
            tokio::time::sleep(policy.retry_delay).await;
            attempt += 1;
            continue;
        }

        info!(%competition_id, rows = rows.len(), attempts, "standings loaded");
        update_if_current(&state_tx, generation, |s| {
            s.status = RequestStatus::Idle;
            s.rows = rows;
            s.attempts = attempts;
        });
        return;
    }
}

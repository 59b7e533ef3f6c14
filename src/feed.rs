//! Feed client: cold-start snapshot plus push channel, funnelled into one
//! board task so updates apply strictly in arrival order.

use std::future::Future;
use std::sync::Arc;

use anyhow::Context as _;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::api::BoardApi;
use crate::board::{Applied, BoardView, FeedUpdate, LiveBoard};
use crate::config::Config;
use crate::error::FeedError;
use crate::health::HealthCounters;
use crate::live::run_live_channel;
use crate::recorder::{JsonlAppender, FILE_RAW_LIVE_JSONL};
use crate::shutdown;
use crate::types::{now_ms, MatchState};

const UPDATE_QUEUE: usize = 256;

/// Applies updates until shutdown is requested or every sender is gone, then
/// tears the board down and hands it back.
pub async fn run_board(
    mut board: LiveBoard,
    mut updates: mpsc::Receiver<FeedUpdate>,
    health: Arc<HealthCounters>,
    mut shutdown: watch::Receiver<bool>,
) -> LiveBoard {
    loop {
        let update = tokio::select! {
            biased;
            _ = shutdown::requested(&mut shutdown) => break,
            maybe = updates.recv() => match maybe {
                Some(u) => u,
                None => break,
            },
        };
        if shutdown::is_requested(&shutdown) {
            break;
        }

        let is_snapshot = matches!(update, FeedUpdate::Snapshot(_));
        match board.apply(update) {
            Applied::Replaced { matches } => {
                if is_snapshot {
                    health.inc_snapshots_applied(1);
                } else {
                    health.inc_push_applied(1);
                }
                health.set_last_update_ms(now_ms());
                debug!(matches, snapshot = is_snapshot, "board replaced");
            }
            Applied::ConnectionChanged(state) => {
                info!(connection = state.as_str(), "connection changed");
            }
            Applied::Dropped(_) => health.inc_push_dropped(1),
            Applied::Unchanged | Applied::Ignored => {}
        }
    }

    board.teardown();
    updates.close();
    board
}

/// Fetches the snapshot once and forwards it unless shutdown came first.
/// Failures are logged and absorbed; the push channel is the fallback.
pub async fn load_snapshot<F>(
    fetch: F,
    updates: mpsc::Sender<FeedUpdate>,
    health: Arc<HealthCounters>,
    mut shutdown: watch::Receiver<bool>,
) where
    F: Future<Output = Result<Vec<MatchState>, FeedError>>,
{
    let res = tokio::select! {
        res = fetch => res,
        _ = shutdown::requested(&mut shutdown) => return,
    };

    match res {
        Ok(matches) => {
            if shutdown::is_requested(&shutdown) {
                return;
            }
            info!(matches = matches.len(), "snapshot loaded");
            let _ = updates.send(FeedUpdate::Snapshot(matches)).await;
        }
        Err(e) => {
            health.inc_snapshot_failures(1);
            warn!(error = %e, "snapshot fetch failed; waiting for push channel");
        }
    }
}

pub struct FeedClient {
    view_rx: watch::Receiver<BoardView>,
    shutdown_tx: watch::Sender<bool>,
    board_task: Option<JoinHandle<LiveBoard>>,
    snapshot_task: Option<JoinHandle<()>>,
    live_task: Option<JoinHandle<anyhow::Result<()>>>,
}

impl FeedClient {
    /// Starts the snapshot fetch and the push channel concurrently.
    pub fn start(
        cfg: &Config,
        api: Arc<BoardApi>,
        health: Arc<HealthCounters>,
    ) -> anyhow::Result<Self> {
        let recorder = if cfg.run.record_raw {
            let path = cfg.run.data_dir.join(FILE_RAW_LIVE_JSONL);
            let out = JsonlAppender::open(&path)
                .with_context(|| format!("open {}", path.display()))?;
            info!(path = %path.display(), "recording raw push frames");
            Some(out)
        } else {
            None
        };

        let (tx, rx) = mpsc::channel::<FeedUpdate>(UPDATE_QUEUE);
        let (shutdown_tx, shutdown_rx) = shutdown::channel();

        let board = LiveBoard::new();
        let view_rx = board.subscribe();

        let board_task = tokio::spawn(run_board(
            board,
            rx,
            health.clone(),
            shutdown_rx.clone(),
        ));

        let snapshot_task = tokio::spawn(load_snapshot(
            async move { api.fetch_snapshot().await },
            tx.clone(),
            health.clone(),
            shutdown_rx.clone(),
        ));

        let live_task = tokio::spawn(run_live_channel(
            cfg.server.live_url(),
            cfg.live.clone(),
            tx,
            recorder,
            health,
            shutdown_rx,
        ));

        Ok(Self {
            view_rx,
            shutdown_tx,
            board_task: Some(board_task),
            snapshot_task: Some(snapshot_task),
            live_task: Some(live_task),
        })
    }

    pub fn subscribe(&self) -> watch::Receiver<BoardView> {
        self.view_rx.clone()
    }

    pub fn view(&self) -> BoardView {
        self.view_rx.borrow().clone()
    }

    /// Stops every task and waits for them. The last view stays readable
    /// through existing subscribers.
    pub async fn shutdown(mut self) -> anyhow::Result<()> {
        shutdown::request(&self.shutdown_tx);

        if let Some(h) = self.snapshot_task.take() {
            h.await.context("snapshot task join")?;
        }
        if let Some(h) = self.board_task.take() {
            let board = h.await.context("board task join")?;
            debug!(matches = board.matches().len(), "board torn down");
        }
        if let Some(h) = self.live_task.take() {
            h.await.context("live task join")??;
        }
        Ok(())
    }
}

impl Drop for FeedClient {
    fn drop(&mut self) {
        shutdown::request(&self.shutdown_tx);
    }
}

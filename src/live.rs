//! Push channel over WebSocket.
//!
//! Each text or binary frame carries the full match array. Frames are passed
//! through unparsed; the board task decides whether they are usable. The
//! transport owns reconnection with capped exponential backoff.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context as _};
use futures_util::{SinkExt as _, StreamExt as _};
use tokio::sync::{mpsc, watch};
use tokio::time::{Instant, Interval};
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

use crate::board::FeedUpdate;
use crate::config::LiveConfig;
use crate::health::HealthCounters;
use crate::recorder::{JsonlAppender, RawFrame};
use crate::shutdown;

enum Exit {
    Shutdown,
    /// The board task is gone; nobody is listening.
    ReceiverGone,
}

struct Disconnect {
    was_open: bool,
    error: anyhow::Error,
}

impl Disconnect {
    fn before_open(error: anyhow::Error) -> Self {
        Self {
            was_open: false,
            error,
        }
    }

    fn after_open(error: anyhow::Error) -> Self {
        Self {
            was_open: true,
            error,
        }
    }
}

/// Backoff doubling from `initial` up to `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    initial: Duration,
    max: Duration,
    current: Duration,
}

impl Backoff {
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self {
            initial,
            max,
            current: initial,
        }
    }

    pub fn from_config(cfg: &LiveConfig) -> Self {
        Self::new(
            Duration::from_millis(cfg.reconnect_initial_ms),
            Duration::from_millis(cfg.reconnect_max_ms),
        )
    }

    /// Delay to wait now; the next one doubles.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = (self.current * 2).min(self.max);
        delay
    }

    pub fn reset(&mut self) {
        self.current = self.initial;
    }
}

/// Runs the push channel until shutdown is requested or `updates` closes.
pub async fn run_live_channel(
    url: String,
    cfg: LiveConfig,
    updates: mpsc::Sender<FeedUpdate>,
    mut recorder: Option<JsonlAppender>,
    health: Arc<HealthCounters>,
    mut shutdown: watch::Receiver<bool>,
) -> anyhow::Result<()> {
    let mut backoff = Backoff::from_config(&cfg);

    loop {
        if shutdown::is_requested(&shutdown) {
            break;
        }
        let res = run_once(
            &url,
            &cfg,
            &updates,
            &mut recorder,
            &health,
            shutdown.clone(),
        )
        .await;

        match res {
            Ok(Exit::Shutdown) => break,
            Ok(Exit::ReceiverGone) => {
                debug!("board task closed; stopping live channel");
                break;
            }
            Err(Disconnect { was_open, error: e }) => {
                if was_open {
                    backoff.reset();
                }
                health.inc_channel_errors(1);
                if updates
                    .send(FeedUpdate::ChannelError(format!("{e:#}")))
                    .await
                    .is_err()
                {
                    break;
                }

                let delay = backoff.next_delay();
                error!(
                    error = %e,
                    backoff_ms = delay.as_millis() as u64,
                    "live channel error; reconnecting"
                );
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = shutdown::requested(&mut shutdown) => break,
                }
            }
        }
    }

    if let Some(mut out) = recorder {
        out.flush_and_sync()
            .with_context(|| format!("flush {}", out.path().display()))?;
    }
    Ok(())
}

async fn next_ping(ping: &mut Option<Interval>) {
    match ping {
        Some(i) => {
            i.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

async fn run_once(
    url: &str,
    cfg: &LiveConfig,
    updates: &mpsc::Sender<FeedUpdate>,
    recorder: &mut Option<JsonlAppender>,
    health: &HealthCounters,
    mut shutdown: watch::Receiver<bool>,
) -> Result<Exit, Disconnect> {
    info!(%url, "connecting live channel");
    let connect_timeout = Duration::from_millis(cfg.connect_timeout_ms);
    let connect = tokio::time::timeout(connect_timeout, tokio_tungstenite::connect_async(url));

    let ws = tokio::select! {
        res = connect => match res {
            Err(_) => {
                return Err(Disconnect::before_open(anyhow!(
                    "connect timed out after {}ms",
                    cfg.connect_timeout_ms
                )));
            }
            Ok(Err(e)) => {
                return Err(Disconnect::before_open(anyhow::Error::new(e).context("connect ws")));
            }
            Ok(Ok((ws, _))) => ws,
        },
        _ = shutdown::requested(&mut shutdown) => return Ok(Exit::Shutdown),
    };

    health.inc_connects(1);
    info!(%url, "live channel open");
    if updates.send(FeedUpdate::Connected).await.is_err() {
        return Ok(Exit::ReceiverGone);
    }

    let (mut sink, mut stream) = ws.split();

    let mut ping = (cfg.ping_interval_ms > 0).then(|| {
        let period = Duration::from_millis(cfg.ping_interval_ms);
        tokio::time::interval_at(Instant::now() + period, period)
    });

    loop {
        tokio::select! {
            _ = shutdown::requested(&mut shutdown) => {
                let _ = sink.send(Message::Close(None)).await;
                return Ok(Exit::Shutdown);
            }
            _ = next_ping(&mut ping) => {
                sink.send(Message::Ping(Default::default()))
                    .await
                    .context("send ping")
                    .map_err(Disconnect::after_open)?;
            }
            msg = stream.next() => {
                let Some(msg) = msg else {
                    return Err(Disconnect::after_open(anyhow!("ws stream ended")));
                };
                let msg = msg.context("ws read").map_err(Disconnect::after_open)?;
                let frame = match msg {
                    Message::Text(txt) => {
                        let txt: &str = &txt;
                        txt.to_owned()
                    }
                    Message::Binary(bin) => String::from_utf8_lossy(&bin).into_owned(),
                    Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => continue,
                    Message::Close(frame) => {
                        return Err(Disconnect::after_open(anyhow!("ws close: {frame:?}")));
                    }
                };

                if let Some(out) = recorder.as_mut() {
                    match out.write_record(&RawFrame::now(&frame)) {
                        Ok(()) => health.inc_frames_recorded(1),
                        Err(e) => warn!(error = %e, "raw frame write failed"),
                    }
                }

                if updates.send(FeedUpdate::Message(frame)).await.is_err() {
                    return Ok(Exit::ReceiverGone);
                }
            }
        }
    }
}

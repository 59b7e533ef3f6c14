use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::info;

use crate::types::now_ms;

#[derive(Default)]
pub struct HealthCounters {
    snapshots_applied: AtomicU64,
    snapshot_failures: AtomicU64,
    push_applied: AtomicU64,
    push_dropped: AtomicU64,
    channel_errors: AtomicU64,
    connects: AtomicU64,
    frames_recorded: AtomicU64,
    last_update_ms: AtomicU64,
}

impl HealthCounters {
    pub fn inc_snapshots_applied(&self, n: u64) {
        self.snapshots_applied.fetch_add(n, Ordering::Relaxed);
    }

    pub fn inc_snapshot_failures(&self, n: u64) {
        self.snapshot_failures.fetch_add(n, Ordering::Relaxed);
    }

    pub fn inc_push_applied(&self, n: u64) {
        self.push_applied.fetch_add(n, Ordering::Relaxed);
    }

    pub fn inc_push_dropped(&self, n: u64) {
        self.push_dropped.fetch_add(n, Ordering::Relaxed);
    }

    pub fn inc_channel_errors(&self, n: u64) {
        self.channel_errors.fetch_add(n, Ordering::Relaxed);
    }

    pub fn inc_connects(&self, n: u64) {
        self.connects.fetch_add(n, Ordering::Relaxed);
    }

    pub fn inc_frames_recorded(&self, n: u64) {
        self.frames_recorded.fetch_add(n, Ordering::Relaxed);
    }

    pub fn set_last_update_ms(&self, ts_ms: u64) {
        self.last_update_ms.store(ts_ms, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> HealthSnapshot {
        HealthSnapshot {
            ts_ms: now_ms(),
            snapshots_applied: self.snapshots_applied.load(Ordering::Relaxed),
            snapshot_failures: self.snapshot_failures.load(Ordering::Relaxed),
            push_applied: self.push_applied.load(Ordering::Relaxed),
            push_dropped: self.push_dropped.load(Ordering::Relaxed),
            channel_errors: self.channel_errors.load(Ordering::Relaxed),
            connects: self.connects.load(Ordering::Relaxed),
            frames_recorded: self.frames_recorded.load(Ordering::Relaxed),
            last_update_ms: self.last_update_ms.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HealthSnapshot {
    pub ts_ms: u64,
    pub snapshots_applied: u64,
    pub snapshot_failures: u64,
    pub push_applied: u64,
    pub push_dropped: u64,
    pub channel_errors: u64,
    pub connects: u64,
    pub frames_recorded: u64,
    pub last_update_ms: u64,
}

/// Logs a heartbeat line every `interval` until shutdown is requested or the
/// shutdown sender is dropped.
pub fn spawn_heartbeat(
    interval: Duration,
    counters: Arc<HealthCounters>,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(interval);
        // First tick is immediate.
        tick.tick().await;
        loop {
            tokio::select! {
                _ = crate::shutdown::requested(&mut shutdown) => break,
                _ = tick.tick() => {
                    let s = counters.snapshot();
                    info!(
                        snapshots_applied = s.snapshots_applied,
                        snapshot_failures = s.snapshot_failures,
                        push_applied = s.push_applied,
                        push_dropped = s.push_dropped,
                        channel_errors = s.channel_errors,
                        connects = s.connects,
                        frames_recorded = s.frames_recorded,
                        last_update_ms = s.last_update_ms,
                        "feed heartbeat"
                    );
                }
            }
        }
    })
}

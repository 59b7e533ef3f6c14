use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use livefoot::api::BoardApi;
use livefoot::board::BoardView;
use livefoot::config::Config;
use livefoot::feed::FeedClient;
use livefoot::health::{spawn_heartbeat, HealthCounters};
use livefoot::normalize::{event_kind, EventKind};
use livefoot::shutdown;
use livefoot::timeline::TimelinePolicy;
use livefoot::types::MatchEvent;

#[derive(Parser, Debug)]
#[command(name = "livefoot", version, about = "Live football board (read-only)")]
struct Args {
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = Args::parse();
    let cfg = Config::load(&args.config).context("load config")?;

    if cfg.run.record_raw {
        std::fs::create_dir_all(&cfg.run.data_dir).context("create data_dir")?;
    }

    info!(
        snapshot = %cfg.server.snapshot_url(),
        live = %cfg.server.live_url(),
        "starting board"
    );

    let api = Arc::new(BoardApi::new(cfg.server.clone())?);
    let health = Arc::new(HealthCounters::default());
    let client = FeedClient::start(&cfg, api, health.clone()).context("start feed")?;

    let (hb_tx, hb_rx) = shutdown::channel();
    let heartbeat = (cfg.run.heartbeat_interval_ms > 0).then(|| {
        spawn_heartbeat(
            Duration::from_millis(cfg.run.heartbeat_interval_ms),
            health.clone(),
            hb_rx,
        )
    });

    let mut views = client.subscribe();
    loop {
        tokio::select! {
            changed = views.changed() => {
                if changed.is_err() {
                    warn!("board closed");
                    break;
                }
                let view = views.borrow_and_update().clone();
                log_view(&view, &cfg.timeline);
            }
            _ = tokio::signal::ctrl_c() => {
                info!("ctrl-c received; shutting down");
                break;
            }
        }
    }

    client.shutdown().await?;
    shutdown::request(&hb_tx);
    if let Some(h) = heartbeat {
        h.await.context("heartbeat task join")?;
    }

    let s = health.snapshot();
    info!(
        snapshots_applied = s.snapshots_applied,
        push_applied = s.push_applied,
        push_dropped = s.push_dropped,
        channel_errors = s.channel_errors,
        "done"
    );
    Ok(())
}

fn log_view(view: &BoardView, policy: &TimelinePolicy) {
    info!(
        connection = view.connection.as_str(),
        competitions = view.groups.len(),
        matches = view.matches.len(),
        "board updated"
    );
    for group in &view.groups {
        info!(
            competition = %group.name,
            country = group.country.as_deref().unwrap_or_default(),
            matches = group.matches.len(),
            "competition"
        );
        for m in &group.matches {
            let buckets = policy.split(&m.timeline);
            info!(
                "  {:>6}  {} {} {}",
                m.status_label(),
                m.home_name(),
                m.score_display(),
                m.away_name()
            );
            for e in &buckets.home {
                info!("          {}", event_line(e));
            }
            for e in &buckets.away {
                info!("          {:>40}", event_line(e));
            }
            for e in &buckets.unknown {
                info!("          ? {}", event_line(e));
            }
        }
    }
}

fn event_line(e: &MatchEvent) -> String {
    let raw_kind = e.kind.as_deref().unwrap_or_default();
    let label = match EventKind::classify(raw_kind) {
        EventKind::Other => event_kind(raw_kind),
        kind => kind.as_str().to_string(),
    };
    let player = e.player.as_deref().map(str::trim).unwrap_or_default();
    match e.minute_raw.as_deref().map(str::trim).filter(|m| !m.is_empty()) {
        Some(minute) => format!("{}' {label} {player}", minute.trim_end_matches('\'')),
        None => format!("{label} {player}"),
    }
}

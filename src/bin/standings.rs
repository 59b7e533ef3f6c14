use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context as _;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use livefoot::api::BoardApi;
use livefoot::config::Config;
use livefoot::recorder::write_standings_csv;
use livefoot::standings_request::{RequestStatus, StandingsPanel};
use livefoot::types::CompetitionRef;

#[derive(Parser, Debug)]
#[command(
    name = "standings",
    version,
    about = "Print one competition's standings table"
)]
struct Args {
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    /// Competition id as used by the board service.
    #[arg(long)]
    competition: String,

    /// Title shown above the table.
    #[arg(long)]
    name: Option<String>,

    /// Also write the table as CSV to this path.
    #[arg(long)]
    csv: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = Args::parse();
    let cfg = Config::load(&args.config).context("load config")?;

    let api = Arc::new(BoardApi::new(cfg.server.clone())?);
    let mut panel = StandingsPanel::new(api, cfg.standings.retry_policy());

    let competition = CompetitionRef {
        id: Some(args.competition.clone()),
        name: args.name.clone(),
        country: None,
    };
    panel.select(Some(competition));
    let state = panel.settled().await;

    let title = args.name.as_deref().unwrap_or(args.competition.as_str());
    println!("{title}");

    if let Some(message) = state.message() {
        println!("{message}");
    }
    for row in &state.rows {
        println!(
            "{:>3}  {:<28} {:>3} {:>5} {:>7}",
            row.rank_text(),
            row.team_name,
            row.played_text(),
            row.goal_difference_text(),
            row.points_text()
        );
    }

    if let Some(path) = &args.csv {
        write_standings_csv(path, &state.rows)?;
        info!(path = %path.display(), rows = state.rows.len(), "standings csv written");
    }

    info!(
        status = state.status.as_str(),
        attempts = state.attempts,
        rows = state.rows.len(),
        "standings done"
    );
    if state.status == RequestStatus::Error {
        anyhow::bail!("standings unavailable for competition {}", args.competition);
    }
    Ok(())
}

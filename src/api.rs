use std::time::Duration;

use anyhow::Context as _;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::ServerConfig;
use crate::error::FeedError;
use crate::standings_request::StandingsSource;
use crate::types::MatchState;

/// HTTP client for the board service.
#[derive(Clone, Debug)]
pub struct BoardApi {
    client: reqwest::Client,
    server: ServerConfig,
}

impl BoardApi {
    pub fn new(server: ServerConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("livefoot/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_millis(server.http_timeout_ms))
            .connect_timeout(Duration::from_millis(server.http_connect_timeout_ms))
            .build()
            .context("build http client")?;
        Ok(Self { client, server })
    }

    pub fn server(&self) -> &ServerConfig {
        &self.server
    }

    async fn get_json(&self, url: &str) -> Result<Value, FeedError> {
        let resp = self.client.get(url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FeedError::Transport(format!("GET {url}: http {status}")));
        }
        let body = resp.text().await?;
        let v = serde_json::from_str(&body)?;
        Ok(v)
    }

    /// Full match list. A body that is valid JSON but not an array is
    /// treated as an empty board.
    pub async fn fetch_snapshot(&self) -> Result<Vec<MatchState>, FeedError> {
        let url = self.server.snapshot_url();
        let v = self.get_json(&url).await?;
        parse_snapshot(v)
    }

    /// Raw standings payload for `competition_id`, shape untouched.
    pub async fn fetch_table(&self, competition_id: &str) -> Result<Value, FeedError> {
        let url = self.server.table_url(competition_id);
        debug!(%url, "fetching standings");
        self.get_json(&url).await
    }
}

pub fn parse_snapshot(v: Value) -> Result<Vec<MatchState>, FeedError> {
    if !v.is_array() {
        warn!(kind = json_kind(&v), "snapshot body is not an array; treating as empty");
        return Ok(Vec::new());
    }
    let matches: Vec<MatchState> = serde_json::from_value(v)?;
    Ok(matches)
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

impl StandingsSource for BoardApi {
    async fn fetch_standings(&self, competition_id: &str) -> Result<Value, FeedError> {
        self.fetch_table(competition_id).await
    }
}

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context as _;
use serde::Deserialize;

use crate::standings_request::RetryPolicy;
use crate::timeline::TimelinePolicy;

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub live: LiveConfig,
    #[serde(default)]
    pub standings: StandingsConfig,
    #[serde(default)]
    pub timeline: TimelinePolicy,
    #[serde(default)]
    pub run: RunConfig,
}

impl Config {
    /// Reads and validates a TOML config. A missing file yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let cfg = if path.exists() {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("read config {}", path.display()))?;
            Self::from_toml(&raw).with_context(|| format!("parse config {}", path.display()))?
        } else {
            Self::default()
        };
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_toml(raw: &str) -> anyhow::Result<Self> {
        let cfg: Config = toml::from_str(raw)?;
        Ok(cfg)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        let base = self.server.base_url.trim();
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            anyhow::bail!(
                "invalid server.base_url={:?} (must start with http:// or https://)",
                self.server.base_url
            );
        }
        if !self.server.table_path.contains("{id}") {
            anyhow::bail!(
                "invalid server.table_path={:?} (must contain {{id}})",
                self.server.table_path
            );
        }
        if self.server.http_timeout_ms == 0 {
            anyhow::bail!("invalid server.http_timeout_ms=0 (must be > 0)");
        }
        if self.live.reconnect_initial_ms == 0 {
            anyhow::bail!("invalid live.reconnect_initial_ms=0 (must be > 0)");
        }
        if self.live.reconnect_max_ms < self.live.reconnect_initial_ms {
            anyhow::bail!(
                "invalid live.reconnect_max_ms={} must be >= reconnect_initial_ms={}",
                self.live.reconnect_max_ms,
                self.live.reconnect_initial_ms
            );
        }
        if self.live.connect_timeout_ms == 0 {
            anyhow::bail!("invalid live.connect_timeout_ms=0 (must be > 0)");
        }
        if self.timeline.limit == Some(0) {
            anyhow::bail!("invalid timeline.limit=0 (omit it to show every event)");
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_snapshot_path")]
    pub snapshot_path: String,
    #[serde(default = "default_live_path")]
    pub live_path: String,
    /// Standings endpoint; `{id}` is replaced by the competition id.
    #[serde(default = "default_table_path")]
    pub table_path: String,
    /// Default timeout applied to all HTTP requests (ms).
    #[serde(default = "default_http_timeout_ms")]
    pub http_timeout_ms: u64,
    /// TCP connect timeout for HTTP requests (ms).
    #[serde(default = "default_http_connect_timeout_ms")]
    pub http_connect_timeout_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            snapshot_path: default_snapshot_path(),
            live_path: default_live_path(),
            table_path: default_table_path(),
            http_timeout_ms: default_http_timeout_ms(),
            http_connect_timeout_ms: default_http_connect_timeout_ms(),
        }
    }
}

impl ServerConfig {
    fn base(&self) -> &str {
        self.base_url.trim().trim_end_matches('/')
    }

    pub fn snapshot_url(&self) -> String {
        format!("{}{}", self.base(), self.snapshot_path)
    }

    pub fn table_url(&self, competition_id: &str) -> String {
        format!(
            "{}{}",
            self.base(),
            self.table_path.replace("{id}", competition_id.trim())
        )
    }

    /// Push channel URL: the base URL with its scheme switched to ws/wss.
    pub fn live_url(&self) -> String {
        let base = self.base();
        let ws_base = if let Some(rest) = base.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = base.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            base.to_string()
        };
        format!("{ws_base}{}", self.live_path)
    }
}

fn default_base_url() -> String {
    "http://127.0.0.1:8080".to_string()
}

fn default_snapshot_path() -> String {
    "/api/stream/board".to_string()
}

fn default_live_path() -> String {
    "/api/stream/live".to_string()
}

fn default_table_path() -> String {
    "/api/stream/competitions/{id}/table".to_string()
}

fn default_http_timeout_ms() -> u64 {
    10_000
}

fn default_http_connect_timeout_ms() -> u64 {
    3_000
}

#[derive(Clone, Debug, Deserialize)]
pub struct LiveConfig {
    /// WebSocket connect timeout (ms).
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    #[serde(default = "default_reconnect_initial_ms")]
    pub reconnect_initial_ms: u64,
    #[serde(default = "default_reconnect_max_ms")]
    pub reconnect_max_ms: u64,
    /// Keepalive ping period (ms). `0` disables pings.
    #[serde(default = "default_ping_interval_ms")]
    pub ping_interval_ms: u64,
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: default_connect_timeout_ms(),
            reconnect_initial_ms: default_reconnect_initial_ms(),
            reconnect_max_ms: default_reconnect_max_ms(),
            ping_interval_ms: default_ping_interval_ms(),
        }
    }
}

fn default_connect_timeout_ms() -> u64 {
    10_000
}

fn default_reconnect_initial_ms() -> u64 {
    1_000
}

fn default_reconnect_max_ms() -> u64 {
    60_000
}

fn default_ping_interval_ms() -> u64 {
    15_000
}

#[derive(Clone, Debug, Deserialize)]
pub struct StandingsConfig {
    /// Extra attempts when a table comes back empty.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

impl Default for StandingsConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

impl StandingsConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            retry_delay: Duration::from_millis(self.retry_delay_ms),
        }
    }
}

fn default_max_retries() -> u32 {
    2
}

fn default_retry_delay_ms() -> u64 {
    1_000
}

#[derive(Clone, Debug, Deserialize)]
pub struct RunConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Append every raw push frame to `<data_dir>/raw_live.jsonl`.
    #[serde(default)]
    pub record_raw: bool,
    /// Health heartbeat log period (ms). `0` disables the heartbeat.
    #[serde(default = "default_heartbeat_interval_ms")]
    pub heartbeat_interval_ms: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            record_raw: false,
            heartbeat_interval_ms: default_heartbeat_interval_ms(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_heartbeat_interval_ms() -> u64 {
    30_000
}

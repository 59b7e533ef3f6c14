use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write as _};
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use serde::Serialize;

use crate::standings::StandingsRow;
use crate::types::now_ms;

pub const FILE_RAW_LIVE_JSONL: &str = "raw_live.jsonl";

pub const STANDINGS_HEADER: [&str; 5] = ["rank", "team", "played", "goal_difference", "points"];

const JSONL_FLUSH_EVERY_LINES: usize = 200;
const JSONL_FLUSH_EVERY_MS: u64 = 1_000;

/// Line-oriented append-only writer with batched flushes.
pub struct JsonlAppender {
    path: PathBuf,
    out: BufWriter<File>,
    pending_lines: usize,
    last_flush_ms: u64,
}

impl JsonlAppender {
    pub fn open(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("create {}", dir.display()))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("open {}", path.display()))?;
        Ok(Self {
            path: path.to_path_buf(),
            out: BufWriter::new(file),
            pending_lines: 0,
            last_flush_ms: now_ms(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn write_line(&mut self, line: &str) -> anyhow::Result<()> {
        self.out.write_all(line.as_bytes())?;
        self.out.write_all(b"\n")?;
        self.pending_lines = self.pending_lines.saturating_add(1);
        self.maybe_flush()?;
        Ok(())
    }

    /// Serializes `record` onto a single line.
    pub fn write_record<T: Serialize>(&mut self, record: &T) -> anyhow::Result<()> {
        let line = serde_json::to_string(record).context("serialize jsonl record")?;
        self.write_line(&line)
    }

    pub fn flush_and_sync(&mut self) -> anyhow::Result<()> {
        self.out.flush()?;
        self.pending_lines = 0;
        self.last_flush_ms = now_ms();
        self.out.get_ref().sync_all().context("sync jsonl file")?;
        Ok(())
    }

    fn maybe_flush(&mut self) -> anyhow::Result<()> {
        let now = now_ms();
        let due = self.pending_lines >= JSONL_FLUSH_EVERY_LINES
            || now.saturating_sub(self.last_flush_ms) >= JSONL_FLUSH_EVERY_MS;
        if due {
            self.out.flush()?;
            self.pending_lines = 0;
            self.last_flush_ms = now;
        }
        Ok(())
    }
}

/// One push frame as received, with its arrival time.
#[derive(Debug, Serialize)]
pub struct RawFrame<'a> {
    pub ts_ms: u64,
    pub frame: &'a str,
}

impl<'a> RawFrame<'a> {
    pub fn now(frame: &'a str) -> Self {
        Self {
            ts_ms: now_ms(),
            frame,
        }
    }
}

/// Writes a standings table to `path` with a header row, replacing any
/// existing file. Cells use the same text as the console table.
pub fn write_standings_csv(path: impl AsRef<Path>, rows: &[StandingsRow]) -> anyhow::Result<()> {
    let path = path.as_ref();
    let mut writer =
        csv::Writer::from_path(path).with_context(|| format!("create {}", path.display()))?;
    writer
        .write_record(STANDINGS_HEADER)
        .with_context(|| format!("write header {}", path.display()))?;
    for row in rows {
        writer.write_record([
            row.rank_text(),
            row.team_name.clone(),
            row.played_text(),
            row.goal_difference_text(),
            row.points_text(),
        ])?;
    }
    writer
        .flush()
        .with_context(|| format!("flush {}", path.display()))?;
    Ok(())
}

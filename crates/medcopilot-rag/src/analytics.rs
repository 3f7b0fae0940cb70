//! Query log: one JSON object per line, plus a per-mode summary.
use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use tracing::warn;

use medcopilot_core::traits::AnalyticsSink;
use medcopilot_core::types::{AnalyticsRecord, QueryMode};

pub struct JsonlAnalyticsSink {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonlAnalyticsSink {
    pub fn new(path: impl Into<PathBuf>) -> Self { Self { path: path.into(), lock: Mutex::new(()) } }

    pub fn path(&self) -> &Path { &self.path }
}

impl AnalyticsSink for JsonlAnalyticsSink {
    fn record(&self, query: &str, mode: QueryMode) -> anyhow::Result<()> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut line = serde_json::to_string(&AnalyticsRecord::now(query, mode))?;
        line.push('\n');
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        file.write_all(line.as_bytes())?;
        Ok(())
    }
}

/// Drops every record; used when analytics are disabled.
pub struct NoopSink;

impl AnalyticsSink for NoopSink {
    fn record(&self, _query: &str, _mode: QueryMode) -> anyhow::Result<()> { Ok(()) }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AnalyticsSummary {
    pub total: usize,
    pub hospital: usize,
    pub global: usize,
    pub hybrid: usize,
    /// Lines that could not be parsed.
    pub skipped: usize,
}

/// All readable records in the log. A missing log is empty.
pub fn read_records(path: &Path) -> anyhow::Result<Vec<AnalyticsRecord>> {
    Ok(scan(path)?.0)
}

fn scan(path: &Path) -> anyhow::Result<(Vec<AnalyticsRecord>, usize)> {
    let file = match fs::File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok((Vec::new(), 0)),
        Err(e) => return Err(e.into()),
    };
    let mut records = Vec::new();
    let mut skipped = 0;
    for (n, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() { continue; }
        match serde_json::from_str::<AnalyticsRecord>(&line) {
            Ok(r) => records.push(r),
            Err(e) => {
                warn!(line = n + 1, error = %e, "skipping unreadable analytics record");
                skipped += 1;
            }
        }
    }
    Ok((records, skipped))
}

pub fn summarize(path: &Path) -> anyhow::Result<AnalyticsSummary> {
    let (records, skipped) = scan(path)?;
    let mut summary = AnalyticsSummary { total: records.len(), skipped, ..AnalyticsSummary::default() };
    for r in &records {
        match r.mode {
            QueryMode::Hospital => summary.hospital += 1,
            QueryMode::Global => summary.global += 1,
            QueryMode::Hybrid => summary.hybrid += 1,
        }
    }
    Ok(summary)
}

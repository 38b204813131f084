//! Append-only workflow journal under `.backspec/events.jsonl`.
//!
//! One envelope per workflow outcome: commit, decline, or error. The journal
//! is a log of what the editors did to the document, rendered read-only by
//! `backspec journal`; it never drives behavior.

use crate::core::document::STATE_DIR;
use crate::core::error::BackspecError;
use crate::core::output;
use crate::core::time;
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

pub const JOURNAL_FILENAME: &str = "events.jsonl";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalEvent {
    pub ts: String,
    pub event_id: String,
    /// Operation, e.g. `configure.database` or `init`.
    pub op: String,
    /// Outcome: `commit`, `decline`, `error`, `unchanged`.
    pub status: String,
    pub details: serde_json::Value,
}

fn journal_path(project_dir: &Path) -> PathBuf {
    project_dir.join(STATE_DIR).join(JOURNAL_FILENAME)
}

/// Append one envelope. Creates the state directory on first use.
pub fn record(
    project_dir: &Path,
    op: &str,
    status: &str,
    details: serde_json::Value,
) -> Result<(), BackspecError> {
    let path = journal_path(project_dir);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let event = JournalEvent {
        ts: time::now_epoch_z(),
        event_id: time::new_event_id(),
        op: op.to_string(),
        status: status.to_string(),
        details,
    };
    let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
    writeln!(file, "{}", serde_json::to_string(&event)?)?;
    Ok(())
}

/// Read up to `limit` most recent events. Unparseable lines are skipped.
pub fn read(project_dir: &Path, limit: usize) -> Result<Vec<JournalEvent>, BackspecError> {
    let path = journal_path(project_dir);
    if !path.exists() {
        return Ok(Vec::new());
    }
    let reader = BufReader::new(fs::File::open(&path)?);
    let mut events = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<JournalEvent>(&line) {
            Ok(event) => events.push(event),
            Err(_) => continue,
        }
    }
    let start = events.len().saturating_sub(limit);
    Ok(events.split_off(start))
}

/// Human rendering used by `backspec journal`.
pub fn render_text(events: &[JournalEvent]) {
    if events.is_empty() {
        println!("journal is empty");
        return;
    }
    for event in events {
        println!(
            "{:<12} {:<24} {:<10} {}",
            event.ts,
            event.op,
            event.status,
            output::compact_line(&event.details.to_string(), 60)
        );
    }
}

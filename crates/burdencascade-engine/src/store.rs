//! Event log persistence — newline-delimited JSON, append-only
//!
//! One `BurdenEvent` per line:
//!
//! ```text
//! {"id":"…","timestamp":"2026-10-01T09:00:00Z","layer":"CORE","operation_type":"coordinate_load",…}
//! {"id":"…","timestamp":"2026-10-01T09:05:00Z","layer":"BRIDGES",…}
//! ```
//!
//! Every append writes a whole line in one call and syncs before returning, so
//! a crash can only leave a torn final line. `load` drops that line and
//! truncates the file back to the last newline. A final line that parses is
//! kept and only gets its newline restored.
//!
//! Appends, archiving and tail repair hold an exclusive advisory lock on
//! `<log>.lock`, which excludes other processes as well as other threads.

use burdencascade_core::{BurdenEvent, Error, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use fd_lock::RwLock as FileLock;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use tracing::{debug, info, warn};

/// Where recorded events go. The in-memory log calls this before publishing.
pub trait EventSink: Send + Sync {
    fn append(&self, event: &BurdenEvent) -> Result<()>;
}

/// Result of moving old events out of the live log.
#[derive(Debug, Clone, Serialize)]
pub struct ArchiveOutcome {
    pub cutoff: DateTime<Utc>,
    pub archived: usize,
    pub retained: usize,
    pub archive_path: PathBuf,
}

pub struct NdjsonStore {
    path: PathBuf,
    // In-process writers; the file lock covers other processes.
    write_lock: Mutex<()>,
}

impl NdjsonStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `burden-events.ndjson` → `burden-events.archive.ndjson`
    pub fn archive_path(&self) -> PathBuf {
        self.path.with_extension("archive.ndjson")
    }

    /// `burden-events.ndjson` → `burden-events.ndjson.lock`
    pub fn lock_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".lock");
        PathBuf::from(name)
    }

    /// Run `f` while holding the in-process mutex and the exclusive file lock.
    fn locked<T>(&self, f: impl FnOnce() -> Result<T>) -> Result<T> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let lock_path = self.lock_path();
        ensure_parent(&lock_path)?;
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(&lock_path)?;
        let mut lock = FileLock::new(file);
        let _held = lock.write()?;
        f()
    }

    /// Replay every complete line in the log. A missing file is an empty log.
    pub fn load(&self) -> Result<Vec<BurdenEvent>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        self.locked(|| self.load_locked())
    }

    fn load_locked(&self) -> Result<Vec<BurdenEvent>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&self.path)?;
        let complete = self.repair_torn_tail(&content)?;
        let events = parse_lines(complete)?;
        debug!("Loaded {} events from {}", events.len(), self.path.display());
        Ok(events)
    }

    /// Handle a final line with no newline. A line that parses as an event
    /// gets its newline back; anything else is a torn write and is truncated.
    /// Returns the content to replay.
    fn repair_torn_tail<'a>(&self, content: &'a str) -> Result<&'a str> {
        if content.is_empty() || content.ends_with('\n') {
            return Ok(content);
        }
        let keep = content.rfind('\n').map(|i| i + 1).unwrap_or(0);
        if serde_json::from_str::<BurdenEvent>(content[keep..].trim()).is_ok() {
            let mut f = OpenOptions::new().append(true).open(&self.path)?;
            f.write_all(b"\n")?;
            f.sync_data()?;
            debug!("Restored missing newline at end of {}", self.path.display());
            return Ok(content);
        }
        warn!(
            "Discarding torn write at end of {} ({} bytes)",
            self.path.display(),
            content.len() - keep
        );
        let f = OpenOptions::new().write(true).open(&self.path)?;
        f.set_len(keep as u64)?;
        f.sync_data()?;
        Ok(&content[..keep])
    }

    /// Move events older than `cutoff` into the archive file.
    ///
    /// The archive is appended to; the live log is rewritten through a temp
    /// file and rename so readers never see a half-written log.
    pub fn archive_before(&self, cutoff: DateTime<Utc>) -> Result<ArchiveOutcome> {
        self.locked(|| self.archive_locked(cutoff))
    }

    fn archive_locked(&self, cutoff: DateTime<Utc>) -> Result<ArchiveOutcome> {
        let events = self.load_locked()?;
        let (archived, retained): (Vec<BurdenEvent>, Vec<BurdenEvent>) =
            events.into_iter().partition(|e| e.timestamp < cutoff);

        let outcome = ArchiveOutcome {
            cutoff,
            archived: archived.len(),
            retained: retained.len(),
            archive_path: self.archive_path(),
        };
        if archived.is_empty() {
            info!("Nothing to archive before {}", cutoff.to_rfc3339());
            return Ok(outcome);
        }

        append_lines(&outcome.archive_path, &archived)?;

        let tmp = self.path.with_extension("ndjson.tmp");
        let mut body = String::new();
        for event in &retained {
            body.push_str(&serde_json::to_string(event)?);
            body.push('\n');
        }
        fs::write(&tmp, body)?;
        fs::rename(&tmp, &self.path)?;

        info!(
            "Archived {} events before {} to {} ({} retained)",
            outcome.archived,
            cutoff.to_rfc3339(),
            outcome.archive_path.display(),
            outcome.retained
        );
        Ok(outcome)
    }
}

impl EventSink for NdjsonStore {
    fn append(&self, event: &BurdenEvent) -> Result<()> {
        self.locked(|| append_lines(&self.path, std::slice::from_ref(event)))?;
        debug!("Appended event {} to {}", event.id, self.path.display());
        Ok(())
    }
}

/// Serialize all lines up front, then write them with a single call.
fn append_lines(path: &Path, events: &[BurdenEvent]) -> Result<()> {
    let mut buf = String::new();
    for event in events {
        buf.push_str(&serde_json::to_string(event)?);
        buf.push('\n');
    }
    ensure_parent(path)?;
    let mut f = OpenOptions::new().create(true).append(true).open(path)?;
    f.write_all(buf.as_bytes())?;
    f.flush()?;
    f.sync_data()?;
    Ok(())
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

fn parse_lines(content: &str) -> Result<Vec<BurdenEvent>> {
    let mut events = Vec::new();
    for (i, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let event: BurdenEvent =
            serde_json::from_str(line).map_err(|e| Error::corrupt_log(i + 1, e.to_string()))?;
        events.push(event);
    }
    Ok(events)
}

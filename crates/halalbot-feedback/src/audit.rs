//! Append-only JSONL log of individual votes.
//!
//! The log is the record of every vote. Writers hold an exclusive advisory
//! lock on the file while they append, so several processes can share it.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use fs2::FileExt;
use halalbot_core::{Error, FeedbackEvent, Result};
use tracing::warn;

use crate::aggregate::AggregateTable;

#[derive(Debug)]
pub struct AuditLog {
    path: PathBuf,
    file: Mutex<File>,
}

/// Records read from a byte offset to the end of the log.
#[derive(Debug, Default)]
pub struct AuditTail {
    pub events: Vec<FeedbackEvent>,
    /// Offset just past the last complete line.
    pub end: u64,
    /// Length of the file when it was read. Larger than `end` when the last
    /// line was cut short.
    pub len: u64,
}

impl AuditTail {
    pub fn is_torn(&self) -> bool {
        self.len > self.end
    }
}

/// Exclusive access to the log, in this process and across processes.
/// The file lock is released on drop.
pub struct AuditWriter<'a> {
    log: &'a AuditLog,
    file: MutexGuard<'a, File>,
}

impl AuditWriter<'_> {
    /// Append one record as a single write, sync it and return the bytes written.
    pub fn append(&mut self, event: &FeedbackEvent) -> Result<u64> {
        let mut line = serde_json::to_vec(event)?;
        line.push(b'\n');
        self.write(&line)
    }

    /// Close off a line left unterminated by an interrupted writer.
    pub fn terminate_torn_line(&mut self) -> Result<u64> {
        self.write(b"\n")
    }

    fn write(&mut self, bytes: &[u8]) -> Result<u64> {
        let path = &self.log.path;
        self.file.write_all(bytes).map_err(|e| Error::storage(path, e))?;
        self.file.sync_data().map_err(|e| Error::storage(path, e))?;
        Ok(bytes.len() as u64)
    }
}

impl Drop for AuditWriter<'_> {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&*self.file) {
            warn!(path = %self.log.path.display(), error = %e, "failed to release audit log lock");
        }
    }
}

impl AuditLog {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(dir) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(|e| Error::storage(dir, e))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| Error::storage(&path, e))?;
        Ok(Self { path, file: Mutex::new(file) })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Block until this handle holds the log exclusively.
    pub fn lock_exclusive(&self) -> Result<AuditWriter<'_>> {
        let file = self.file.lock().unwrap_or_else(PoisonError::into_inner);
        FileExt::lock_exclusive(&*file).map_err(|e| Error::storage(&self.path, e))?;
        Ok(AuditWriter { log: self, file })
    }

    pub fn append(&self, event: &FeedbackEvent) -> Result<()> {
        self.lock_exclusive()?.append(event).map(|_| ())
    }

    /// Well-formed records from byte `offset` on. Malformed lines are
    /// skipped; an unterminated last line is left for a later read.
    pub fn read_from(path: &Path, offset: u64) -> Result<AuditTail> {
        let mut file = match File::open(path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(AuditTail::default()),
            Err(e) => return Err(Error::storage(path, e)),
        };
        let mut bytes = Vec::new();
        file.seek(SeekFrom::Start(offset)).map_err(|e| Error::storage(path, e))?;
        file.read_to_end(&mut bytes).map_err(|e| Error::storage(path, e))?;

        let complete = bytes.iter().rposition(|b| *b == b'\n').map_or(0, |i| i + 1);
        let mut events = Vec::new();
        let mut at = offset;
        for line in bytes[..complete].split_inclusive(|b| *b == b'\n') {
            let start = at;
            at += line.len() as u64;
            if line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }
            match serde_json::from_slice::<FeedbackEvent>(line) {
                Ok(event) => events.push(event),
                Err(e) => warn!(
                    path = %path.display(),
                    offset = start,
                    error = %e,
                    "skipping malformed audit record"
                ),
            }
        }
        Ok(AuditTail { events, end: offset + complete as u64, len: offset + bytes.len() as u64 })
    }

    /// Every well-formed record in file order.
    pub fn read_events(path: &Path) -> Result<Vec<FeedbackEvent>> {
        Ok(Self::read_from(path, 0)?.events)
    }

    /// Fold the log into a fresh aggregate table.
    pub fn replay(path: &Path) -> Result<AggregateTable> {
        let table = AggregateTable::new();
        for event in Self::read_events(path)? {
            table.apply(&event);
        }
        Ok(table)
    }
}

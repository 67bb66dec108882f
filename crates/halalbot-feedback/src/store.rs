use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use halalbot_core::traits::FeedbackStore;
use halalbot_core::{FeedbackAggregate, FeedbackEvent, Result, TextHash, Vote};
use tracing::{info, warn};

use crate::aggregate::AggregateTable;
use crate::audit::{AuditLog, AuditWriter};

/// Process-local store; the audit trail is kept in memory.
#[derive(Debug, Default)]
pub struct MemoryFeedbackStore {
    table: AggregateTable,
    events: Mutex<Vec<FeedbackEvent>>,
}

impl MemoryFeedbackStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<FeedbackEvent> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl FeedbackStore for MemoryFeedbackStore {
    fn record_vote(&self, text_hash: TextHash, vote: Vote, query: &str, user: &str) -> Result<()> {
        let event = FeedbackEvent::now(text_hash, vote, query, user);
        self.events.lock().unwrap_or_else(PoisonError::into_inner).push(event);
        self.table.increment(text_hash, vote);
        Ok(())
    }

    fn vote_summary(&self, text_hash: &TextHash) -> Option<FeedbackAggregate> {
        self.table.get(text_hash)
    }
}

/// Disk-backed store: JSONL audit log plus a JSON aggregate snapshot.
///
/// The audit log is authoritative. `open` replays it, and every write first
/// folds in whatever other handles appended since this handle last wrote,
/// all while holding the log's exclusive file lock. The snapshot is a cache
/// of the replayed counts, rewritten after each vote. Readers only take the
/// table's read lock and see this handle's writes plus everything journaled
/// before its last write.
#[derive(Debug)]
pub struct FileFeedbackStore {
    table: AggregateTable,
    audit: AuditLog,
    aggregate_path: PathBuf,
    /// Bytes of the audit log already folded into `table`.
    applied: Mutex<u64>,
}

impl FileFeedbackStore {
    /// Open the store and replay the audit log. When the log holds no votes,
    /// the snapshot's counts are imported into it as baseline records; a
    /// missing or corrupt snapshot then starts empty. Failing to open or lock
    /// the audit log is an error.
    pub fn open(
        aggregate_path: impl Into<PathBuf>,
        audit_path: impl Into<PathBuf>,
    ) -> Result<Self> {
        let aggregate_path = aggregate_path.into();
        let audit = AuditLog::open(audit_path)?;
        let table = AggregateTable::new();
        let applied = {
            let mut writer = audit.lock_exclusive()?;
            let tail = AuditLog::read_from(audit.path(), 0)?;
            let mut applied = tail.end;
            if tail.events.is_empty() {
                let legacy = AggregateTable::load(&aggregate_path);
                if !legacy.is_empty() && tail.is_torn() {
                    applied = tail.len + writer.terminate_torn_line()?;
                }
                for (hash, agg) in legacy.entries() {
                    let counts = [(Vote::Up, agg.thumbs_up), (Vote::Down, agg.thumbs_down)];
                    for (vote, count) in counts {
                        if count == 0 {
                            continue;
                        }
                        let event = FeedbackEvent::baseline(hash, vote, count);
                        applied += writer.append(&event)?;
                        table.apply(&event);
                    }
                }
            } else {
                for event in &tail.events {
                    table.apply(event);
                }
            }
            applied
        };
        info!(
            aggregates = table.len(),
            snapshot = %aggregate_path.display(),
            audit_log = %audit.path().display(),
            "feedback store opened"
        );
        Ok(Self { table, audit, aggregate_path, applied: Mutex::new(applied) })
    }

    pub fn aggregate_path(&self) -> &Path {
        &self.aggregate_path
    }

    pub fn audit_path(&self) -> &Path {
        self.audit.path()
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Fold in votes journaled by other handles and rewrite the snapshot.
    pub fn rebuild_snapshot(&self) -> Result<()> {
        let mut applied = self.applied.lock().unwrap_or_else(PoisonError::into_inner);
        let mut writer = self.audit.lock_exclusive()?;
        self.catch_up(&mut writer, &mut applied)?;
        self.table.save(&self.aggregate_path)
    }

    /// Apply the log from `applied` to its end. Must hold the writer.
    fn catch_up(&self, writer: &mut AuditWriter<'_>, applied: &mut u64) -> Result<usize> {
        let tail = AuditLog::read_from(self.audit.path(), *applied)?;
        for event in &tail.events {
            self.table.apply(event);
        }
        *applied = tail.end;
        if tail.is_torn() {
            *applied = tail.len + writer.terminate_torn_line()?;
        }
        Ok(tail.events.len())
    }
}

impl FeedbackStore for FileFeedbackStore {
    /// The vote is committed once its audit record is synced. An error means
    /// it was not journaled and may be retried. A failed snapshot rewrite
    /// after that point is only logged: the next `open` replays the log.
    fn record_vote(&self, text_hash: TextHash, vote: Vote, query: &str, user: &str) -> Result<()> {
        let mut applied = self.applied.lock().unwrap_or_else(PoisonError::into_inner);
        let mut writer = self.audit.lock_exclusive()?;
        let caught_up = self.catch_up(&mut writer, &mut applied)?;

        let event = FeedbackEvent::now(text_hash, vote, query, user);
        *applied += writer.append(&event)?;
        let updated = self.table.apply(&event);
        if let Err(e) = self.table.save(&self.aggregate_path) {
            warn!(
                snapshot = %self.aggregate_path.display(),
                error = %e,
                "vote journaled but aggregate snapshot not rewritten"
            );
        }
        drop(writer);

        info!(
            hash = %text_hash,
            vote = %vote,
            caught_up,
            thumbs_up = updated.thumbs_up,
            thumbs_down = updated.thumbs_down,
            "vote recorded"
        );
        Ok(())
    }

    fn vote_summary(&self, text_hash: &TextHash) -> Option<FeedbackAggregate> {
        self.table.get(text_hash)
    }
}

//! In-memory vote counters with a lenient JSON snapshot format.
//!
//! The snapshot maps hex-encoded passage hashes to
//! `{"thumbs_up": n, "thumbs_down": m}`. Loading never fails: a missing or
//! unreadable file is an empty table and a malformed entry only loses that
//! one hash.

use std::collections::{BTreeMap, HashMap};
use std::io::Write;
use std::path::Path;
use std::sync::{PoisonError, RwLock};

use halalbot_core::{Error, FeedbackAggregate, FeedbackEvent, Result, TextHash, Vote};
use tracing::{debug, warn};

#[derive(Debug, Default)]
pub struct AggregateTable {
    counts: RwLock<HashMap<TextHash, FeedbackAggregate>>,
}

impl AggregateTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(json) => Self::parse(&json),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no aggregate snapshot yet");
                Self::new()
            }
            Err(e) => {
                warn!(
                    path = %path.display(),
                    error = %e,
                    "aggregate snapshot unreadable, starting empty"
                );
                Self::new()
            }
        }
    }

    pub fn parse(json: &str) -> Self {
        let parsed = serde_json::from_str::<serde_json::Map<String, serde_json::Value>>(json);
        let entries = match parsed {
            Ok(entries) => entries,
            Err(e) => {
                warn!(error = %e, "aggregate snapshot is not a JSON object, starting empty");
                return Self::new();
            }
        };
        let mut counts = HashMap::with_capacity(entries.len());
        for (key, value) in entries {
            let Ok(hash) = TextHash::from_hex(&key) else {
                warn!(key = %key, "skipping aggregate entry with malformed hash");
                continue;
            };
            match serde_json::from_value::<FeedbackAggregate>(value) {
                Ok(agg) => {
                    counts.insert(hash, agg);
                }
                Err(e) => warn!(hash = %hash, error = %e, "skipping corrupt aggregate entry"),
            }
        }
        Self { counts: RwLock::new(counts) }
    }

    pub fn get(&self, hash: &TextHash) -> Option<FeedbackAggregate> {
        self.counts.read().unwrap_or_else(PoisonError::into_inner).get(hash).copied()
    }

    /// Apply one vote under the write lock and return the updated counts.
    pub fn increment(&self, hash: TextHash, vote: Vote) -> FeedbackAggregate {
        self.add(hash, vote, 1)
    }

    /// Fold one audit record into the table.
    pub fn apply(&self, event: &FeedbackEvent) -> FeedbackAggregate {
        self.add(event.text_hash, event.vote, event.count)
    }

    fn add(&self, hash: TextHash, vote: Vote, count: u64) -> FeedbackAggregate {
        let mut counts = self.counts.write().unwrap_or_else(PoisonError::into_inner);
        let entry = counts.entry(hash).or_default();
        entry.add(vote, count);
        *entry
    }

    pub fn len(&self) -> usize {
        self.counts.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of every entry, ordered by hash.
    pub fn entries(&self) -> Vec<(TextHash, FeedbackAggregate)> {
        let mut entries: Vec<_> = self
            .counts
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(hash, agg)| (*hash, *agg))
            .collect();
        entries.sort_by_key(|(hash, _)| *hash);
        entries
    }

    /// Hex-keyed copy of the table, sorted for stable output.
    pub fn snapshot(&self) -> BTreeMap<String, FeedbackAggregate> {
        self.entries().into_iter().map(|(hash, agg)| (hash.to_hex(), agg)).collect()
    }

    /// Write the snapshot next to `path` and rename it into place.
    pub fn save(&self, path: &Path) -> Result<()> {
        let body = serde_json::to_vec_pretty(&self.snapshot())?;
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir).map_err(|e| Error::storage(dir, e))?;
        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| Error::storage(dir, e))?;
        tmp.write_all(&body).map_err(|e| Error::storage(tmp.path(), e))?;
        tmp.as_file().sync_data().map_err(|e| Error::storage(tmp.path(), e))?;
        tmp.persist(path).map_err(|e| Error::storage(path, e.error))?;
        Ok(())
    }
}

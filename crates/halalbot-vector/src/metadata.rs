use std::path::Path;

use halalbot_core::{CandidateRef, Error, PassageRecord, Result};
use tracing::info;

/// Corpus metadata, indexed by the position each passage was embedded at.
#[derive(Debug, Clone, Default)]
pub struct MetadataStore {
    records: Vec<PassageRecord>,
}

impl MetadataStore {
    pub fn from_records(records: Vec<PassageRecord>) -> Self {
        Self { records }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => {
                Error::NotFound(format!("metadata file {}", path.display()))
            }
            _ => Error::storage(path, e),
        })?;
        let records: Vec<PassageRecord> = serde_json::from_str(&json)?;
        info!(path = %path.display(), passages = records.len(), "loaded corpus metadata");
        Ok(Self { records })
    }

    pub fn get(&self, candidate: CandidateRef) -> Option<&PassageRecord> {
        candidate.index().and_then(|i| self.records.get(i))
    }

    pub fn records(&self) -> &[PassageRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

//! Optional JSONL record of served searches, written by the application
//! after a search returns.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use halalbot_core::{AnnotatedResult, Error, Result};
use serde::Serialize;

#[derive(Serialize)]
struct QueryLogEntry<'a> {
    timestamp: DateTime<Utc>,
    query: &'a str,
    results: &'a [AnnotatedResult],
}

pub struct QueryLog {
    path: PathBuf,
    file: Mutex<File>,
}

impl QueryLog {
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

    pub fn append(&self, query: &str, results: &[AnnotatedResult]) -> Result<()> {
        let entry = QueryLogEntry { timestamp: Utc::now(), query, results };
        let mut line = serde_json::to_vec(&entry)?;
        line.push(b'\n');
        let mut file = self.file.lock().unwrap_or_else(PoisonError::into_inner);
        file.write_all(&line).map_err(|e| Error::storage(&self.path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_creates_missing_directories() {
        let dir = tempfile::tempdir().unwrap();
        let log = QueryLog::open(dir.path().join("logs/2026/search_log.jsonl")).unwrap();
        log.append("zakat on gold", &[]).unwrap();
        log.append("wudu", &[]).unwrap();
        let body = std::fs::read_to_string(log.path()).unwrap();
        assert_eq!(body.lines().count(), 2);
        assert!(body.lines().next().unwrap().contains("\"query\":\"zakat on gold\""));
    }
}

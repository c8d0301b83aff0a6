//! Persistent cache of song embeddings, partitioned by corpus version.
//!
//! Entries are keyed by (corpus version, song id); a vector stored under one
//! version is never returned for another. Persistence is best-effort JSONL
//! (`embeddings.jsonl`, one record per line, inspectable with any text tool):
//! if the backing store is unusable the cache degrades to a process-local
//! in-memory map with a warning, never failing the recommendation path.

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// File name of the backing store inside the cache directory.
const STORE_FILE: &str = "embeddings.jsonl";

/// One persisted cache record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub corpus_version: String,
    pub song_id: String,
    pub vector: Vec<f32>,
    pub created_at: DateTime<Utc>,
}

/// Version-partitioned embedding cache.
///
/// Concurrent reads are cheap; concurrent writes for the same key are
/// harmless since embedding is deterministic — last write wins with an equal
/// value.
#[derive(Debug)]
pub struct EmbeddingCache {
    entries: RwLock<HashMap<(String, String), Vec<f32>>>,
    store_path: Option<PathBuf>,
    /// Cleared after the first failed write so we warn once, not per song.
    persist_ok: AtomicBool,
}

impl EmbeddingCache {
    /// Open a cache backed by `dir`, loading any previously persisted
    /// entries.
    ///
    /// A missing store file is a normal cold start. An unusable directory
    /// degrades to a memory-only cache with a warning.
    pub fn open(dir: &Path) -> Self {
        if let Err(e) = std::fs::create_dir_all(dir) {
            warn!(
                "Cache directory {} unusable ({}). Falling back to in-memory cache.",
                dir.display(),
                e
            );
            return Self::in_memory();
        }

        let store_path = dir.join(STORE_FILE);
        let entries = match load_store(&store_path) {
            Ok(entries) => {
                info!(
                    entries = entries.len(),
                    "Embedding cache opened at {}",
                    store_path.display()
                );
                entries
            }
            Err(e) => {
                warn!(
                    "Failed to read {} ({}). Starting with an empty cache.",
                    store_path.display(),
                    e
                );
                HashMap::new()
            }
        };

        Self {
            entries: RwLock::new(entries),
            store_path: Some(store_path),
            persist_ok: AtomicBool::new(true),
        }
    }

    /// Ephemeral cache with no backing store.
    pub fn in_memory() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            store_path: None,
            persist_ok: AtomicBool::new(false),
        }
    }

    /// Whether entries are being persisted to disk.
    pub fn is_persistent(&self) -> bool {
        self.store_path.is_some()
    }

    /// Look up the vector for (version, id).
    pub fn get(&self, version: &str, id: &str) -> Option<Vec<f32>> {
        self.entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&(version.to_string(), id.to_string()))
            .cloned()
    }

    /// Store a vector for (version, id), appending to the backing store
    /// best-effort.
    pub fn put(&self, version: &str, id: &str, vector: Vec<f32>) {
        let entry = CacheEntry {
            corpus_version: version.to_string(),
            song_id: id.to_string(),
            vector: vector.clone(),
            created_at: Utc::now(),
        };
        self.entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert((version.to_string(), id.to_string()), vector);
        self.append_entry(&entry);
    }

    /// Drop every entry whose version differs from `version`, returning how
    /// many were removed. Rewrites the backing store to match.
    pub fn invalidate_all_except(&self, version: &str) -> usize {
        let removed = {
            let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
            let before = entries.len();
            entries.retain(|(v, _), _| v == version);
            before - entries.len()
        };
        if removed > 0 {
            debug!(removed, version, "Invalidated stale cache partitions");
            self.rewrite_store();
        }
        removed
    }

    /// Number of cached vectors for a version.
    pub fn count_for_version(&self, version: &str) -> usize {
        self.entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .keys()
            .filter(|(v, _)| v == version)
            .count()
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn append_entry(&self, entry: &CacheEntry) {
        let Some(path) = &self.store_path else {
            return;
        };
        if !self.persist_ok.load(Ordering::Relaxed) {
            return;
        }
        let result = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .and_then(|mut file| {
                let line = serde_json::to_string(entry)
                    .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
                writeln!(file, "{}", line)
            });
        if let Err(e) = result {
            warn!(
                "Failed to persist cache entry to {} ({}). Continuing in-memory.",
                path.display(),
                e
            );
            self.persist_ok.store(false, Ordering::Relaxed);
        }
    }

    fn rewrite_store(&self) {
        let Some(path) = &self.store_path else {
            return;
        };
        if !self.persist_ok.load(Ordering::Relaxed) {
            return;
        }
        let snapshot: Vec<CacheEntry> = {
            let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
            entries
                .iter()
                .map(|((version, id), vector)| CacheEntry {
                    corpus_version: version.clone(),
                    song_id: id.clone(),
                    vector: vector.clone(),
                    created_at: Utc::now(),
                })
                .collect()
        };
        let result = (|| -> std::io::Result<()> {
            let mut file = File::create(path)?;
            for entry in &snapshot {
                let line = serde_json::to_string(entry)
                    .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
                writeln!(file, "{}", line)?;
            }
            Ok(())
        })();
        if let Err(e) = result {
            warn!(
                "Failed to rewrite cache store {} ({}). Continuing in-memory.",
                path.display(),
                e
            );
            self.persist_ok.store(false, Ordering::Relaxed);
        }
    }
}

fn load_store(path: &Path) -> std::io::Result<HashMap<(String, String), Vec<f32>>> {
    let mut entries = HashMap::new();
    if !path.exists() {
        return Ok(entries);
    }
    let reader = BufReader::new(File::open(path)?);
    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<CacheEntry>(&line) {
            Ok(entry) => {
                entries.insert((entry.corpus_version, entry.song_id), entry.vector);
            }
            Err(e) => {
                warn!(
                    "Skipping malformed cache line {} in {}: {}",
                    line_no + 1,
                    path.display(),
                    e
                );
            }
        }
    }
    Ok(entries)
}

//! Song corpus: ingestion, validation, and content-derived versioning.
//!
//! The corpus is loaded once at startup and is immutable thereafter. Reloads
//! swap the whole catalog atomically so no in-flight ranking ever sees a
//! mixed-version view. The version tag is derived from record content with an
//! order-independent hash: reordering records keeps the version (and the
//! embedding cache) intact, while any content change rolls it.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use crate::LiedwyserError;

/// Separator between id and text inside a per-record digest. Prevents an id
/// suffix from being confused with a text prefix.
const DIGEST_SEPARATOR: u8 = 0x1f;

/// Auxiliary display fields. Never used in matching.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SongMetadata {
    /// Hymnal number, if the song has one.
    pub number: Option<u32>,
    /// Liturgical category (e.g. "advent", "communion").
    pub category: Option<String>,
}

/// One song in the corpus: the unit of recommendation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Song {
    pub id: String,
    pub title: String,
    /// Searchable body: the fixed concatenation of title, verses, and theme
    /// tags produced by [`RawSongRecord::searchable_text`]. Feeds both the
    /// version hash and the embedder.
    pub text: String,
    pub metadata: SongMetadata,
}

/// A song record as it appears in the ingestion source.
///
/// Mirrors the corpus file layout: `lyrics` holds verse strings, `text` is an
/// alternative single-field body, `tags` carry theme keywords.
#[derive(Debug, Clone, Deserialize)]
pub struct RawSongRecord {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub lyrics: Vec<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub number: Option<u32>,
    #[serde(default)]
    pub category: Option<String>,
}

impl RawSongRecord {
    /// Build the searchable text for this record.
    ///
    /// Concatenation policy (fixed so cache keys and embeddings stay
    /// reproducible): title, then verses joined by newlines, then tags joined
    /// by spaces, each section separated by a newline. Empty sections are
    /// omitted entirely.
    pub fn searchable_text(&self) -> String {
        let mut sections: Vec<String> = Vec::new();
        if let Some(title) = &self.title {
            if !title.trim().is_empty() {
                sections.push(title.trim().to_string());
            }
        }
        let body = match &self.text {
            Some(t) if !t.trim().is_empty() => t.trim().to_string(),
            _ => self
                .lyrics
                .iter()
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
                .collect::<Vec<_>>()
                .join("\n"),
        };
        if !body.is_empty() {
            sections.push(body);
        }
        if !self.tags.is_empty() {
            sections.push(self.tags.join(" "));
        }
        sections.join("\n")
    }
}

/// A record rejected during ingestion, with the reason.
#[derive(Debug, Clone, Serialize)]
pub struct RejectedRecord {
    /// Offending record's id, or its zero-based position when the id itself
    /// is missing.
    pub id: String,
    pub reason: String,
}

/// Outcome of corpus ingestion: the validated corpus plus any records that
/// were skipped with their collected validation issues.
#[derive(Debug)]
pub struct CorpusLoad {
    pub corpus: Corpus,
    pub rejected: Vec<RejectedRecord>,
}

/// An ordered, deduplicated collection of songs plus its version tag.
#[derive(Debug, Clone)]
pub struct Corpus {
    songs: Vec<Song>,
    by_id: HashMap<String, usize>,
    version: String,
}

impl Corpus {
    /// Validate raw records into a corpus.
    ///
    /// Records missing an id or yielding empty searchable text are skipped
    /// and reported in [`CorpusLoad::rejected`]. A duplicate id is fatal and
    /// fails the whole load, naming the offending id.
    pub fn from_records(records: Vec<RawSongRecord>) -> Result<CorpusLoad, LiedwyserError> {
        let mut songs = Vec::with_capacity(records.len());
        let mut by_id = HashMap::with_capacity(records.len());
        let mut rejected = Vec::new();

        for (position, record) in records.into_iter().enumerate() {
            let id = match &record.id {
                Some(id) if !id.trim().is_empty() => id.trim().to_string(),
                _ => {
                    rejected.push(RejectedRecord {
                        id: format!("#{}", position),
                        reason: "missing required field 'id'".to_string(),
                    });
                    continue;
                }
            };

            let text = record.searchable_text();
            if text.is_empty() {
                rejected.push(RejectedRecord {
                    id: id.clone(),
                    reason: "no searchable text (empty lyrics/text)".to_string(),
                });
                continue;
            }

            if by_id.contains_key(&id) {
                return Err(LiedwyserError::validation(&id, "duplicate song id"));
            }

            let title = record
                .title
                .as_deref()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| id.clone());

            by_id.insert(id.clone(), songs.len());
            songs.push(Song {
                id,
                title,
                text,
                metadata: SongMetadata {
                    number: record.number,
                    category: record.category,
                },
            });
        }

        let version = version_tag(&songs);
        Ok(CorpusLoad {
            corpus: Corpus {
                songs,
                by_id,
                version,
            },
            rejected,
        })
    }

    /// Songs in corpus insertion order.
    pub fn songs(&self) -> &[Song] {
        &self.songs
    }

    pub fn get(&self, id: &str) -> Option<&Song> {
        self.by_id.get(id).map(|&i| &self.songs[i])
    }

    /// Content-derived version tag. Identical tags guarantee identical
    /// embeddings and rankings.
    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn len(&self) -> usize {
        self.songs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.songs.is_empty()
    }
}

/// Hash the corpus content into a version tag.
///
/// Per-record SHA-256 digests over `id <0x1f> text` are combined with XOR, an
/// associative and commutative reducer, so the tag is insensitive to record
/// order but sensitive to any id or text change.
fn version_tag(songs: &[Song]) -> String {
    let mut combined = [0u8; 32];
    for song in songs {
        let mut hasher = Sha256::new();
        hasher.update(song.id.as_bytes());
        hasher.update([DIGEST_SEPARATOR]);
        hasher.update(song.text.as_bytes());
        let digest = hasher.finalize();
        for (acc, byte) in combined.iter_mut().zip(digest.iter()) {
            *acc ^= byte;
        }
    }
    hex_encode(&combined)
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Shared, read-mostly holder for the active corpus.
///
/// Readers take cheap [`Arc`] snapshots; a reload swaps the whole catalog
/// plus version in one write.
#[derive(Debug)]
pub struct CorpusStore {
    current: RwLock<Arc<Corpus>>,
}

impl CorpusStore {
    pub fn new(corpus: Corpus) -> Self {
        Self {
            current: RwLock::new(Arc::new(corpus)),
        }
    }

    /// Load the corpus from a JSON file (an array of song records).
    ///
    /// An unreadable or unparsable source is fatal. Individually malformed
    /// records are skipped with a warning per record.
    pub fn load(path: &Path) -> Result<Self, LiedwyserError> {
        let load = read_corpus_file(path)?;
        Ok(Self::new(load.corpus))
    }

    /// Snapshot of the active corpus. Never blocks on reloads in progress
    /// for longer than the swap itself.
    pub fn snapshot(&self) -> Arc<Corpus> {
        self.current
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Atomically replace the active corpus with a fresh load from `path`.
    ///
    /// Returns the new snapshot. On error the previous corpus stays active.
    pub fn reload(&self, path: &Path) -> Result<Arc<Corpus>, LiedwyserError> {
        let load = read_corpus_file(path)?;
        let fresh = Arc::new(load.corpus);
        let mut guard = self.current.write().unwrap_or_else(|e| e.into_inner());
        *guard = fresh.clone();
        info!(
            version = fresh.version(),
            songs = fresh.len(),
            "Corpus reloaded"
        );
        Ok(fresh)
    }
}

fn read_corpus_file(path: &Path) -> Result<CorpusLoad, LiedwyserError> {
    let contents = std::fs::read_to_string(path).map_err(|e| {
        LiedwyserError::Ingestion(format!("cannot read {}: {}", path.display(), e))
    })?;
    let records: Vec<RawSongRecord> = serde_json::from_str(&contents)?;
    let load = Corpus::from_records(records)?;
    for rejected in &load.rejected {
        warn!(id = %rejected.id, reason = %rejected.reason, "Skipped song record");
    }
    info!(
        version = load.corpus.version(),
        songs = load.corpus.len(),
        skipped = load.rejected.len(),
        "Corpus loaded from {}",
        path.display()
    );
    Ok(load)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, title: &str, verses: &[&str]) -> RawSongRecord {
        RawSongRecord {
            id: Some(id.to_string()),
            title: Some(title.to_string()),
            lyrics: verses.iter().map(|v| v.to_string()).collect(),
            text: None,
            tags: vec![],
            number: None,
            category: None,
        }
    }

    #[test]
    fn test_version_invariant_under_reorder() {
        let a = Corpus::from_records(vec![
            record("a", "Morning Hymn", &["praise the dawn"]),
            record("b", "Evening Hymn", &["rest in peace"]),
        ])
        .unwrap();
        let b = Corpus::from_records(vec![
            record("b", "Evening Hymn", &["rest in peace"]),
            record("a", "Morning Hymn", &["praise the dawn"]),
        ])
        .unwrap();
        assert_eq!(a.corpus.version(), b.corpus.version());
    }

    #[test]
    fn test_version_changes_on_text_edit() {
        let a = Corpus::from_records(vec![record("a", "Morning Hymn", &["praise the dawn"])])
            .unwrap();
        let b = Corpus::from_records(vec![record("a", "Morning Hymn", &["praise the dusk"])])
            .unwrap();
        assert_ne!(a.corpus.version(), b.corpus.version());
    }

    #[test]
    fn test_duplicate_id_is_fatal() {
        let result = Corpus::from_records(vec![
            record("a", "First", &["one"]),
            record("a", "Second", &["two"]),
        ]);
        match result {
            Err(LiedwyserError::Validation { id, .. }) => assert_eq!(id, "a"),
            other => panic!("expected Validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_malformed_records_collected_not_fatal() {
        let mut missing_id = record("x", "No Id", &["verse"]);
        missing_id.id = None;
        let load = Corpus::from_records(vec![
            record("a", "Keeper", &["verse"]),
            missing_id,
            record("b", "Empty", &[]),
        ])
        .unwrap();
        assert_eq!(load.corpus.len(), 1);
        assert_eq!(load.rejected.len(), 2);
        assert_eq!(load.rejected[1].id, "b");
    }

    #[test]
    fn test_searchable_text_concatenation() {
        let mut r = record("a", "Title", &["verse one", "verse two"]);
        r.tags = vec!["hope".to_string(), "light".to_string()];
        assert_eq!(r.searchable_text(), "Title\nverse one\nverse two\nhope light");
    }

    #[test]
    fn test_title_defaults_to_id() {
        let mut r = record("psalm-23", "", &["the lord is my shepherd"]);
        r.title = None;
        let load = Corpus::from_records(vec![r]).unwrap();
        assert_eq!(load.corpus.songs()[0].title, "psalm-23");
    }
}

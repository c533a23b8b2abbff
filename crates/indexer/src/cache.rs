//! Two-tier symbol cache.
//!
//! The memory tier is an LRU owned by the cache instance; the disk tier holds
//! one JSON record per source file, named by the SHA-256 of its absolute path
//! and sharded by the first two hex characters. Both tiers are validated
//! against the current content hash before anything is returned.

use crate::error::{IndexerError, Result};
use context_symbols::{content_hash, unix_ms_now, FileSymbols};
use lru::LruCache;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use walkdir::WalkDir;

/// Bumped whenever the record layout changes; older records read as misses
pub const CACHE_SCHEMA_VERSION: u32 = 1;

const RECORD_EXTENSION: &str = "json";

static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

#[derive(Serialize, Deserialize, Debug)]
struct CacheRecord {
    schema_version: u32,
    /// Absolute source path the record was written for
    source_path: String,
    /// When `put` wrote the record; hits never rewrite it
    written_at_ms: u64,
    symbols: FileSymbols,
}

/// Hit/miss counters since the cache was opened
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub memory_hits: u64,
    pub disk_hits: u64,
    pub misses: u64,
    pub writes: u64,
}

impl CacheStats {
    pub const fn hits(&self) -> u64 {
        self.memory_hits + self.disk_hits
    }
}

#[derive(Default)]
struct Counters {
    memory_hits: AtomicU64,
    disk_hits: AtomicU64,
    misses: AtomicU64,
    writes: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Path-keyed memoization of extracted symbols
pub struct SymbolCache {
    dir: PathBuf,
    memory: Mutex<LruCache<PathBuf, FileSymbols>>,
    counters: Counters,
}

impl SymbolCache {
    /// Open (creating if needed) a cache rooted at `dir`
    pub fn open(dir: impl Into<PathBuf>, memory_capacity: usize) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|source| IndexerError::CacheDir {
            path: dir.clone(),
            source,
        })?;

        let capacity = NonZeroUsize::new(memory_capacity).unwrap_or(NonZeroUsize::MIN);
        Ok(Self {
            dir,
            memory: Mutex::new(LruCache::new(capacity)),
            counters: Counters::default(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Cached symbols for `path` if they match the file's current content
    pub fn get(&self, path: &Path) -> Option<FileSymbols> {
        match std::fs::read(path) {
            Ok(bytes) => self.lookup(path, &content_hash(&bytes)),
            Err(e) => {
                log::debug!("Cache get for unreadable {}: {e}", path.display());
                self.invalidate_memory(path);
                Counters::bump(&self.counters.misses);
                None
            }
        }
    }

    /// Like [`get`](Self::get) for callers that already hold the content hash
    pub fn lookup(&self, path: &Path, current_hash: &str) -> Option<FileSymbols> {
        let Some(key) = absolute_key(path) else {
            Counters::bump(&self.counters.misses);
            return None;
        };

        {
            let mut memory = self.memory();
            if let Some(cached) = memory.get(&key) {
                if cached.is_fresh_for(current_hash) {
                    Counters::bump(&self.counters.memory_hits);
                    return Some(cached.clone());
                }
                memory.pop(&key);
            }
        }

        if let Some(record) = self.read_record(&key) {
            if record.symbols.is_fresh_for(current_hash) {
                Counters::bump(&self.counters.disk_hits);
                self.memory().put(key, record.symbols.clone());
                return Some(record.symbols);
            }
            log::debug!("Stale cache record for {}", key.display());
        }

        Counters::bump(&self.counters.misses);
        None
    }

    /// Store `symbols` in both tiers. The disk write is atomic.
    pub fn put(&self, path: &Path, symbols: &FileSymbols) -> Result<()> {
        let key = absolute_key(path)
            .ok_or_else(|| IndexerError::InvalidPath(path.display().to_string()))?;

        let record_path = self.record_path(&key);
        let record = CacheRecord {
            schema_version: CACHE_SCHEMA_VERSION,
            source_path: key.to_string_lossy().to_string(),
            written_at_ms: unix_ms_now(),
            symbols: symbols.clone(),
        };
        write_atomic(&record_path, &serde_json::to_vec(&record)?)?;

        self.memory().put(key, symbols.clone());
        Counters::bump(&self.counters.writes);
        Ok(())
    }

    /// Drop `path` from both tiers
    pub fn invalidate(&self, path: &Path) -> Result<()> {
        let Some(key) = absolute_key(path) else {
            return Ok(());
        };
        self.memory().pop(&key);

        match std::fs::remove_file(self.record_path(&key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Remove disk records whose source is not in `known_paths`, plus records
    /// that cannot be read. Returns how many records were removed.
    pub fn clear_stale<P: AsRef<Path>>(&self, known_paths: &[P]) -> Result<usize> {
        let known: HashSet<String> = known_paths
            .iter()
            .filter_map(|p| absolute_key(p.as_ref()))
            .map(|p| p.to_string_lossy().to_string())
            .collect();

        let mut removed = 0;
        for entry in WalkDir::new(&self.dir).min_depth(2).max_depth(2) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    log::warn!("Failed to read cache entry: {e}");
                    continue;
                }
            };
            let path = entry.path();
            if !entry.file_type().is_file()
                || path.extension().and_then(|e| e.to_str()) != Some(RECORD_EXTENSION)
            {
                continue;
            }

            let keep = match parse_record(path) {
                Some(record) if known.contains(&record.source_path) => true,
                Some(record) => {
                    self.memory().pop(Path::new(&record.source_path));
                    false
                }
                None => false,
            };
            if keep {
                continue;
            }

            match std::fs::remove_file(path) {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }

        if removed > 0 {
            log::info!("Removed {removed} stale cache records from {}", self.dir.display());
        }
        Ok(removed)
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            memory_hits: self.counters.memory_hits.load(Ordering::Relaxed),
            disk_hits: self.counters.disk_hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            writes: self.counters.writes.load(Ordering::Relaxed),
        }
    }

    /// Entries currently held in memory
    pub fn memory_len(&self) -> usize {
        self.memory().len()
    }

    fn memory(&self) -> MutexGuard<'_, LruCache<PathBuf, FileSymbols>> {
        // A poisoned lock only means another thread panicked mid-update of a
        // memo; the map itself is still usable.
        self.memory
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn invalidate_memory(&self, path: &Path) {
        if let Some(key) = absolute_key(path) {
            self.memory().pop(&key);
        }
    }

    fn record_path(&self, key: &Path) -> PathBuf {
        let hex = path_digest(key);
        let shard = hex.get(0..2).unwrap_or("00").to_string();
        self.dir
            .join(shard)
            .join(format!("{hex}.{RECORD_EXTENSION}"))
    }

    fn read_record(&self, key: &Path) -> Option<CacheRecord> {
        let record = parse_record(&self.record_path(key))?;
        if record.source_path != key.to_string_lossy() {
            // Digest collision or a record copied from another tree
            log::debug!("Cache record path mismatch for {}", key.display());
            return None;
        }
        Some(record)
    }
}

impl std::fmt::Debug for SymbolCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SymbolCache")
            .field("dir", &self.dir)
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

fn parse_record(path: &Path) -> Option<CacheRecord> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
        Err(e) => {
            log::debug!("Unreadable cache record {}: {e}", path.display());
            return None;
        }
    };

    let record: CacheRecord = match serde_json::from_slice(&bytes) {
        Ok(record) => record,
        Err(err) => {
            log::debug!("Cache record corrupted {}: {err}", path.display());
            return None;
        }
    };

    if record.schema_version != CACHE_SCHEMA_VERSION {
        log::debug!(
            "Cache record {} has schema {} (expected {CACHE_SCHEMA_VERSION})",
            path.display(),
            record.schema_version
        );
        return None;
    }
    Some(record)
}

fn absolute_key(path: &Path) -> Option<PathBuf> {
    std::path::absolute(path).ok()
}

fn path_digest(key: &Path) -> String {
    let digest = Sha256::digest(key.to_string_lossy().as_bytes());
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let unique = TMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    let tmp = path.with_extension(format!("{RECORD_EXTENSION}.{}.{unique}.tmp", std::process::id()));
    std::fs::write(&tmp, bytes)?;
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(e.into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use context_symbols::{ExtractedSymbol, SymbolKind};
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    fn symbols_for(path: &Path, content: &[u8]) -> FileSymbols {
        let symbol = ExtractedSymbol::new("run", SymbolKind::Function, "def run()", "app.py", 1);
        FileSymbols::new(path.to_string_lossy(), "python", content, vec![symbol])
    }

    #[test]
    fn test_put_then_get_hits_memory() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("app.py");
        fs::write(&source, b"def run(): pass\n").unwrap();

        let cache = SymbolCache::open(tmp.path().join("cache"), 16).unwrap();
        let stored = symbols_for(&source, b"def run(): pass\n");
        cache.put(&source, &stored).unwrap();

        assert_eq!(cache.get(&source), Some(stored));
        assert_eq!(cache.stats().memory_hits, 1);
        assert_eq!(cache.stats().writes, 1);
    }

    #[test]
    fn test_fresh_instance_reads_disk_and_promotes() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("app.py");
        fs::write(&source, b"x").unwrap();
        let stored = symbols_for(&source, b"x");

        SymbolCache::open(tmp.path().join("cache"), 16)
            .unwrap()
            .put(&source, &stored)
            .unwrap();

        let cache = SymbolCache::open(tmp.path().join("cache"), 16).unwrap();
        assert_eq!(cache.memory_len(), 0);
        assert_eq!(cache.get(&source), Some(stored.clone()));
        assert_eq!(cache.stats().disk_hits, 1);
        assert_eq!(cache.memory_len(), 1);
        assert_eq!(cache.get(&source), Some(stored));
        assert_eq!(cache.stats().memory_hits, 1);
    }

    #[test]
    fn test_hits_leave_the_record_untouched() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("app.py");
        fs::write(&source, b"x").unwrap();
        SymbolCache::open(tmp.path().join("cache"), 16)
            .unwrap()
            .put(&source, &symbols_for(&source, b"x"))
            .unwrap();

        let hex = path_digest(&std::path::absolute(&source).unwrap());
        let record = tmp
            .path()
            .join("cache")
            .join(&hex[0..2])
            .join(format!("{hex}.json"));
        let written = fs::read(&record).unwrap();

        let cache = SymbolCache::open(tmp.path().join("cache"), 16).unwrap();
        assert!(cache.get(&source).is_some());
        assert!(cache.get(&source).is_some());
        assert_eq!(cache.stats().disk_hits, 1);
        assert_eq!(cache.stats().memory_hits, 1);
        assert_eq!(fs::read(&record).unwrap(), written);
    }

    #[test]
    fn test_content_change_is_a_miss_in_both_tiers() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("app.py");
        fs::write(&source, b"def run(): pass\n").unwrap();

        let cache = SymbolCache::open(tmp.path().join("cache"), 16).unwrap();
        cache
            .put(&source, &symbols_for(&source, b"def run(): pass\n"))
            .unwrap();

        fs::write(&source, b"def run(): pas\n").unwrap();
        assert_eq!(cache.get(&source), None);
        assert_eq!(cache.memory_len(), 0);
        assert_eq!(cache.stats().misses, 1);
    }

    #[test]
    fn test_records_are_sharded_by_path_digest() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("app.py");
        let cache = SymbolCache::open(tmp.path().join("cache"), 16).unwrap();
        cache.put(&source, &symbols_for(&source, b"x")).unwrap();

        let hex = path_digest(&std::path::absolute(&source).unwrap());
        let record = tmp
            .path()
            .join("cache")
            .join(&hex[0..2])
            .join(format!("{hex}.json"));
        assert!(record.exists());

        let json: serde_json::Value = serde_json::from_slice(&fs::read(&record).unwrap()).unwrap();
        assert_eq!(json["schema_version"], CACHE_SCHEMA_VERSION);
        assert_eq!(json["symbols"]["content_hash"], content_hash(b"x"));
        assert!(json["written_at_ms"].as_u64().is_some_and(|ms| ms > 0));

        // No temp files left behind
        let leftovers: Vec<_> = WalkDir::new(tmp.path().join("cache"))
            .into_iter()
            .filter_map(std::result::Result::ok)
            .filter(|e| e.path().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_corrupt_record_is_a_miss_and_gets_overwritten() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("app.py");
        fs::write(&source, b"x").unwrap();
        let cache = SymbolCache::open(tmp.path().join("cache"), 16).unwrap();
        let record_path = cache.record_path(&std::path::absolute(&source).unwrap());
        fs::create_dir_all(record_path.parent().unwrap()).unwrap();
        fs::write(&record_path, b"{ not json").unwrap();

        assert_eq!(cache.get(&source), None);

        let stored = symbols_for(&source, b"x");
        cache.put(&source, &stored).unwrap();
        let reopened = SymbolCache::open(tmp.path().join("cache"), 16).unwrap();
        assert_eq!(reopened.get(&source), Some(stored));
    }

    #[test]
    fn test_invalidate_drops_both_tiers() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("app.py");
        fs::write(&source, b"x").unwrap();
        let cache = SymbolCache::open(tmp.path().join("cache"), 16).unwrap();
        cache.put(&source, &symbols_for(&source, b"x")).unwrap();

        cache.invalidate(&source).unwrap();
        assert_eq!(cache.get(&source), None);
        // Invalidating twice is fine
        cache.invalidate(&source).unwrap();
    }

    #[test]
    fn test_clear_stale_removes_unknown_and_corrupt_records() {
        let tmp = TempDir::new().unwrap();
        let keep = tmp.path().join("keep.py");
        let gone = tmp.path().join("gone.py");
        let cache = SymbolCache::open(tmp.path().join("cache"), 16).unwrap();
        cache.put(&keep, &symbols_for(&keep, b"a")).unwrap();
        cache.put(&gone, &symbols_for(&gone, b"b")).unwrap();

        let junk_dir = tmp.path().join("cache").join("zz");
        fs::create_dir_all(&junk_dir).unwrap();
        fs::write(junk_dir.join("junk.json"), b"garbage").unwrap();
        fs::write(junk_dir.join("notes.txt"), b"not a record").unwrap();

        let removed = cache.clear_stale(&[keep.clone()]).unwrap();
        assert_eq!(removed, 2);
        assert!(junk_dir.join("notes.txt").exists());

        fs::write(&keep, b"a").unwrap();
        assert!(cache.get(&keep).is_some());
        assert_eq!(cache.memory_len(), 1);
    }

    #[test]
    fn test_memory_tier_is_bounded() {
        let tmp = TempDir::new().unwrap();
        let cache = SymbolCache::open(tmp.path().join("cache"), 2).unwrap();
        for name in ["a.py", "b.py", "c.py"] {
            let source = tmp.path().join(name);
            cache.put(&source, &symbols_for(&source, b"x")).unwrap();
        }
        assert_eq!(cache.memory_len(), 2);

        // Evicted entries are still served from disk
        let first = tmp.path().join("a.py");
        assert!(cache.lookup(&first, &content_hash(b"x")).is_some());
        assert_eq!(cache.stats().disk_hits, 1);
    }

    #[test]
    fn test_uncreatable_cache_dir_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let blocker = tmp.path().join("file");
        fs::write(&blocker, b"").unwrap();
        let err = SymbolCache::open(blocker.join("cache"), 16).unwrap_err();
        assert!(matches!(err, IndexerError::CacheDir { .. }));
    }
}

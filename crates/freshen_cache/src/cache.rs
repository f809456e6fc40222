//! The change cache: stored facts per file, revalidated against metadata.
//!
//! A [`ChangeCache`] answers "what do I know about this file?" with as little
//! I/O as it can. In permissive mode a lookup stats the file and, when size
//! and change time still match the stored entry, returns the stored facts
//! without reading the content. Otherwise it reads the file, derives fresh
//! facts, and replaces the entry. In strict mode the cache is a frozen
//! snapshot: known files are answered from memory and unknown files are
//! errors.

use std::path::{Path, PathBuf};

use freshen_common::ContentHash;
use tracing::{debug, info, warn};

use crate::error::CacheError;
use crate::facts::{derive_facts, FactsResult};
use crate::fs::{AsyncFileSystem, FileStat, FileSystem, StdFileSystem};
use crate::key::normalize_key;
use crate::snapshot::{self, CacheEntry, EntryMap};

/// Lookup counters accumulated over the life of a cache instance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups answered from stored facts.
    pub hits: u64,
    /// Lookups for files with no stored entry.
    pub misses: u64,
    /// Lookups whose stored entry was stale and had to be recomputed.
    pub rehashes: u64,
}

/// Persistent cache of derived file facts.
///
/// Owns its key → entry mapping outright; lookups take `&mut self`, so
/// sharing one instance between tasks requires the caller's own lock.
#[derive(Debug, Clone)]
pub struct ChangeCache {
    /// Stored entries keyed by normalized path.
    entries: EntryMap,

    /// Prefix stripped from paths to form keys.
    root: String,

    /// Whether lookups are restricted to already-known files.
    strict: bool,

    stats: CacheStats,
}

/// First stage of a lookup: either already answered, or the key that needs
/// filesystem metadata.
enum Probe {
    Answered(FactsResult),
    NeedsStat(String),
}

impl ChangeCache {
    /// Creates an empty, permissive cache.
    pub fn new(root: impl Into<String>) -> Self {
        Self::with_strict_mode(root, false)
    }

    /// Creates an empty cache with an explicit lookup mode.
    pub fn with_strict_mode(root: impl Into<String>, strict: bool) -> Self {
        Self {
            entries: EntryMap::new(),
            root: root.into(),
            strict,
            stats: CacheStats::default(),
        }
    }

    /// Hydrates a strict cache from snapshot bytes produced by [`save`].
    ///
    /// A loaded snapshot is assumed to be complete, so unknown files are
    /// errors rather than misses to fill in.
    ///
    /// [`save`]: ChangeCache::save
    pub fn load(bytes: &[u8], root: impl Into<String>) -> Result<Self, CacheError> {
        Self::load_with_strict_mode(bytes, root, true)
    }

    /// Hydrates a cache from snapshot bytes with an explicit lookup mode.
    pub fn load_with_strict_mode(
        bytes: &[u8],
        root: impl Into<String>,
        strict: bool,
    ) -> Result<Self, CacheError> {
        let entries = snapshot::decode(bytes)?;
        info!(
            entries = entries.len(),
            bytes = bytes.len(),
            strict,
            "loaded cache snapshot"
        );
        Ok(Self {
            entries,
            root: root.into(),
            strict,
            stats: CacheStats::default(),
        })
    }

    /// Reads a snapshot file and hydrates a strict cache from it.
    pub fn load_from_file(path: &Path, root: impl Into<String>) -> Result<Self, CacheError> {
        let bytes = std::fs::read(path).map_err(|e| io_error(path, e))?;
        Self::load(&bytes, root)
    }

    /// Serializes and compresses every entry.
    pub fn save(&self) -> Result<Vec<u8>, CacheError> {
        let bytes = snapshot::encode(&self.entries)?;
        info!(
            entries = self.entries.len(),
            bytes = bytes.len(),
            "saved cache snapshot"
        );
        Ok(bytes)
    }

    /// Writes the snapshot to `path`.
    ///
    /// Missing parent directories are created. The bytes go to a sibling
    /// `.tmp` file first and are renamed into place, so readers never see a
    /// half-written snapshot.
    pub fn save_to_file(&self, path: &Path) -> Result<(), CacheError> {
        let bytes = self.save()?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| io_error(parent, e))?;
        }

        let tmp = temp_path(path);
        std::fs::write(&tmp, &bytes).map_err(|e| io_error(&tmp, e))?;
        std::fs::rename(&tmp, path).map_err(|e| io_error(path, e))
    }

    /// Looks up `path` using blocking `std::fs` access.
    pub fn lookup(&mut self, path: &Path) -> Result<FactsResult, CacheError> {
        self.lookup_with(&StdFileSystem, path)
    }

    /// Looks up `path` using blocking access through `fs`.
    pub fn lookup_with<F>(&mut self, fs: &F, path: &Path) -> Result<FactsResult, CacheError>
    where
        F: FileSystem + ?Sized,
    {
        let key = match self.probe(path)? {
            Probe::Answered(result) => return Ok(result),
            Probe::NeedsStat(key) => key,
        };

        let stat = fs.stat(path).map_err(|e| stat_error(path, e))?;
        if let Some(hit) = self.revalidate(&key, path, &stat)? {
            return Ok(hit);
        }

        let bytes = fs.read(path).map_err(|e| read_error(path, e))?;
        Ok(self.record(key, path, &stat, bytes))
    }

    /// Looks up `path` using non-blocking access through `fs`.
    ///
    /// Same algorithm as [`lookup_with`](ChangeCache::lookup_with); only the
    /// stat and read calls suspend.
    pub async fn lookup_async<F>(&mut self, fs: &F, path: &Path) -> Result<FactsResult, CacheError>
    where
        F: AsyncFileSystem + ?Sized,
    {
        let key = match self.probe(path)? {
            Probe::Answered(result) => return Ok(result),
            Probe::NeedsStat(key) => key,
        };

        let stat = fs.stat(path).await.map_err(|e| stat_error(path, e))?;
        if let Some(hit) = self.revalidate(&key, path, &stat)? {
            return Ok(hit);
        }

        let bytes = fs.read(path).await.map_err(|e| read_error(path, e))?;
        Ok(self.record(key, path, &stat, bytes))
    }

    /// Looks up `path` and returns only its content hash.
    pub fn hash_for_path(&mut self, path: &Path) -> Result<ContentHash, CacheError> {
        self.lookup(path).map(|result| result.hash())
    }

    /// Returns the key `path` is stored under.
    pub fn normalize_key(&self, path: &Path) -> String {
        normalize_key(&self.root, path)
    }

    /// Returns the stored entry for a normalized key.
    pub fn entry(&self, key: &str) -> Option<&CacheEntry> {
        self.entries.get(key)
    }

    /// Iterates over all entries in key order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &CacheEntry)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Drops every entry for which `keep` returns `false`.
    ///
    /// Returns the number of entries removed.
    pub fn retain<F>(&mut self, mut keep: F) -> usize
    where
        F: FnMut(&str, &CacheEntry) -> bool,
    {
        let before = self.entries.len();
        self.entries.retain(|key, entry| keep(key, entry));
        before - self.entries.len()
    }

    /// Returns the number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the root prefix stripped from keys.
    pub fn root(&self) -> &str {
        &self.root
    }

    /// Returns `true` if lookups are restricted to known files.
    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// Switches between strict and permissive lookups.
    pub fn set_strict_mode(&mut self, strict: bool) {
        self.strict = strict;
    }

    /// Returns the lookup counters.
    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    fn probe(&mut self, path: &Path) -> Result<Probe, CacheError> {
        let key = self.normalize_key(path);
        if !self.strict {
            return Ok(Probe::NeedsStat(key));
        }

        match self.entries.get(&key) {
            Some(entry) => {
                self.stats.hits += 1;
                debug!(%key, "strict cache hit");
                Ok(Probe::Answered(FactsResult::from_facts(entry.facts.clone())))
            }
            None => Err(CacheError::CacheMiss {
                path: path.to_path_buf(),
            }),
        }
    }

    /// Returns stored facts if `stat` still matches the entry for `key`.
    /// A stale entry is evicted.
    fn revalidate(
        &mut self,
        key: &str,
        path: &Path,
        stat: &FileStat,
    ) -> Result<Option<FactsResult>, CacheError> {
        if !stat.is_file {
            warn!(path = %path.display(), "lookup target is not a regular file");
            return Err(CacheError::not_a_file(path.to_path_buf()));
        }

        let fresh = self
            .entries
            .get(key)
            .map(|entry| entry.timestamp >= stat.modified_ms && entry.size == stat.size);

        match fresh {
            Some(true) => {
                self.stats.hits += 1;
                debug!(%key, "cache hit");
                let facts = self.entries[key].facts.clone();
                return Ok(Some(FactsResult::from_facts(facts)));
            }
            Some(false) => {
                self.entries.remove(key);
                self.stats.rehashes += 1;
                debug!(%key, size = stat.size, "stale entry, rehashing");
            }
            None => {
                self.stats.misses += 1;
                debug!(%key, "cache miss");
            }
        }
        Ok(None)
    }

    fn record(&mut self, key: String, path: &Path, stat: &FileStat, bytes: Vec<u8>) -> FactsResult {
        let result = derive_facts(&path.to_string_lossy(), bytes);
        self.entries.insert(
            key,
            CacheEntry {
                timestamp: stat.modified_ms,
                size: stat.size,
                facts: result.facts().clone(),
            },
        );
        result
    }
}

fn stat_error(path: &Path, source: std::io::Error) -> CacheError {
    CacheError::Stat {
        path: path.to_path_buf(),
        source,
    }
}

fn read_error(path: &Path, source: std::io::Error) -> CacheError {
    CacheError::Read {
        path: path.to_path_buf(),
        source,
    }
}

fn io_error(path: &Path, source: std::io::Error) -> CacheError {
    CacheError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};
    use std::collections::{HashMap, HashSet};
    use std::io;

    /// In-memory filesystem that counts every stat and read.
    #[derive(Default)]
    struct MemoryFs {
        files: RefCell<HashMap<PathBuf, (Vec<u8>, u64)>>,
        dirs: HashSet<PathBuf>,
        unreadable: HashSet<PathBuf>,
        stats: Cell<usize>,
        reads: Cell<usize>,
    }

    impl MemoryFs {
        fn write(&self, path: &str, content: &[u8], modified_ms: u64) {
            self.files
                .borrow_mut()
                .insert(PathBuf::from(path), (content.to_vec(), modified_ms));
        }
    }

    impl FileSystem for MemoryFs {
        fn stat(&self, path: &Path) -> io::Result<FileStat> {
            self.stats.set(self.stats.get() + 1);
            if self.dirs.contains(path) {
                return Ok(FileStat {
                    size: 0,
                    modified_ms: 0,
                    is_file: false,
                });
            }
            self.files
                .borrow()
                .get(path)
                .map(|(content, modified_ms)| FileStat {
                    size: content.len() as u64,
                    modified_ms: *modified_ms,
                    is_file: true,
                })
                .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no such file"))
        }

        fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
            self.reads.set(self.reads.get() + 1);
            if self.unreadable.contains(path) {
                return Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied"));
            }
            self.files
                .borrow()
                .get(path)
                .map(|(content, _)| content.clone())
                .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no such file"))
        }
    }

    const APP_JS: &str = "/project/src/app.js";

    #[test]
    fn hit_path_never_rereads() {
        let fs = MemoryFs::default();
        fs.write(APP_JS, b"console.log('hi');\n", 1_000);
        let mut cache = ChangeCache::new("/project");

        let first = cache.lookup_with(&fs, Path::new(APP_JS)).unwrap();
        assert!(first.has_content());
        assert_eq!(fs.reads.get(), 1);

        for _ in 0..3 {
            let again = cache.lookup_with(&fs, Path::new(APP_JS)).unwrap();
            assert_eq!(again.facts(), first.facts());
            assert!(!again.has_content());
        }
        assert_eq!(fs.reads.get(), 1);
        assert_eq!(
            cache.stats(),
            CacheStats {
                hits: 3,
                misses: 1,
                rehashes: 0
            }
        );
    }

    #[test]
    fn size_change_rehashes_once() {
        let fs = MemoryFs::default();
        fs.write(APP_JS, b"let a = 1;", 1_000);
        let mut cache = ChangeCache::new("/project");
        let before = cache.lookup_with(&fs, Path::new(APP_JS)).unwrap();

        fs.write(APP_JS, b"let a = 1; let b = 2;", 1_000);
        let after = cache.lookup_with(&fs, Path::new(APP_JS)).unwrap();

        assert_ne!(before.hash(), after.hash());
        assert_eq!(after.source_text(), Some("let a = 1; let b = 2;"));
        assert_eq!(fs.reads.get(), 2);
        assert_eq!(cache.stats().rehashes, 1);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.entry("/src/app.js").unwrap().size, 21);
    }

    #[test]
    fn newer_timestamp_rehashes() {
        let fs = MemoryFs::default();
        fs.write(APP_JS, b"let a = 1;", 1_000);
        let mut cache = ChangeCache::new("/project");
        let before = cache.lookup_with(&fs, Path::new(APP_JS)).unwrap();

        fs.write(APP_JS, b"let a = 2;", 2_000);
        let after = cache.lookup_with(&fs, Path::new(APP_JS)).unwrap();

        assert_ne!(before.hash(), after.hash());
        assert_eq!(fs.reads.get(), 2);
        assert_eq!(cache.entry("/src/app.js").unwrap().timestamp, 2_000);
    }

    #[test]
    fn older_timestamp_is_still_a_hit() {
        let fs = MemoryFs::default();
        fs.write(APP_JS, b"let a = 1;", 5_000);
        let mut cache = ChangeCache::new("/project");
        cache.lookup_with(&fs, Path::new(APP_JS)).unwrap();

        fs.write(APP_JS, b"let a = 1;", 4_000);
        cache.lookup_with(&fs, Path::new(APP_JS)).unwrap();
        assert_eq!(fs.reads.get(), 1);
        assert_eq!(cache.stats().hits, 1);
    }

    #[test]
    fn strict_unknown_key_is_cache_miss_without_stat() {
        let fs = MemoryFs::default();
        fs.write(APP_JS, b"let a = 1;", 1_000);
        let mut cache = ChangeCache::with_strict_mode("/project", true);

        let err = cache.lookup_with(&fs, Path::new(APP_JS)).unwrap_err();
        match err {
            CacheError::CacheMiss { path } => assert_eq!(path, PathBuf::from(APP_JS)),
            other => panic!("expected CacheMiss, got {other:?}"),
        }
        assert_eq!(fs.stats.get(), 0);
        assert_eq!(fs.reads.get(), 0);
    }

    #[test]
    fn strict_known_key_skips_filesystem() {
        let fs = MemoryFs::default();
        fs.write(APP_JS, b"let a = 1;", 1_000);
        let mut warm = ChangeCache::new("/project");
        let computed = warm.lookup_with(&fs, Path::new(APP_JS)).unwrap();

        let mut frozen = ChangeCache::load(&warm.save().unwrap(), "/project").unwrap();
        assert!(frozen.is_strict());

        // Even a changed file is answered from the snapshot.
        fs.write(APP_JS, b"something else entirely", 9_000);
        let stats_before = fs.stats.get();
        let answered = frozen.lookup_with(&fs, Path::new(APP_JS)).unwrap();

        assert_eq!(answered.facts(), computed.facts());
        assert!(!answered.has_content());
        assert_eq!(fs.stats.get(), stats_before);
    }

    #[test]
    fn missing_file_is_stat_error() {
        let fs = MemoryFs::default();
        let mut cache = ChangeCache::new("");
        let err = cache
            .lookup_with(&fs, Path::new("/nope.js"))
            .unwrap_err();
        assert!(matches!(err, CacheError::Stat { .. }));
        assert!(cache.is_empty());
    }

    #[test]
    fn directory_is_stat_error() {
        let mut fs = MemoryFs::default();
        fs.dirs.insert(PathBuf::from("/project/src"));
        let mut cache = ChangeCache::new("/project");
        let err = cache
            .lookup_with(&fs, Path::new("/project/src"))
            .unwrap_err();
        assert!(matches!(err, CacheError::Stat { .. }));
        assert_eq!(fs.reads.get(), 0);
    }

    #[test]
    fn unreadable_file_is_read_error() {
        let mut fs = MemoryFs::default();
        fs.write(APP_JS, b"secret", 1_000);
        fs.unreadable.insert(PathBuf::from(APP_JS));
        let mut cache = ChangeCache::new("/project");

        let err = cache.lookup_with(&fs, Path::new(APP_JS)).unwrap_err();
        assert!(matches!(err, CacheError::Read { .. }));
        assert!(cache.is_empty());
    }

    #[test]
    fn stale_entry_is_evicted_under_its_key() {
        let mut fs = MemoryFs::default();
        fs.write(APP_JS, b"v1", 1_000);
        let mut cache = ChangeCache::new("/project");
        cache.lookup_with(&fs, Path::new(APP_JS)).unwrap();
        assert!(cache.entry("/src/app.js").is_some());

        fs.write(APP_JS, b"v22", 2_000);
        fs.unreadable.insert(PathBuf::from(APP_JS));
        assert!(cache.lookup_with(&fs, Path::new(APP_JS)).is_err());
        assert!(cache.entry("/src/app.js").is_none());
    }

    #[test]
    fn save_load_roundtrip() {
        let fs = MemoryFs::default();
        fs.write("/project/a.js", b"let a = 1;\n//# sourceMappingURL=a.map", 1_000);
        fs.write("/project/node_modules/x/i.js", &b"x".repeat(200), 2_000);
        fs.write("/project/img.bin", &[0u8; 128], 3_000);

        let mut cache = ChangeCache::new("/project");
        for path in ["/project/a.js", "/project/node_modules/x/i.js", "/project/img.bin"] {
            cache.lookup_with(&fs, Path::new(path)).unwrap();
        }

        let loaded = ChangeCache::load(&cache.save().unwrap(), "/project").unwrap();
        assert_eq!(loaded.len(), 3);
        for (key, entry) in cache.entries() {
            assert_eq!(loaded.entry(key), Some(entry), "mismatch for {key}");
        }

        let binary = loaded.entry("/img.bin").unwrap();
        assert!(binary.facts.is_file_binary);
        let vendored = loaded.entry("/node_modules/x/i.js").unwrap();
        assert!(vendored.facts.is_in_dependency_directory);
        assert!(vendored.facts.is_minified);
        assert!(loaded.entry("/a.js").unwrap().facts.has_source_map_reference);
    }

    #[test]
    fn case_variant_directories_keep_separate_entries() {
        let fs = MemoryFs::default();
        fs.write("/x/PROJ/a.js", b"let b = 2;", 1_000);
        fs.write("/x/proj/a.js", b"let a = 1;", 1_000);
        let mut cache = ChangeCache::new("/x/proj");

        let lower = cache.lookup_with(&fs, Path::new("/x/proj/a.js")).unwrap();
        let upper = cache.lookup_with(&fs, Path::new("/x/PROJ/a.js")).unwrap();

        assert_ne!(lower.hash(), upper.hash());
        assert_eq!(upper.hash(), ContentHash::from_text("let b = 2;"));
        assert_eq!(fs.reads.get(), 2);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn retain_drops_unwanted_entries() {
        let fs = MemoryFs::default();
        fs.write("/project/keep.js", b"keep", 1_000);
        fs.write("/project/drop.js", b"drop", 1_000);
        let mut cache = ChangeCache::new("/project");
        cache.lookup_with(&fs, Path::new("/project/keep.js")).unwrap();
        cache.lookup_with(&fs, Path::new("/project/drop.js")).unwrap();

        let removed = cache.retain(|key, _| key != "/drop.js");
        assert_eq!(removed, 1);
        assert_eq!(cache.len(), 1);
        assert!(cache.entry("/keep.js").is_some());
    }

    #[test]
    fn load_rejects_corrupt_snapshot() {
        let err = ChangeCache::load(b"\x1f\x8bnot really gzip", "").unwrap_err();
        assert!(matches!(err, CacheError::Deserialize { .. }));
    }

    #[test]
    fn warm_permissive_cache_from_snapshot() {
        let fs = MemoryFs::default();
        fs.write(APP_JS, b"let a = 1;", 1_000);
        let mut cache = ChangeCache::new("/project");
        cache.lookup_with(&fs, Path::new(APP_JS)).unwrap();

        let mut warm =
            ChangeCache::load_with_strict_mode(&cache.save().unwrap(), "/project", false).unwrap();
        warm.lookup_with(&fs, Path::new(APP_JS)).unwrap();
        assert_eq!(fs.reads.get(), 1);
        assert_eq!(warm.stats().hits, 1);
    }

    #[test]
    fn set_strict_mode_toggles_lookups() {
        let fs = MemoryFs::default();
        fs.write(APP_JS, b"let a = 1;", 1_000);
        let mut cache = ChangeCache::new("/project");
        cache.set_strict_mode(true);
        assert!(cache.lookup_with(&fs, Path::new(APP_JS)).is_err());

        cache.set_strict_mode(false);
        assert!(cache.lookup_with(&fs, Path::new(APP_JS)).is_ok());
        assert_eq!(cache.root(), "/project");
    }

    #[test]
    fn real_files_and_snapshot_file() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_string_lossy().into_owned();
        let src = dir.path().join("main.js");
        std::fs::write(&src, "export const x = 1;\n").unwrap();

        let mut cache = ChangeCache::new(root.clone());
        let hash = cache.hash_for_path(&src).unwrap();
        assert_eq!(hash, ContentHash::from_text("export const x = 1;\n"));
        assert_eq!(cache.normalize_key(&src), "/main.js");

        let snapshot = dir.path().join("cache").join("snapshot.json.gz");
        cache.save_to_file(&snapshot).unwrap();
        assert!(snapshot.exists());
        assert!(!temp_path(&snapshot).exists());

        let mut loaded = ChangeCache::load_from_file(&snapshot, root).unwrap();
        assert_eq!(loaded.hash_for_path(&src).unwrap(), hash);
    }

    #[test]
    fn load_from_missing_file_is_io_error() {
        let err = ChangeCache::load_from_file(Path::new("/nonexistent/cache.gz"), "").unwrap_err();
        assert!(matches!(err, CacheError::Io { .. }));
    }

    #[tokio::test]
    async fn async_lookup_matches_blocking() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("style.css");
        std::fs::write(&src, "body{margin:0}\n").unwrap();

        let mut blocking = ChangeCache::new("");
        let expected = blocking.lookup(&src).unwrap();

        let mut non_blocking = ChangeCache::new("");
        let fs = crate::fs::TokioFileSystem;
        let first = non_blocking.lookup_async(&fs, &src).await.unwrap();
        let second = non_blocking.lookup_async(&fs, &src).await.unwrap();

        assert_eq!(first, expected);
        assert_eq!(second.facts(), expected.facts());
        assert!(!second.has_content());
        assert_eq!(non_blocking.stats().hits, 1);
    }
}

//! Load Gate
//!
//! Cache-or-text load policy plus the process-wide load gate: concurrent
//! first callers block on one mutex, exactly one load runs, and every
//! caller receives the same shared store.

use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{info, warn};

use super::cache;
use super::vectors::VectorStore;
use crate::error::Result;

impl VectorStore {
    /// Load from the compact cache when present, otherwise parse the
    /// textual source and persist the cache for the next startup.
    ///
    /// A cache that fails validation is ignored and rewritten; only an
    /// unreadable textual source is fatal.
    pub fn load_or_cached(
        source: impl AsRef<Path>,
        cache_path: impl AsRef<Path>,
    ) -> Result<Self> {
        let source = source.as_ref();
        let cache_path = cache_path.as_ref();

        if cache_path.exists() {
            match cache::load(cache_path) {
                Ok(store) => return Ok(store),
                Err(e) => {
                    warn!(error = %e, "embedding cache unusable, re-parsing text source");
                }
            }
        }

        let store = Self::load(source)?;
        if let Err(e) = cache::save(&store, cache_path) {
            // Next startup pays the parse again, nothing else breaks
            warn!(error = %e, "failed to write embedding cache");
        }
        Ok(store)
    }
}

/// Serializes the first load; hands out the shared store afterwards.
pub struct StoreLoader {
    slot: Mutex<Option<Arc<VectorStore>>>,
}

impl Default for StoreLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl StoreLoader {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
        }
    }

    /// Return the loaded store, loading it on first call.
    ///
    /// The lock is held for the full load, so concurrent first callers
    /// block until the single load completes. A failed load leaves the
    /// slot empty; embedding load is meant to be fatal at startup, the
    /// retry opportunity exists for callers that can recover the source.
    pub fn get_or_load(
        &self,
        source: impl AsRef<Path>,
        cache_path: impl AsRef<Path>,
    ) -> Result<Arc<VectorStore>> {
        let mut slot = self.slot.lock();
        if let Some(store) = slot.as_ref() {
            return Ok(Arc::clone(store));
        }

        info!(source = %source.as_ref().display(), "loading embedding table");
        let store = Arc::new(VectorStore::load_or_cached(source, cache_path)?);
        *slot = Some(Arc::clone(&store));
        Ok(store)
    }

    /// The store, if a load already completed.
    pub fn get(&self) -> Option<Arc<VectorStore>> {
        self.slot.lock().clone()
    }

    /// Seed the loader with an already constructed store.
    ///
    /// Returns `false` without replacing anything when a store is
    /// already present.
    pub fn install(&self, store: Arc<VectorStore>) -> bool {
        let mut slot = self.slot.lock();
        if slot.is_some() {
            return false;
        }
        *slot = Some(store);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    fn write_source(dir: &Path) -> std::path::PathBuf {
        let path = dir.join("small.vec");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "2 3").unwrap();
        writeln!(file, "신문 1.0 0.0 0.0").unwrap();
        writeln!(file, "뉴스 0.9 0.1 0.0").unwrap();
        path
    }

    #[test]
    fn test_load_or_cached_writes_cache() {
        let dir = tempdir().unwrap();
        let source = write_source(dir.path());
        let cache_path = dir.path().join("small.wsvc");

        let store = VectorStore::load_or_cached(&source, &cache_path).unwrap();
        assert_eq!(store.len(), 2);
        assert!(cache_path.exists());

        // Second load comes from the cache even without the source
        std::fs::remove_file(&source).unwrap();
        let cached = VectorStore::load_or_cached(&source, &cache_path).unwrap();
        assert_eq!(cached.len(), 2);
        assert!(cached.contains("뉴스"));
    }

    #[test]
    fn test_corrupt_cache_falls_back_to_text() {
        let dir = tempdir().unwrap();
        let source = write_source(dir.path());
        let cache_path = dir.path().join("small.wsvc");
        std::fs::write(&cache_path, b"garbage").unwrap();

        let store = VectorStore::load_or_cached(&source, &cache_path).unwrap();
        assert_eq!(store.len(), 2);
        // Cache was rewritten with valid contents
        let reloaded = super::cache::load(&cache_path).unwrap();
        assert_eq!(reloaded.len(), 2);
    }

    #[test]
    fn test_loader_loads_once() {
        let dir = tempdir().unwrap();
        let source = write_source(dir.path());
        let cache_path = dir.path().join("small.wsvc");

        let loader = StoreLoader::new();
        assert!(loader.get().is_none());

        let first = loader.get_or_load(&source, &cache_path).unwrap();
        let second = loader.get_or_load(&source, &cache_path).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(loader.get().is_some());
    }

    #[test]
    fn test_loader_concurrent_first_access() {
        let dir = tempdir().unwrap();
        let source = write_source(dir.path());
        let cache_path = dir.path().join("small.wsvc");

        let loader = Arc::new(StoreLoader::new());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let loader = Arc::clone(&loader);
            let source = source.clone();
            let cache_path = cache_path.clone();
            handles.push(std::thread::spawn(move || {
                loader.get_or_load(&source, &cache_path).unwrap()
            }));
        }

        let stores: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        for store in &stores[1..] {
            assert!(Arc::ptr_eq(&stores[0], store));
        }
    }

    #[test]
    fn test_cache_and_text_loads_rank_identically() {
        use crate::ranking::RankingEngine;

        let dir = tempdir().unwrap();
        let path = dir.path().join("news.vec");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "5 3").unwrap();
        writeln!(file, "신문 1.0 0.0 0.0").unwrap();
        writeln!(file, "기사 0.98 0.2 0.0").unwrap();
        writeln!(file, "뉴스 0.95 0.3 0.0").unwrap();
        writeln!(file, "잡지 0.85 0.5 0.0").unwrap();
        writeln!(file, "세탁 0.05 1.0 0.0").unwrap();

        let from_text = Arc::new(VectorStore::load(&path).unwrap());
        let cache_path = dir.path().join("news.wsvc");
        super::cache::save(&from_text, &cache_path).unwrap();
        let from_cache = Arc::new(super::cache::load(&cache_path).unwrap());

        let candidates = ["기사", "뉴스", "잡지", "세탁"];
        let text_ranked = RankingEngine::new(from_text).rank("신문", candidates).unwrap();
        let cache_ranked = RankingEngine::new(from_cache).rank("신문", candidates).unwrap();
        assert_eq!(text_ranked, cache_ranked);
    }

    #[test]
    fn test_install_rejects_second_store() {
        let loader = StoreLoader::new();
        let store = Arc::new(
            VectorStore::from_entries(2, vec![("a", vec![1.0, 0.0])]).unwrap(),
        );
        assert!(loader.install(Arc::clone(&store)));
        assert!(!loader.install(store));
    }
}

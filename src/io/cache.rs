//! Result cache for external chorus-window detectors
//!
//! Detectors that are slow to run store their answer per song under a string
//! key. The backing store is pluggable: [`MemoryCache`] for tests and
//! one-off runs, [`JsonFileCache`] for a directory of JSON files that
//! survives between runs.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};

use crate::error::StructureError;

/// Detected chorus window
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChorusWindow {
    /// Window start in seconds
    pub start: f64,
    /// Window length in seconds
    pub clip_length: f64,
}

/// Cache key for one song of a dataset
pub fn cache_key(dataset: &str, index: usize, title: &str) -> String {
    format!("{}-{}-{}", dataset, index, title)
}

/// Key-value store for detector results
pub trait ResultCache: Send + Sync {
    /// Look up a stored window
    fn get(&self, key: &str) -> Result<Option<ChorusWindow>, StructureError>;

    /// Store a window, replacing any previous value
    fn put(&self, key: &str, window: &ChorusWindow) -> Result<(), StructureError>;
}

/// In-memory cache
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, ChorusWindow>>,
}

impl MemoryCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    /// True if nothing is stored
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Entries are single inserts of `Copy` values, so a poisoned map is still whole
    fn entries(&self) -> MutexGuard<'_, HashMap<String, ChorusWindow>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ResultCache for MemoryCache {
    fn get(&self, key: &str) -> Result<Option<ChorusWindow>, StructureError> {
        Ok(self.entries().get(key).copied())
    }

    fn put(&self, key: &str, window: &ChorusWindow) -> Result<(), StructureError> {
        self.entries().insert(key.to_string(), *window);
        Ok(())
    }
}

/// Directory of `<key>.json` files
#[derive(Debug, Clone)]
pub struct JsonFileCache {
    dir: PathBuf,
}

impl JsonFileCache {
    /// Open a cache directory, creating it if needed
    ///
    /// # Errors
    ///
    /// Returns `StructureError::IoError` if the directory cannot be created
    pub fn new<P: AsRef<Path>>(dir: P) -> Result<Self, StructureError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Cache directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn file_for(&self, key: &str) -> PathBuf {
        let name: String = key
            .chars()
            .map(|c| if c == '/' || c == '\\' { '_' } else { c })
            .collect();
        self.dir.join(format!("{}.json", name))
    }
}

impl ResultCache for JsonFileCache {
    fn get(&self, key: &str) -> Result<Option<ChorusWindow>, StructureError> {
        let path = self.file_for(key);
        if !path.exists() {
            return Ok(None);
        }
        let text = fs::read_to_string(&path)?;
        let window = serde_json::from_str(&text)?;
        Ok(Some(window))
    }

    fn put(&self, key: &str, window: &ChorusWindow) -> Result<(), StructureError> {
        let path = self.file_for(key);
        log::info!("Writing detector result to cache: {}", path.display());
        fs::write(&path, serde_json::to_string(window)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_cache() {
        let cache = MemoryCache::new();
        assert!(cache.is_empty());
        assert_eq!(cache.get("a").unwrap(), None);

        let w = ChorusWindow { start: 42.0, clip_length: 25.0 };
        cache.put("a", &w).unwrap();
        assert_eq!(cache.get("a").unwrap(), Some(w));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_memory_cache_survives_poisoned_lock() {
        let cache = MemoryCache::new();
        let w = ChorusWindow { start: 8.0, clip_length: 30.0 };
        cache.put("a", &w).unwrap();

        let _ = std::thread::scope(|scope| {
            scope
                .spawn(|| {
                    let _guard = cache.entries.lock();
                    panic!("worker died holding the cache lock");
                })
                .join()
        });
        assert!(cache.entries.is_poisoned());

        // Size and lookups agree on the surviving contents
        assert_eq!(cache.len(), 1);
        assert!(!cache.is_empty());
        assert_eq!(cache.get("a").unwrap(), Some(w));
        cache.put("b", &w).unwrap();
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_json_file_cache_persists() {
        let dir = tempfile::tempdir().unwrap();
        let key = cache_key("RWC", 3, "a/b song");
        let w = ChorusWindow { start: 12.5, clip_length: 30.0 };
        {
            let cache = JsonFileCache::new(dir.path().join("refrain")).unwrap();
            assert_eq!(cache.get(&key).unwrap(), None);
            cache.put(&key, &w).unwrap();
        }
        let reopened = JsonFileCache::new(dir.path().join("refrain")).unwrap();
        assert_eq!(reopened.get(&key).unwrap(), Some(w));
        assert!(reopened.dir().join("RWC-3-a_b song.json").exists());
    }

    #[test]
    fn test_json_file_cache_corrupt_entry() {
        let dir = tempfile::tempdir().unwrap();
        let cache = JsonFileCache::new(dir.path()).unwrap();
        fs::write(dir.path().join("bad.json"), "{ not json").unwrap();
        assert!(matches!(cache.get("bad"), Err(StructureError::CacheError(_))));
    }
}

//! On-disk cache of dependency scan results.
//!
//! Entries are content addressed: the key is the SHA-256 of the artifact
//! coordinates, file size, modification time and canonical path, so a
//! rebuilt or moved JAR simply misses. `cache-info.json` records the entry
//! format; opening a cache written in another format purges every entry.

use anyhow::{Context, Result};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::AnalysisError;
use crate::models::ParsingContext;
use crate::utils::hash::calculate_sha256;

pub const CACHE_FORMAT: &str = "osgi-deps-cache-1";
const CACHE_INFO_FILE: &str = "cache-info.json";
const OBJECTS_DIR: &str = "objects";

#[derive(Debug, Serialize, Deserialize)]
struct CacheInfo {
    format: String,
}

/// Key of the cache entry for one artifact file.
pub fn cache_key(coordinates: &str, file_size: u64, last_modified: i64, path: &Path) -> String {
    let input = format!(
        "{}\n{}\n{}\n{}",
        coordinates,
        file_size,
        last_modified,
        path.to_string_lossy()
    );
    calculate_sha256(input.as_bytes())
}

pub struct ParsingContextCache {
    root: PathBuf,
    hits: usize,
    misses: usize,
}

impl ParsingContextCache {
    /// Opens (creating if needed) the cache rooted at `dir`.
    pub fn open(dir: &Path) -> Result<Self> {
        let objects = dir.join(OBJECTS_DIR);
        fs::create_dir_all(&objects).map_err(|e| AnalysisError::CacheDirectory {
            path: dir.to_path_buf(),
            message: e.to_string(),
        })?;

        let cache = ParsingContextCache {
            root: dir.to_path_buf(),
            hits: 0,
            misses: 0,
        };
        cache.check_format()?;
        Ok(cache)
    }

    fn check_format(&self) -> Result<()> {
        let info_path = self.root.join(CACHE_INFO_FILE);
        let current = fs::read_to_string(&info_path)
            .ok()
            .and_then(|content| serde_json::from_str::<CacheInfo>(&content).ok())
            .map(|info| info.format);

        if current.as_deref() == Some(CACHE_FORMAT) {
            return Ok(());
        }

        if let Some(format) = &current {
            info!(
                "Cache format changed from {} to {}, purging {:?}",
                format, CACHE_FORMAT, self.root
            );
        }
        let objects = self.root.join(OBJECTS_DIR);
        if objects.exists() {
            fs::remove_dir_all(&objects)
                .with_context(|| format!("Failed to purge cache {:?}", objects))?;
        }
        fs::create_dir_all(&objects).map_err(|e| AnalysisError::CacheDirectory {
            path: self.root.clone(),
            message: e.to_string(),
        })?;

        let info = CacheInfo {
            format: CACHE_FORMAT.to_string(),
        };
        fs::write(&info_path, serde_json::to_string_pretty(&info)?)
            .with_context(|| format!("Failed to write {:?}", info_path))?;
        Ok(())
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        let shard = key.get(..2).unwrap_or("00");
        self.root
            .join(OBJECTS_DIR)
            .join(shard)
            .join(format!("{}.json", key))
    }

    /// Restores the context stored under `key`. Corrupt entries are removed
    /// and count as misses.
    pub fn get(&mut self, key: &str) -> Option<ParsingContext> {
        let path = self.entry_path(key);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(_) => {
                self.misses += 1;
                return None;
            }
        };

        match serde_json::from_str::<ParsingContext>(&content) {
            Ok(context) => {
                self.hits += 1;
                Some(context)
            }
            Err(e) => {
                warn!("Discarding corrupt cache entry {:?}: {}", path, e);
                if let Err(e) = fs::remove_file(&path) {
                    debug!("Failed to remove {:?}: {:?}", path, e);
                }
                self.misses += 1;
                None
            }
        }
    }

    pub fn put(&self, key: &str, context: &ParsingContext) -> Result<()> {
        let path = self.entry_path(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {:?}", parent))?;
        }
        let json = serde_json::to_string(context)?;
        fs::write(&path, json).with_context(|| format!("Failed to write {:?}", path))?;
        Ok(())
    }

    pub fn hits(&self) -> usize {
        self.hits
    }

    pub fn misses(&self) -> usize {
        self.misses
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_context() -> ParsingContext {
        let mut context = ParsingContext::new("org.example", "lib", "1.0");
        context.location = "lib-1.0.jar".to_string();
        context.observe_package("org.example.lib", Some("1.0"), None);
        context
    }

    #[test]
    fn test_put_then_get_counts_hits() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let mut cache = ParsingContextCache::open(temp_dir.path()).unwrap();
        let key = cache_key("org.example:lib:jar:1.0", 10, 1000, Path::new("/m2/lib.jar"));

        assert!(cache.get(&key).is_none());
        cache.put(&key, &sample_context()).unwrap();
        assert_eq!(cache.get(&key), Some(sample_context()));
        assert_eq!((cache.hits(), cache.misses()), (1, 1));

        let entry = temp_dir
            .path()
            .join("objects")
            .join(&key[..2])
            .join(format!("{}.json", key));
        assert!(entry.is_file());
    }

    #[test]
    fn test_key_changes_with_file_metadata() {
        let path = Path::new("/m2/lib.jar");
        let key = cache_key("g:a:jar:1", 10, 1000, path);
        assert_eq!(key.len(), 64);
        assert_ne!(key, cache_key("g:a:jar:1", 11, 1000, path));
        assert_ne!(key, cache_key("g:a:jar:1", 10, 1001, path));
        assert_ne!(key, cache_key("g:a:jar:1", 10, 1000, Path::new("/other/lib.jar")));
        assert_ne!(key, cache_key("g:a:jar:2", 10, 1000, path));
    }

    #[test]
    fn test_corrupt_entry_is_removed() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let mut cache = ParsingContextCache::open(temp_dir.path()).unwrap();
        let key = cache_key("g:a:jar:1", 1, 1, Path::new("a.jar"));
        let path = cache.entry_path(&key);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "{ truncated").unwrap();

        assert!(cache.get(&key).is_none());
        assert!(!path.exists());
        assert_eq!(cache.misses(), 1);
    }

    #[test]
    fn test_format_mismatch_purges_entries() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let key = cache_key("g:a:jar:1", 1, 1, Path::new("a.jar"));
        {
            let cache = ParsingContextCache::open(temp_dir.path()).unwrap();
            cache.put(&key, &sample_context()).unwrap();
        }
        fs::write(
            temp_dir.path().join(CACHE_INFO_FILE),
            r#"{"format": "osgi-deps-cache-0"}"#,
        )
        .unwrap();

        let mut cache = ParsingContextCache::open(temp_dir.path()).unwrap();
        assert!(cache.get(&key).is_none());
        let info = fs::read_to_string(temp_dir.path().join(CACHE_INFO_FILE)).unwrap();
        assert!(info.contains(CACHE_FORMAT));
    }

    #[test]
    fn test_uncreatable_directory_is_fatal() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let blocker = temp_dir.path().join("file");
        fs::write(&blocker, "not a directory").unwrap();

        let err = ParsingContextCache::open(&blocker.join("cache"))
            .err()
            .expect("opening below a file must fail");
        assert!(matches!(
            err.downcast_ref::<AnalysisError>(),
            Some(AnalysisError::CacheDirectory { .. })
        ));
    }
}

// Copyright 2025 Promptshift Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Persistent store for adapted prompts, keyed by `(name, language)`.
//!
//! Translation calls cost money and are not idempotent in cost, so a
//! cached adaptation is always preferred over re-translating. Two
//! conforming stores ship here: an in-process [`MemoryCache`] and a
//! [`FileCache`] laying out one JSON document per prompt at
//! `<dir>/<language>/<name>.json`.

use async_trait::async_trait;
use moka::future::Cache;
use promptshift_core::{LanguageTag, StructuredPrompt};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

/// Errors from cache stores. Never swallowed: a failed read or write
/// surfaces to the adaptation caller.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("cache key component {component:?} is not usable as a path element")]
    InvalidKey { component: String },
}

/// Key-value store for adapted prompts.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Look up the adaptation of `name` into `language`.
    async fn get(
        &self,
        name: &str,
        language: &LanguageTag,
    ) -> Result<Option<StructuredPrompt>, CacheError>;

    /// Persist an adapted prompt under `(prompt.name, prompt.language)`.
    /// Concurrent writers of the same key produce identical validated
    /// content, so last-write-wins is harmless.
    async fn put(&self, prompt: &StructuredPrompt) -> Result<(), CacheError>;

    /// Drop a cached adaptation. Invalidation policy is the caller's
    /// concern; the adapter itself never invalidates.
    async fn invalidate(&self, name: &str, language: &LanguageTag) -> Result<(), CacheError>;
}

/// Hit/miss counters for a cache store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
}

/// In-process cache, useful for tests and single-run tooling.
pub struct MemoryCache {
    cache: Cache<(String, String), StructuredPrompt>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self {
            cache: Cache::builder().max_capacity(10_000).build(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;

        CacheStats {
            hits,
            misses,
            hit_rate: if total > 0 {
                hits as f64 / total as f64
            } else {
                0.0
            },
        }
    }

    fn key(name: &str, language: &LanguageTag) -> (String, String) {
        (name.to_string(), language.as_str().to_string())
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn get(
        &self,
        name: &str,
        language: &LanguageTag,
    ) -> Result<Option<StructuredPrompt>, CacheError> {
        match self.cache.get(&Self::key(name, language)).await {
            Some(prompt) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Ok(Some(prompt))
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                Ok(None)
            }
        }
    }

    async fn put(&self, prompt: &StructuredPrompt) -> Result<(), CacheError> {
        self.cache
            .insert(Self::key(&prompt.name, &prompt.language), prompt.clone())
            .await;
        Ok(())
    }

    async fn invalidate(&self, name: &str, language: &LanguageTag) -> Result<(), CacheError> {
        self.cache.invalidate(&Self::key(name, language)).await;
        Ok(())
    }
}

/// File-backed cache: one pretty-printed JSON document per adapted
/// prompt, grouped by language directory.
pub struct FileCache {
    dir: PathBuf,
}

impl FileCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Cache directory from `PROMPTSHIFT_CACHE_HOME`, falling back to
    /// `$HOME/.cache/promptshift`.
    pub fn default_dir() -> Option<PathBuf> {
        if let Ok(dir) = std::env::var("PROMPTSHIFT_CACHE_HOME") {
            return Some(PathBuf::from(dir));
        }
        std::env::var_os("HOME").map(|home| Path::new(&home).join(".cache").join("promptshift"))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, name: &str, language: &LanguageTag) -> Result<PathBuf, CacheError> {
        // Both key halves become path elements; separators or dot
        // prefixes would escape the cache directory.
        check_component(name)?;
        check_component(language.as_str())?;
        Ok(self
            .dir
            .join(language.as_str())
            .join(format!("{name}.json")))
    }
}

fn check_component(component: &str) -> Result<(), CacheError> {
    if component.is_empty()
        || component.contains(['/', '\\', '\0'])
        || component.starts_with('.')
    {
        return Err(CacheError::InvalidKey {
            component: component.to_string(),
        });
    }
    Ok(())
}

#[async_trait]
impl CacheStore for FileCache {
    async fn get(
        &self,
        name: &str,
        language: &LanguageTag,
    ) -> Result<Option<StructuredPrompt>, CacheError> {
        let path = self.entry_path(name, language)?;
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let prompt = serde_json::from_slice(&bytes)?;
        Ok(Some(prompt))
    }

    async fn put(&self, prompt: &StructuredPrompt) -> Result<(), CacheError> {
        let path = self.entry_path(&prompt.name, &prompt.language)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        // Write-then-rename keeps readers from seeing partial entries.
        let tmp = path.with_extension(format!("json.tmp.{}", std::process::id()));
        let bytes = serde_json::to_vec_pretty(prompt)?;
        std::fs::write(&tmp, bytes)?;
        std::fs::rename(&tmp, &path)?;
        Ok(())
    }

    async fn invalidate(&self, name: &str, language: &LanguageTag) -> Result<(), CacheError> {
        let path = self.entry_path(name, language)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

//! On-disk template cache.
//!
//! Layout under the cache directory:
//!
//! ```text
//! manifest.json          sha256 of every cached file plus the last sync time
//! templates/<name>/...   raw template files
//! .lock                  advisory lock held while the cache is rewritten
//! ```

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};
use walkdir::WalkDir;

use super::templates::BuiltinTemplates;
use super::types::CacheStats;
use super::CacheManager;

const MANIFEST_FILE: &str = "manifest.json";
const LOCK_FILE: &str = ".lock";
const TEMPLATES_DIR: &str = "templates";
const MANIFEST_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache directory {0} does not exist")]
    Missing(PathBuf),

    #[error("Cache manifest is unreadable: {0}")]
    Manifest(String),

    #[error("Cached file {0} is missing")]
    MissingEntry(String),

    #[error("Cached file {0} is corrupted")]
    Corrupted(String),

    #[error("Cache is locked by another process")]
    Locked,

    #[error("Cache I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Serialize, Deserialize)]
struct Manifest {
    version: u32,
    last_sync: DateTime<Utc>,
    entries: BTreeMap<String, String>,
}

fn digest(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

#[derive(Debug, Clone)]
pub struct FsCacheManager {
    dir: PathBuf,
    templates: Arc<BuiltinTemplates>,
}

impl FsCacheManager {
    pub fn new(dir: impl Into<PathBuf>, templates: Arc<BuiltinTemplates>) -> Self {
        Self {
            dir: dir.into(),
            templates,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn with_lock<T>(&self, f: impl FnOnce() -> Result<T, CacheError>) -> Result<T, CacheError> {
        fs::create_dir_all(&self.dir)?;
        let file: File = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(self.dir.join(LOCK_FILE))?;
        let mut lock = fd_lock::RwLock::new(file);
        let _guard = lock.try_write().map_err(|_| CacheError::Locked)?;
        f()
    }

    fn read_manifest(&self) -> Result<Manifest, CacheError> {
        if !self.dir.is_dir() {
            return Err(CacheError::Missing(self.dir.clone()));
        }
        let raw = fs::read(self.dir.join(MANIFEST_FILE))
            .map_err(|e| CacheError::Manifest(e.to_string()))?;
        let manifest: Manifest =
            serde_json::from_slice(&raw).map_err(|e| CacheError::Manifest(e.to_string()))?;
        if manifest.version != MANIFEST_VERSION {
            return Err(CacheError::Manifest(format!(
                "unsupported manifest version {}",
                manifest.version
            )));
        }
        Ok(manifest)
    }

    /// Rewrite every template and the manifest. Caller holds the lock.
    fn write_templates(&self) -> Result<Manifest, CacheError> {
        let root = self.dir.join(TEMPLATES_DIR);
        let mut entries = BTreeMap::new();

        for template in self.templates.all() {
            for file in template.files {
                let key = format!("{}/{}", template.name, file.path);
                let target = root.join(&key);
                if let Some(parent) = target.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::write(&target, file.contents)?;
                entries.insert(key, digest(file.contents.as_bytes()));
            }
        }

        let manifest = Manifest {
            version: MANIFEST_VERSION,
            last_sync: Utc::now(),
            entries,
        };
        let staged = self.dir.join(format!("{MANIFEST_FILE}.tmp"));
        let body =
            serde_json::to_vec_pretty(&manifest).map_err(|e| CacheError::Manifest(e.to_string()))?;
        fs::write(&staged, body)?;
        fs::rename(&staged, self.dir.join(MANIFEST_FILE))?;
        Ok(manifest)
    }

    fn check(&self) -> Result<(), CacheError> {
        let manifest = self.read_manifest()?;
        let root = self.dir.join(TEMPLATES_DIR);
        for (key, expected) in &manifest.entries {
            let bytes = fs::read(root.join(key)).map_err(|_| CacheError::MissingEntry(key.clone()))?;
            if &digest(&bytes) != expected {
                return Err(CacheError::Corrupted(key.clone()));
            }
        }
        Ok(())
    }

    fn collect_stats(&self) -> CacheStats {
        let (entries, last_sync) = match self.read_manifest() {
            Ok(manifest) => (manifest.entries.len(), Some(manifest.last_sync)),
            Err(_) => (0, None),
        };
        let total_bytes = WalkDir::new(self.dir.join(TEMPLATES_DIR))
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .filter_map(|entry| entry.metadata().ok())
            .map(|meta| meta.len())
            .sum();

        CacheStats {
            entries,
            total_bytes,
            last_sync,
            location: self.dir.clone(),
        }
    }

    async fn blocking<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(FsCacheManager) -> Result<T, CacheError> + Send + 'static,
    {
        let this = self.clone();
        Ok(tokio::task::spawn_blocking(move || f(this)).await??)
    }
}

#[async_trait]
impl CacheManager for FsCacheManager {
    async fn stats(&self) -> Result<CacheStats> {
        self.blocking(|cache| Ok(cache.collect_stats())).await
    }

    async fn validate_cache(&self) -> Result<()> {
        self.blocking(|cache| cache.check()).await
    }

    async fn repair_cache(&self) -> Result<()> {
        self.blocking(|cache| {
            cache.with_lock(|| {
                let root = cache.dir.join(TEMPLATES_DIR);
                if root.exists() {
                    fs::remove_dir_all(&root)?;
                }
                let manifest = cache.write_templates()?;
                warn!(
                    location = %cache.dir.display(),
                    entries = manifest.entries.len(),
                    "Template cache rebuilt"
                );
                Ok(())
            })
        })
        .await
    }

    async fn sync_templates(&self) -> Result<CacheStats> {
        self.blocking(|cache| {
            cache.with_lock(|| cache.write_templates())?;
            let stats = cache.collect_stats();
            info!(
                location = %stats.location.display(),
                entries = stats.entries,
                bytes = stats.total_bytes,
                "Template cache synced"
            );
            Ok(stats)
        })
        .await
    }
}

//! Orphaned render cleanup.
//!
//! A rendered image is orphaned once no device screen and no plugin
//! references its key. The sweep deletes orphans, but only those last
//! modified before the active-key scan started minus a grace period. A file
//! written by a concurrent render (whose key may not be assigned yet) is
//! therefore never touched, without holding any lock across the sweep.
//!
//! # Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//! use trmnl_engine::{run_cleanup_daemon, CacheSweeper, FsCacheStorage};
//!
//! let storage = Arc::new(FsCacheStorage::new("storage/images/generated"));
//! let sweeper = Arc::new(CacheSweeper::new(store, storage));
//!
//! let cancellation = CancellationToken::new();
//! tokio::spawn(run_cleanup_daemon(sweeper, Duration::from_secs(3600), cancellation.clone()));
//! ```

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant, SystemTime};

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cache::SnapshotStore;
use crate::error::Error;

/// Default grace period before an unreferenced file may be deleted.
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(300);

/// A stored render, identified by its cache key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedImage {
    /// Cache key (file name without extension)
    pub key: String,
    /// Last modification time (newest file for the key)
    pub modified: SystemTime,
}

/// File storage collaborator holding rendered images.
pub trait CacheStorage: Send + Sync {
    /// All stored renders.
    fn list_cache_files(&self) -> Result<Vec<CachedImage>, Error>;

    /// Delete every file stored for a key.
    fn delete_cache_file(&self, key: &str) -> Result<(), Error>;
}

/// Outcome of one cleanup sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupReport {
    /// Stored keys seen
    pub scanned: usize,
    /// Keys referenced at scan time
    pub active: usize,
    /// Orphaned keys deleted
    pub deleted: Vec<String>,
    /// Orphaned keys kept because they are inside the grace period
    pub skipped_recent: usize,
    /// Orphaned keys whose deletion failed
    pub failed: usize,
    /// Whether the sweep stopped early on cancellation
    pub cancelled: bool,
    /// Duration of the sweep in milliseconds
    pub duration_ms: u64,
}

/// Deletes renders no device or plugin references anymore.
pub struct CacheSweeper<S, C> {
    store: Arc<S>,
    storage: Arc<C>,
    grace_period: Duration,
}

impl<S: SnapshotStore, C: CacheStorage> CacheSweeper<S, C> {
    /// Create a sweeper with the default grace period.
    pub fn new(store: Arc<S>, storage: Arc<C>) -> Self {
        Self {
            store,
            storage,
            grace_period: DEFAULT_GRACE_PERIOD,
        }
    }

    /// Set the grace period.
    #[must_use]
    pub fn with_grace_period(mut self, grace_period: Duration) -> Self {
        self.grace_period = grace_period;
        self
    }

    /// The configured grace period.
    pub fn grace_period(&self) -> Duration {
        self.grace_period
    }

    /// Delete orphaned renders.
    ///
    /// Keys referenced at scan time are never deleted. Individual deletion
    /// failures are logged and skipped. Cancellation is checked before each
    /// deletion.
    pub fn cleanup_folder(&self, cancel: &CancellationToken) -> Result<CleanupReport, Error> {
        let start = Instant::now();
        let scan_started = SystemTime::now();
        let cutoff = scan_started
            .checked_sub(self.grace_period)
            .unwrap_or(SystemTime::UNIX_EPOCH);

        let active = self.store.list_active_cache_keys()?;
        let files = self.storage.list_cache_files()?;

        let mut report = CleanupReport {
            scanned: files.len(),
            active: active.len(),
            ..Default::default()
        };

        for file in files {
            if active.contains(&file.key) {
                continue;
            }
            if file.modified > cutoff {
                report.skipped_recent += 1;
                continue;
            }
            if cancel.is_cancelled() {
                debug!(
                    deleted = report.deleted.len(),
                    "Cache cleanup cancelled"
                );
                report.cancelled = true;
                break;
            }

            match self.storage.delete_cache_file(&file.key) {
                Ok(()) => {
                    debug!(key = %file.key, "Deleted orphaned render");
                    report.deleted.push(file.key);
                }
                Err(e) => {
                    warn!(
                        key = %file.key,
                        error = %e,
                        "Failed to delete orphaned render"
                    );
                    report.failed += 1;
                }
            }
        }

        report.duration_ms = start.elapsed().as_millis() as u64;
        info!(
            scanned = report.scanned,
            active = report.active,
            deleted = report.deleted.len(),
            skipped_recent = report.skipped_recent,
            failed = report.failed,
            duration_ms = report.duration_ms,
            "Cache cleanup complete"
        );
        Ok(report)
    }
}

/// Rendered images stored as files in one directory.
///
/// The cache key is the file stem, so `abc.png` and `abc.bmp` both belong
/// to key `abc`. Dotfiles are ignored.
///
/// Listing records the paths behind each key, so deletions during the same
/// sweep do not rescan the directory. Keys never listed are deleted by
/// their [`RENDER_EXTENSIONS`] file names.
#[derive(Debug, Clone)]
pub struct FsCacheStorage {
    dir: PathBuf,
    index: Arc<Mutex<HashMap<String, Vec<PathBuf>>>>,
}

/// File extensions the renderer writes.
pub const RENDER_EXTENSIONS: &[&str] = &["png", "bmp"];

impl FsCacheStorage {
    /// Create storage rooted at `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            index: Arc::default(),
        }
    }

    /// The storage directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Files in the directory with their cache key.
    fn entries(&self) -> Result<Vec<(String, PathBuf)>, Error> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(Error::Io(format!(
                    "Failed to read cache dir '{}': {}",
                    self.dir.display(),
                    e
                )))
            }
        };

        let mut files = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let Some(key) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };
            if key.is_empty() || key.starts_with('.') {
                continue;
            }
            files.push((key.to_string(), path));
        }
        Ok(files)
    }
}

impl CacheStorage for FsCacheStorage {
    fn list_cache_files(&self) -> Result<Vec<CachedImage>, Error> {
        let mut newest: HashMap<String, SystemTime> = HashMap::new();
        let mut index: HashMap<String, Vec<PathBuf>> = HashMap::new();
        for (key, path) in self.entries()? {
            let modified = match std::fs::metadata(&path).and_then(|meta| meta.modified()) {
                Ok(modified) => modified,
                Err(e) => {
                    // Vanished between listing and stat
                    debug!(path = %path.display(), error = %e, "Skipping cache file");
                    continue;
                }
            };
            index.entry(key.clone()).or_default().push(path);
            newest
                .entry(key)
                .and_modify(|current| *current = (*current).max(modified))
                .or_insert(modified);
        }
        *self.index.lock().unwrap_or_else(PoisonError::into_inner) = index;

        let mut files: Vec<CachedImage> = newest
            .into_iter()
            .map(|(key, modified)| CachedImage { key, modified })
            .collect();
        files.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(files)
    }

    fn delete_cache_file(&self, key: &str) -> Result<(), Error> {
        let indexed = self
            .index
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
        let paths = indexed.unwrap_or_else(|| {
            RENDER_EXTENSIONS
                .iter()
                .map(|ext| self.dir.join(format!("{key}.{ext}")))
                .collect()
        });

        for path in paths {
            match std::fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => {
                    return Err(Error::Io(format!(
                        "Failed to delete '{}': {}",
                        path.display(),
                        e
                    )))
                }
            }
        }
        Ok(())
    }
}

/// Run cache cleanup periodically until cancelled.
///
/// Sweeps once on startup, then every `interval`. Each sweep runs on the
/// blocking pool and observes the same cancellation token between deletions.
#[cfg(feature = "sweep")]
pub async fn run_cleanup_daemon<S, C>(
    sweeper: Arc<CacheSweeper<S, C>>,
    interval: Duration,
    cancellation: CancellationToken,
) where
    S: SnapshotStore + 'static,
    C: CacheStorage + 'static,
{
    info!(
        interval_secs = interval.as_secs(),
        grace_secs = sweeper.grace_period().as_secs(),
        "Starting cache cleanup daemon"
    );

    loop {
        let task_sweeper = Arc::clone(&sweeper);
        let task_cancel = cancellation.clone();
        let result =
            tokio::task::spawn_blocking(move || task_sweeper.cleanup_folder(&task_cancel)).await;

        match result {
            Ok(Ok(report)) => debug!(deleted = report.deleted.len(), "Cleanup sweep finished"),
            Ok(Err(e)) => warn!(error = %e, "Cleanup sweep failed"),
            Err(e) => warn!(error = %e, "Cleanup sweep task aborted"),
        }

        tokio::select! {
            _ = cancellation.cancelled() => {
                info!("Cache cleanup daemon shutting down");
                break;
            }
            _ = tokio::time::sleep(interval) => {}
        }
    }
}

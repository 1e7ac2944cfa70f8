// Cross-process exclusive lock on the cache root's `.lock` sentinel
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, trace, warn};

use crate::cancel::Cancellation;
use crate::error::{HookEnvError, LockError, Result};

/// Name of the sentinel file inside the cache root
pub const LOCK_FILE_NAME: &str = ".lock";

/// Advisory exclusive lock backed by `flock`-style OS locks.
///
/// The kernel drops the lock when the holding process exits, so a holder
/// killed with SIGKILL never leaves a lock that needs manual cleanup.
#[derive(Debug, Clone)]
pub struct FileLock {
    path: PathBuf,
}

/// Held lock; released when dropped, including during unwinding
#[derive(Debug)]
pub struct FileLockGuard {
    file: File,
    path: PathBuf,
    acquired_at: Instant,
}

impl Drop for FileLockGuard {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            warn!(path = %self.path.display(), error = %e, "Failed to unlock file lock explicitly");
        }
        debug!(
            path = %self.path.display(),
            held_ms = self.acquired_at.elapsed().as_millis() as u64,
            "Released file lock"
        );
    }
}

impl FileLockGuard {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl FileLock {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Lock guarding the cache root at `cache_dir`
    pub fn for_cache_root(cache_dir: &Path) -> Self {
        Self::new(cache_dir.join(LOCK_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open_lock_file(&self) -> Result<File> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                HookEnvError::Lock(Box::new(LockError::CreationFailed {
                    path: self.path.clone(),
                    error: e.to_string(),
                }))
            })?;
        }

        OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&self.path)
            .map_err(|e| {
                HookEnvError::Lock(Box::new(LockError::CreationFailed {
                    path: self.path.clone(),
                    error: e.to_string(),
                }))
            })
    }

    /// Create the sentinel file if it does not exist yet
    pub fn ensure_sentinel(&self) -> Result<()> {
        self.open_lock_file().map(|_| ())
    }

    /// Block (without spinning) until the lock is held or `cancel` fires.
    ///
    /// When cancelled first, the pending kernel wait keeps running on the
    /// blocking pool and the lock is dropped as soon as it is obtained.
    pub async fn acquire(&self, cancel: &Cancellation) -> Result<FileLockGuard> {
        cancel.check("file lock acquisition")?;

        let file = self.open_lock_file()?;
        let path = self.path.clone();
        trace!(path = %path.display(), "Waiting for file lock");

        let waiter = tokio::task::spawn_blocking(move || file.lock_exclusive().map(|_| file));

        let file = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!(path = %path.display(), "Cancelled while waiting for file lock");
                return Err(HookEnvError::cancelled("file lock acquisition"));
            }
            joined = waiter => joined
                .map_err(|e| {
                    HookEnvError::Lock(Box::new(LockError::TaskFailed {
                        path: path.clone(),
                        error: e.to_string(),
                    }))
                })?
                .map_err(|e| {
                    HookEnvError::Lock(Box::new(LockError::AcquisitionFailed {
                        path: path.clone(),
                        error: e.to_string(),
                    }))
                })?,
        };

        debug!(path = %path.display(), "Acquired file lock");
        Ok(FileLockGuard {
            file,
            path,
            acquired_at: Instant::now(),
        })
    }

    /// Try once without waiting
    pub fn try_acquire(&self) -> Result<Option<FileLockGuard>> {
        let file = self.open_lock_file()?;
        match file.try_lock_exclusive() {
            Ok(()) => Ok(Some(FileLockGuard {
                file,
                path: self.path.clone(),
                acquired_at: Instant::now(),
            })),
            Err(e) if e.kind() == fs2::lock_contended_error().kind() => Ok(None),
            Err(e) => Err(HookEnvError::Lock(Box::new(LockError::AcquisitionFailed {
                path: self.path.clone(),
                error: e.to_string(),
            }))),
        }
    }

    /// Run `f` while holding the lock. `f` is never started if `cancel`
    /// fires before the lock is obtained.
    pub async fn with_lock<F, Fut, T>(&self, cancel: &Cancellation, f: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let _guard = self.acquire(cancel).await?;
        f().await
    }
}

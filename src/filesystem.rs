// File system helpers for the cache root: private directories, atomic private files, cleanup
use std::fs;
use std::io::Write;
use std::path::Path;
use tracing::{debug, warn};

use crate::error::{HookEnvError, Result, StorageError};

/// Mode for directories created under the cache root
pub const DIR_MODE: u32 = 0o750;

/// Mode for manifests and state files
pub const FILE_MODE: u32 = 0o600;

/// File system utilities for cache maintenance
pub struct FileSystem;

impl FileSystem {
    /// Create `path` and missing parents with mode 0750
    pub fn create_dir_all(path: &Path) -> Result<()> {
        let mut builder = fs::DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            builder.mode(DIR_MODE);
        }
        builder.create(path).map_err(|e| {
            HookEnvError::Storage(Box::new(StorageError::CacheDirectoryFailed {
                path: path.to_path_buf(),
                error: e.to_string(),
            }))
        })
    }

    /// Atomically write `content` to `path` with mode 0600.
    ///
    /// The temp file lives next to the target so the final rename never crosses devices.
    pub fn write_private(path: &Path, content: &[u8]) -> Result<()> {
        let write_failed = |error: String| {
            HookEnvError::Storage(Box::new(StorageError::FileWriteFailed {
                path: path.to_path_buf(),
                error,
            }))
        };

        let parent = path
            .parent()
            .ok_or_else(|| write_failed("path has no parent directory".to_string()))?;
        let mut temp =
            tempfile::NamedTempFile::new_in(parent).map_err(|e| write_failed(e.to_string()))?;
        temp.write_all(content)
            .map_err(|e| write_failed(e.to_string()))?;
        temp.as_file()
            .sync_all()
            .map_err(|e| write_failed(e.to_string()))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(temp.path(), fs::Permissions::from_mode(FILE_MODE))
                .map_err(|e| write_failed(e.to_string()))?;
        }

        temp.persist(path)
            .map_err(|e| write_failed(e.error.to_string()))?;
        Ok(())
    }

    /// Empty scratch directory inside `parent`, removed on drop unless published
    pub fn staging_dir(parent: &Path, prefix: &str) -> Result<tempfile::TempDir> {
        Self::create_dir_all(parent)?;
        tempfile::Builder::new()
            .prefix(prefix)
            .tempdir_in(parent)
            .map_err(|e| {
                HookEnvError::Storage(Box::new(StorageError::CacheDirectoryFailed {
                    path: parent.to_path_buf(),
                    error: e.to_string(),
                }))
            })
    }

    /// Move a fully populated staging directory to `target` (mode 0750) in one rename.
    ///
    /// `target` must not exist. Both paths share a parent, so the rename is atomic.
    pub fn publish_dir(staging: tempfile::TempDir, target: &Path) -> Result<()> {
        let publish_failed = |error: String| {
            HookEnvError::Storage(Box::new(StorageError::CacheDirectoryFailed {
                path: target.to_path_buf(),
                error,
            }))
        };

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(staging.path(), fs::Permissions::from_mode(DIR_MODE))
                .map_err(|e| publish_failed(e.to_string()))?;
        }
        fs::rename(staging.path(), target).map_err(|e| publish_failed(e.to_string()))?;
        // Dropping the now-vacant TempDir finds nothing to delete
        drop(staging);
        Ok(())
    }

    /// Remove a directory tree if it exists
    pub fn remove_dir_if_exists(path: &Path) -> Result<()> {
        match fs::remove_dir_all(path) {
            Ok(()) => {
                debug!(path = %path.display(), "Removed directory");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(HookEnvError::Storage(Box::new(StorageError::CleanupFailed {
                path: path.to_path_buf(),
                error: e.to_string(),
            }))),
        }
    }

    /// Best-effort removal used on error paths where the original error must win
    pub fn discard_dir(path: &Path) {
        if let Err(e) = Self::remove_dir_if_exists(path) {
            warn!(path = %path.display(), error = %e, "Failed to remove partial directory");
        }
    }
}

// Catalog database: SQLite store of cloned repositories and consulted configs,
// schema-compatible with pre-commit's db.db

use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace};

use crate::error::{HookEnvError, Result, StorageError};

/// File name of the catalog inside the cache root
pub const DATABASE_FILE_NAME: &str = "db.db";

const SCHEMA: &str = "\
CREATE TABLE IF NOT EXISTS repos (repo TEXT, ref TEXT, path TEXT, PRIMARY KEY (repo, ref));
CREATE TABLE IF NOT EXISTS configs (path TEXT PRIMARY KEY);
";

const BUSY_TIMEOUT: Duration = Duration::from_secs(30);

/// One row of the `repos` table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRecord {
    pub repo: String,
    /// Revision, suffixed with the dependency fingerprint when deps are present
    pub rev: String,
    pub path: PathBuf,
}

/// Handle on `<root>/db.db`. Clones share one connection.
#[derive(Clone)]
pub struct Catalog {
    database_path: Option<PathBuf>,
    connection: Arc<Mutex<Connection>>,
}

impl std::fmt::Debug for Catalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Catalog")
            .field("database_path", &self.database_path)
            .finish()
    }
}

/// Resolve symlinks when the path exists, otherwise make it absolute
pub fn canonical_path(path: &Path) -> Result<PathBuf> {
    match fs::canonicalize(path) {
        Ok(resolved) => Ok(resolved),
        Err(_) if path.is_absolute() => Ok(path.to_path_buf()),
        Err(_) => Ok(std::env::current_dir()?.join(path)),
    }
}

impl Catalog {
    /// Open the catalog inside `cache_dir`, creating it if needed
    pub fn open(cache_dir: &Path) -> Result<Self> {
        let database_path = cache_dir.join(DATABASE_FILE_NAME);
        if !database_path.exists() {
            Self::create_database(cache_dir, &database_path)?;
        }

        let connection = Connection::open(&database_path).map_err(|e| {
            HookEnvError::Storage(Box::new(StorageError::ConnectionFailed {
                message: e.to_string(),
                database_path: Some(database_path.clone()),
            }))
        })?;
        connection.busy_timeout(BUSY_TIMEOUT)?;
        connection.pragma_update_and_check(None, "journal_mode", "WAL", |row| {
            row.get::<_, String>(0)
        })?;
        // A db.db written by another tool may predate one of the tables
        connection.execute_batch(SCHEMA)?;

        debug!(path = %database_path.display(), "Opened catalog database");
        Ok(Self {
            database_path: Some(database_path),
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    /// Catalog that lives only in memory
    pub fn in_memory() -> Result<Self> {
        let connection = Connection::open_in_memory().map_err(|e| {
            HookEnvError::Storage(Box::new(StorageError::ConnectionFailed {
                message: e.to_string(),
                database_path: None,
            }))
        })?;
        connection.execute_batch(SCHEMA)?;
        Ok(Self {
            database_path: None,
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    // Build the schema in a temp file and rename it into place so a concurrent
    // opener never sees an empty database.
    fn create_database(cache_dir: &Path, database_path: &Path) -> Result<()> {
        let init_failed = |error: String| {
            HookEnvError::Storage(Box::new(StorageError::InitializationFailed {
                message: error,
                database_path: database_path.to_path_buf(),
            }))
        };

        let temp = tempfile::Builder::new()
            .prefix(".db-")
            .suffix(".tmp")
            .tempfile_in(cache_dir)
            .map_err(|e| init_failed(e.to_string()))?;

        {
            let connection =
                Connection::open(temp.path()).map_err(|e| init_failed(e.to_string()))?;
            connection
                .execute_batch(SCHEMA)
                .map_err(|e| init_failed(e.to_string()))?;
        }

        match temp.persist_noclobber(database_path) {
            Ok(_) => {
                debug!(path = %database_path.display(), "Created catalog database");
                Ok(())
            }
            // Another process won the race; its database is equivalent
            Err(_) if database_path.exists() => Ok(()),
            Err(e) => Err(init_failed(e.error.to_string())),
        }
    }

    pub fn database_path(&self) -> Option<&Path> {
        self.database_path.as_deref()
    }

    fn query_failed(&self, query: &str, error: rusqlite::Error) -> HookEnvError {
        HookEnvError::Storage(Box::new(StorageError::QueryFailed {
            query: query.to_string(),
            error: error.to_string(),
            database_path: self.database_path.clone(),
        }))
    }

    /// Path recorded for `(repo, rev)`, if any
    pub fn get_repo_path(&self, repo: &str, rev: &str) -> Result<Option<PathBuf>> {
        const QUERY: &str = "SELECT path FROM repos WHERE repo = ?1 AND ref = ?2";
        let connection = self.connection.lock();
        let path: Option<String> = connection
            .query_row(QUERY, params![repo, rev], |row| row.get(0))
            .optional()
            .map_err(|e| self.query_failed(QUERY, e))?;
        trace!(repo, rev, hit = path.is_some(), "Catalog lookup");
        Ok(path.map(PathBuf::from))
    }

    /// Record where `(repo, rev)` lives. Re-recording replaces the previous path.
    pub fn put_repo_entry(&self, repo: &str, rev: &str, path: &Path) -> Result<()> {
        const QUERY: &str = "INSERT OR REPLACE INTO repos (repo, ref, path) VALUES (?1, ?2, ?3)";
        let resolved = canonical_path(path)?;
        let connection = self.connection.lock();
        connection
            .execute(QUERY, params![repo, rev, resolved.to_string_lossy()])
            .map_err(|e| self.query_failed(QUERY, e))?;
        debug!(repo, rev, path = %resolved.display(), "Recorded repository");
        Ok(())
    }

    /// Every recorded repository, ordered by (repo, ref)
    pub fn list_repos(&self) -> Result<Vec<RepoRecord>> {
        const QUERY: &str = "SELECT repo, ref, path FROM repos ORDER BY repo, ref";
        let connection = self.connection.lock();
        let mut stmt = connection
            .prepare(QUERY)
            .map_err(|e| self.query_failed(QUERY, e))?;
        let rows = stmt
            .query_map([], |row| {
                Ok(RepoRecord {
                    repo: row.get(0)?,
                    rev: row.get(1)?,
                    path: PathBuf::from(row.get::<_, String>(2)?),
                })
            })
            .map_err(|e| self.query_failed(QUERY, e))?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row.map_err(|e| self.query_failed(QUERY, e))?);
        }
        Ok(records)
    }

    /// Remember that the config at `path` was used. Callers pass an absolute path.
    pub fn mark_config_used(&self, path: &Path) -> Result<()> {
        const QUERY: &str = "INSERT OR IGNORE INTO configs (path) VALUES (?1)";
        let connection = self.connection.lock();
        connection
            .execute(QUERY, params![path.to_string_lossy()])
            .map_err(|e| self.query_failed(QUERY, e))?;
        Ok(())
    }

    /// Every config ever marked, ordered by path
    pub fn list_configs(&self) -> Result<Vec<PathBuf>> {
        const QUERY: &str = "SELECT path FROM configs ORDER BY path";
        let connection = self.connection.lock();
        let mut stmt = connection
            .prepare(QUERY)
            .map_err(|e| self.query_failed(QUERY, e))?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(|e| self.query_failed(QUERY, e))?;

        let mut configs = Vec::new();
        for row in rows {
            configs.push(PathBuf::from(row.map_err(|e| self.query_failed(QUERY, e))?));
        }
        Ok(configs)
    }
}

// Error handling framework for hookenv
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, HookEnvError>;

/// Main error type for hookenv with a boxed, per-concern error hierarchy
#[derive(Debug, Error)]
pub enum HookEnvError {
    #[error("Configuration error: {0}")]
    Config(#[from] Box<ConfigError>),

    #[error("Git operation failed: {0}")]
    Git(#[from] Box<GitError>),

    #[error("IO operation failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("CLI argument error: {0}")]
    Cli(#[from] Box<CliError>),

    #[error("Storage operation failed: {0}")]
    Storage(#[from] Box<StorageError>),

    #[error("Process execution failed: {0}")]
    Process(#[from] Box<ProcessError>),

    #[error("File locking failed: {0}")]
    Lock(#[from] Box<LockError>),

    #[error("Language environment error: {0}")]
    Language(#[from] Box<LanguageError>),

    #[error("Operation cancelled: {operation}")]
    Cancelled { operation: String },
}

/// Error classification shared with callers of `Orchestrator::resolve`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// File/dir creation, permissions, lock acquisition
    CacheIo,
    /// Catalog database open/query/write
    Catalog,
    /// git clone/checkout failed
    RepoFetch,
    /// A language manager install step failed
    EnvironmentBuild,
    /// No manager registered for the requested language
    UnsupportedLanguage,
    /// Cancellation before or during a blocking step
    Cancelled,
}

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot determine cache directory: {message}")]
    NoCacheDirectory { message: String },

    #[error("Invalid configuration value for {variable}: {value}")]
    InvalidValue {
        variable: String,
        value: String,
        expected: String,
    },

    #[error("Manifest serialization failed: {message}")]
    ManifestSerialization {
        message: String,
        path: Option<PathBuf>,
    },
}

/// Git operation errors with command output attached
#[derive(Debug, Error)]
pub enum GitError {
    #[error("Git command failed: {command}")]
    CommandFailed {
        command: String,
        exit_code: Option<i32>,
        stdout: String,
        stderr: String,
        working_dir: Option<PathBuf>,
    },

    #[error("Failed to fetch {url}@{revision}: {message}")]
    FetchFailed {
        url: String,
        revision: String,
        message: String,
        output: String,
    },

    #[error("Not a git working copy: {path}")]
    InvalidWorkingCopy { path: PathBuf, error: String },
}

/// CLI argument errors
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Conflicting arguments: {first} and {second}")]
    ConflictingArguments {
        first: String,
        second: String,
        suggestion: String,
    },

    #[error("Runtime error: {message}")]
    RuntimeError { message: String },
}

/// Cache directory and catalog database errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database connection failed: {message}")]
    ConnectionFailed {
        message: String,
        database_path: Option<PathBuf>,
    },

    #[error("Database initialization failed: {message}")]
    InitializationFailed {
        message: String,
        database_path: PathBuf,
    },

    #[error("Database query failed: {query}")]
    QueryFailed {
        query: String,
        error: String,
        database_path: Option<PathBuf>,
    },

    #[error("Cache directory creation failed: {path}")]
    CacheDirectoryFailed { path: PathBuf, error: String },

    #[error("Cache file write failed: {path}")]
    FileWriteFailed { path: PathBuf, error: String },

    #[error("Repository cleanup failed: {path}")]
    CleanupFailed { path: PathBuf, error: String },
}

/// Process execution errors
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("Command exited with status {exit_code:?}: {command}")]
    NonZeroExit {
        command: String,
        exit_code: Option<i32>,
        stdout: String,
        stderr: String,
    },

    #[error("Process timeout after {duration:?}: {command}")]
    Timeout { command: String, duration: Duration },

    #[error("Command not found: {command}")]
    CommandNotFound {
        command: String,
        suggestion: Option<String>,
    },

    #[error("Process spawn failed: {command}")]
    SpawnFailed { command: String, error: String },

    #[error("Output capture failed: {message}")]
    OutputCaptureFailed { message: String, command: String },
}

/// File locking errors
#[derive(Debug, Error)]
pub enum LockError {
    #[error("Lock file creation failed: {path}")]
    CreationFailed { path: PathBuf, error: String },

    #[error("Lock acquisition failed: {path}")]
    AcquisitionFailed { path: PathBuf, error: String },

    #[error("Lock task failed: {path}")]
    TaskFailed { path: PathBuf, error: String },
}

/// Language manager errors
#[derive(Debug, Error)]
pub enum LanguageError {
    #[error("Unsupported language: {language}")]
    UnsupportedLanguage {
        language: String,
        available_languages: Vec<String>,
    },

    #[error("Environment setup failed for {language}: {error}")]
    EnvironmentSetupFailed {
        language: String,
        env_path: PathBuf,
        error: String,
        output: Option<String>,
    },

    #[error("Dependency installation failed for {language}: {dependencies}")]
    DependencyInstallationFailed {
        language: String,
        dependencies: String,
        error: String,
        output: Option<String>,
    },

    #[error("Language version not supported by {language}: {version}")]
    UnsupportedVersion {
        language: String,
        version: String,
        found: Option<String>,
    },

    #[error("Environment health check failed for {language}: {message}")]
    HealthCheckFailed {
        language: String,
        env_path: PathBuf,
        message: String,
    },
}

/// Exit codes used by the hookenv binary
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL_ERROR: i32 = 1;
    pub const CONFIG_ERROR: i32 = 2;
    pub const REPO_FETCH_ERROR: i32 = 3;
    pub const ENVIRONMENT_BUILD_ERROR: i32 = 4;
    pub const UNSUPPORTED_LANGUAGE: i32 = 5;
    pub const CACHE_IO_ERROR: i32 = 6;
    pub const CLI_ERROR: i32 = 7;
    pub const CATALOG_ERROR: i32 = 8;
    pub const CANCELLED: i32 = 130;
}

impl HookEnvError {
    /// Shorthand for a cancellation error naming the interrupted step
    pub fn cancelled(operation: impl Into<String>) -> Self {
        HookEnvError::Cancelled {
            operation: operation.into(),
        }
    }

    /// Classify this error into the cache subsystem's error taxonomy
    pub fn kind(&self) -> ErrorKind {
        match self {
            HookEnvError::Storage(storage_err) => match storage_err.as_ref() {
                StorageError::ConnectionFailed { .. }
                | StorageError::InitializationFailed { .. }
                | StorageError::QueryFailed { .. } => ErrorKind::Catalog,
                _ => ErrorKind::CacheIo,
            },
            HookEnvError::Git(_) => ErrorKind::RepoFetch,
            HookEnvError::Language(lang_err) => match lang_err.as_ref() {
                LanguageError::UnsupportedLanguage { .. } => ErrorKind::UnsupportedLanguage,
                _ => ErrorKind::EnvironmentBuild,
            },
            HookEnvError::Process(_) => ErrorKind::EnvironmentBuild,
            HookEnvError::Cancelled { .. } => ErrorKind::Cancelled,
            HookEnvError::Lock(_)
            | HookEnvError::Io(_)
            | HookEnvError::Config(_)
            | HookEnvError::Cli(_) => ErrorKind::CacheIo,
        }
    }

    /// Whether re-invoking the failed operation may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::RepoFetch | ErrorKind::EnvironmentBuild | ErrorKind::Cancelled
        )
    }

    /// Get the appropriate exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            HookEnvError::Config(_) => exit_codes::CONFIG_ERROR,
            HookEnvError::Cli(_) => exit_codes::CLI_ERROR,
            _ => match self.kind() {
                ErrorKind::CacheIo => exit_codes::CACHE_IO_ERROR,
                ErrorKind::Catalog => exit_codes::CATALOG_ERROR,
                ErrorKind::RepoFetch => exit_codes::REPO_FETCH_ERROR,
                ErrorKind::EnvironmentBuild => exit_codes::ENVIRONMENT_BUILD_ERROR,
                ErrorKind::UnsupportedLanguage => exit_codes::UNSUPPORTED_LANGUAGE,
                ErrorKind::Cancelled => exit_codes::CANCELLED,
            },
        }
    }

    /// Create a user-facing message with the captured command output appended
    pub fn user_message(&self) -> String {
        use tracing::error;

        error!(error_kind = ?self.kind(), error = %self, "hookenv operation failed");

        let mut output = format!("Error: {self}");
        match self {
            HookEnvError::Git(git_err) => match git_err.as_ref() {
                GitError::CommandFailed { stderr, .. } if !stderr.is_empty() => {
                    output.push_str(&format!("\n  Git error: {}", stderr.trim_end()));
                }
                GitError::FetchFailed { output: out, .. } if !out.is_empty() => {
                    output.push_str(&format!("\n  Git output: {}", out.trim_end()));
                }
                _ => {}
            },
            HookEnvError::Process(process_err) => {
                if let ProcessError::NonZeroExit { stderr, .. } = process_err.as_ref() {
                    if !stderr.is_empty() {
                        output.push_str(&format!("\n  Process error: {}", stderr.trim_end()));
                    }
                }
            }
            HookEnvError::Language(lang_err) => match lang_err.as_ref() {
                LanguageError::EnvironmentSetupFailed {
                    output: Some(out), ..
                }
                | LanguageError::DependencyInstallationFailed {
                    output: Some(out), ..
                } if !out.is_empty() => {
                    output.push_str(&format!("\n  Output: {}", out.trim_end()));
                }
                _ => {}
            },
            HookEnvError::Cli(cli_err) => {
                if let CliError::ConflictingArguments { suggestion, .. } = cli_err.as_ref() {
                    output.push_str(&format!("\n  Help: {suggestion}"));
                }
            }
            _ => {}
        }
        output
    }
}

impl From<LanguageError> for HookEnvError {
    fn from(error: LanguageError) -> Self {
        HookEnvError::Language(Box::new(error))
    }
}

impl From<StorageError> for HookEnvError {
    fn from(error: StorageError) -> Self {
        HookEnvError::Storage(Box::new(error))
    }
}

impl From<ProcessError> for HookEnvError {
    fn from(error: ProcessError) -> Self {
        HookEnvError::Process(Box::new(error))
    }
}

impl From<GitError> for HookEnvError {
    fn from(error: GitError) -> Self {
        HookEnvError::Git(Box::new(error))
    }
}

impl From<LockError> for HookEnvError {
    fn from(error: LockError) -> Self {
        HookEnvError::Lock(Box::new(error))
    }
}

impl From<ConfigError> for HookEnvError {
    fn from(error: ConfigError) -> Self {
        HookEnvError::Config(Box::new(error))
    }
}

// Conversion from git2::Error to GitError
impl From<git2::Error> for Box<GitError> {
    fn from(error: git2::Error) -> Self {
        Box::new(GitError::CommandFailed {
            command: "git2 operation".to_string(),
            exit_code: None,
            stdout: String::new(),
            stderr: error.message().to_string(),
            working_dir: None,
        })
    }
}

impl From<git2::Error> for HookEnvError {
    fn from(error: git2::Error) -> Self {
        HookEnvError::Git(Box::<GitError>::from(error))
    }
}

// Conversion from rusqlite::Error to StorageError
impl From<rusqlite::Error> for Box<StorageError> {
    fn from(error: rusqlite::Error) -> Self {
        match error {
            rusqlite::Error::SqliteFailure(sqlite_error, message) => {
                Box::new(StorageError::QueryFailed {
                    query: "SQLite operation".to_string(),
                    error: message.unwrap_or_else(|| format!("SQLite error: {sqlite_error:?}")),
                    database_path: None,
                })
            }
            rusqlite::Error::InvalidPath(path) => Box::new(StorageError::ConnectionFailed {
                message: format!("Invalid database path: {}", path.display()),
                database_path: Some(path),
            }),
            _ => Box::new(StorageError::QueryFailed {
                query: "Database operation".to_string(),
                error: error.to_string(),
                database_path: None,
            }),
        }
    }
}

impl From<rusqlite::Error> for HookEnvError {
    fn from(error: rusqlite::Error) -> Self {
        HookEnvError::Storage(Box::<StorageError>::from(error))
    }
}

impl From<serde_json::Error> for HookEnvError {
    fn from(error: serde_json::Error) -> Self {
        HookEnvError::Config(Box::new(ConfigError::ManifestSerialization {
            message: error.to_string(),
            path: None,
        }))
    }
}

impl From<serde_yaml::Error> for HookEnvError {
    fn from(error: serde_yaml::Error) -> Self {
        HookEnvError::Config(Box::new(ConfigError::ManifestSerialization {
            message: error.to_string(),
            path: None,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = HookEnvError::from(ConfigError::NoCacheDirectory {
            message: "HOME not set".to_string(),
        });
        assert_eq!(
            error.to_string(),
            "Configuration error: Cannot determine cache directory: HOME not set"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let error = HookEnvError::from(io_error);
        assert!(error.to_string().contains("IO operation failed"));
        assert_eq!(error.kind(), ErrorKind::CacheIo);
    }

    #[test]
    fn test_kind_classification() {
        let catalog = HookEnvError::from(StorageError::QueryFailed {
            query: "SELECT".to_string(),
            error: "locked".to_string(),
            database_path: None,
        });
        assert_eq!(catalog.kind(), ErrorKind::Catalog);

        let fetch = HookEnvError::from(GitError::FetchFailed {
            url: "https://example/p".to_string(),
            revision: "v1".to_string(),
            message: "clone failed".to_string(),
            output: "fatal: repository not found".to_string(),
        });
        assert_eq!(fetch.kind(), ErrorKind::RepoFetch);
        assert!(fetch.is_retryable());

        let unsupported = HookEnvError::from(LanguageError::UnsupportedLanguage {
            language: "cobol".to_string(),
            available_languages: vec![],
        });
        assert_eq!(unsupported.kind(), ErrorKind::UnsupportedLanguage);
        assert!(!unsupported.is_retryable());
        assert_eq!(unsupported.exit_code(), exit_codes::UNSUPPORTED_LANGUAGE);

        let cancelled = HookEnvError::cancelled("git clone");
        assert_eq!(cancelled.kind(), ErrorKind::Cancelled);
        assert_eq!(cancelled.exit_code(), exit_codes::CANCELLED);
    }

    #[test]
    fn test_user_message_includes_output() {
        let error = HookEnvError::from(LanguageError::DependencyInstallationFailed {
            language: "python".to_string(),
            dependencies: "requests".to_string(),
            error: "pip failed".to_string(),
            output: Some("No matching distribution found\n".to_string()),
        });
        let message = error.user_message();
        assert!(message.starts_with("Error: "));
        assert!(message.contains("No matching distribution found"));
    }
}

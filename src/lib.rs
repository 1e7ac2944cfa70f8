// hookenv - Library module
// Repository and environment cache compatible with pre-commit's on-disk layout

pub mod cancel;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod error;
pub mod file_lock;
pub mod filesystem;
pub mod fingerprint;
pub mod install_state;
pub mod language;
pub mod logging;
pub mod orchestrator;
pub mod package_manager;
pub mod process;
pub mod repo_store;

// Re-export main types for easier access
pub use cancel::Cancellation;
pub use catalog::{Catalog, RepoRecord};
pub use config::{CondaFrontend, NodePackageManager, StoreConfig};
pub use error::{
    exit_codes, CliError, ConfigError, ErrorKind, GitError, HookEnvError, LanguageError,
    LockError, ProcessError, Result, StorageError,
};
pub use file_lock::{FileLock, FileLockGuard};
pub use filesystem::FileSystem;
pub use language::{Language, LanguageRegistry, LanguageVersion, SetupContext};
pub use orchestrator::{Orchestrator, ResolveRequest, ResolvedEnvironment};
pub use process::{CommandRunner, ProcessConfig, ProcessOutput, SystemCommandRunner};
pub use repo_store::RepoStore;

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Formatted version string
pub fn version_info() -> String {
    format!("{NAME} {VERSION}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_constant() {
        // X.Y.Z or X.Y.Z-suffix
        let parts: Vec<&str> = VERSION.split('.').collect();
        assert!(
            parts.len() >= 3,
            "VERSION '{VERSION}' should have at least 3 parts separated by dots (X.Y.Z)"
        );

        for (i, part) in parts.iter().take(3).enumerate() {
            let number_part = if i == 2 {
                part.split('-').next().unwrap_or(part)
            } else {
                part
            };

            assert!(
                number_part.chars().all(|c| c.is_ascii_digit()),
                "VERSION '{VERSION}' part '{number_part}' should be a number"
            );
        }
    }

    #[test]
    fn test_name_constant() {
        assert_eq!(NAME, "hookenv");
        assert!(version_info().starts_with("hookenv "));
    }

    #[test]
    fn test_description_exists() {
        assert!(DESCRIPTION.contains("pre-commit"));
    }
}

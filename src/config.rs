// Store configuration resolved from the process environment
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ConfigError, HookEnvError, Result};

/// Directory name used under the user cache directory
pub const CACHE_DIR_NAME: &str = "pre-commit";

/// Node adapter selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodePackageManager {
    #[default]
    Npm,
    Yarn,
}

impl NodePackageManager {
    pub fn executable(&self) -> &'static str {
        match self {
            NodePackageManager::Npm => "npm",
            NodePackageManager::Yarn => "yarn",
        }
    }
}

impl std::str::FromStr for NodePackageManager {
    type Err = HookEnvError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "npm" => Ok(NodePackageManager::Npm),
            "yarn" => Ok(NodePackageManager::Yarn),
            other => Err(HookEnvError::Config(Box::new(ConfigError::InvalidValue {
                variable: "HOOKENV_NODE_PACKAGE_MANAGER".to_string(),
                value: other.to_string(),
                expected: "npm or yarn".to_string(),
            }))),
        }
    }
}

/// Executable used to drive conda environments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CondaFrontend {
    #[default]
    Conda,
    Mamba,
    Micromamba,
}

impl CondaFrontend {
    pub fn executable(&self) -> &'static str {
        match self {
            CondaFrontend::Conda => "conda",
            CondaFrontend::Mamba => "mamba",
            CondaFrontend::Micromamba => "micromamba",
        }
    }
}

/// Settings shared by every component that touches the cache root
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    pub cache_dir: PathBuf,
    /// Per-subprocess limit applied when the caller's cancellation has no deadline
    pub subprocess_timeout: Option<Duration>,
    pub node_package_manager: NodePackageManager,
    pub conda_frontend: CondaFrontend,
}

impl StoreConfig {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            subprocess_timeout: None,
            node_package_manager: NodePackageManager::default(),
            conda_frontend: CondaFrontend::default(),
        }
    }

    /// Resolve configuration from the current process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var_os(key), dirs::home_dir)
    }

    /// Resolve configuration through an arbitrary variable lookup.
    ///
    /// `home_fallback` is consulted only when `HOME` is unset.
    pub fn from_lookup<F, H>(lookup: F, home_fallback: H) -> Result<Self>
    where
        F: Fn(&str) -> Option<OsString>,
        H: FnOnce() -> Option<PathBuf>,
    {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.is_empty());

        let cache_dir = if let Some(home) = non_empty("PRE_COMMIT_HOME") {
            PathBuf::from(home)
        } else if let Some(xdg) = non_empty("XDG_CACHE_HOME") {
            PathBuf::from(xdg).join(CACHE_DIR_NAME)
        } else {
            let home = non_empty("HOME")
                .map(PathBuf::from)
                .or_else(home_fallback)
                .ok_or_else(|| {
                    HookEnvError::Config(Box::new(ConfigError::NoCacheDirectory {
                        message: "set PRE_COMMIT_HOME, XDG_CACHE_HOME or HOME".to_string(),
                    }))
                })?;
            home.join(".cache").join(CACHE_DIR_NAME)
        };

        let conda_frontend = if non_empty("PRE_COMMIT_USE_MICROMAMBA").is_some() {
            CondaFrontend::Micromamba
        } else if non_empty("PRE_COMMIT_USE_MAMBA").is_some() {
            CondaFrontend::Mamba
        } else {
            CondaFrontend::Conda
        };

        let node_package_manager = match non_empty("HOOKENV_NODE_PACKAGE_MANAGER") {
            Some(value) => value.to_string_lossy().parse()?,
            None => NodePackageManager::Npm,
        };

        let subprocess_timeout = match non_empty("HOOKENV_SUBPROCESS_TIMEOUT_SECS") {
            Some(value) => {
                let raw = value.to_string_lossy().into_owned();
                let secs: u64 = raw.trim().parse().map_err(|_| {
                    HookEnvError::Config(Box::new(ConfigError::InvalidValue {
                        variable: "HOOKENV_SUBPROCESS_TIMEOUT_SECS".to_string(),
                        value: raw.clone(),
                        expected: "a whole number of seconds".to_string(),
                    }))
                })?;
                (secs > 0).then(|| Duration::from_secs(secs))
            }
            None => None,
        };

        Ok(Self {
            cache_dir,
            subprocess_timeout,
            node_package_manager,
            conda_frontend,
        })
    }

    pub fn with_cache_dir(mut self, cache_dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = cache_dir.into();
        self
    }

    pub fn with_subprocess_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.subprocess_timeout = timeout;
        self
    }

    pub fn with_node_package_manager(mut self, manager: NodePackageManager) -> Self {
        self.node_package_manager = manager;
        self
    }

    pub fn with_conda_frontend(mut self, frontend: CondaFrontend) -> Self {
        self.conda_frontend = frontend;
        self
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    pub fn repos_dir(&self) -> PathBuf {
        self.cache_dir.join("repos")
    }

    pub fn lock_path(&self) -> PathBuf {
        self.cache_dir.join(".lock")
    }

    pub fn database_path(&self) -> PathBuf {
        self.cache_dir.join("db.db")
    }
}

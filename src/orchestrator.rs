// Environment orchestration: resolve (repo, rev, language, version, deps) to a Ready environment
//
// Readers never take the file lock; every cache mutation happens under it. Within one
// process a per-environment mutex keeps duplicate requests from queueing on the lock.

use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn, Instrument};

use crate::cancel::Cancellation;
use crate::catalog::{self, Catalog, RepoRecord};
use crate::config::StoreConfig;
use crate::error::{HookEnvError, LanguageError, Result};
use crate::file_lock::FileLock;
use crate::filesystem::FileSystem;
use crate::fingerprint;
use crate::install_state;
use crate::language::{Language, LanguageRegistry, LanguageVersion, SetupContext};
use crate::logging::spans;
use crate::process::{CommandRunner, SystemCommandRunner};
use crate::repo_store::{self, RepoStore};

pub const README_FILE: &str = "README";
pub const README_CONTENTS: &str =
    "This directory is maintained by the pre-commit project.\nLearn more: https://pre-commit.com\n";

// env_path -> guard held while that environment is being materialized in this process
static IN_FLIGHT: Lazy<parking_lot::Mutex<HashMap<PathBuf, Arc<tokio::sync::Mutex<()>>>>> =
    Lazy::new(|| parking_lot::Mutex::new(HashMap::new()));

/// This process's claim on one environment path; the map entry goes away with the last claim
struct InFlight {
    env_path: PathBuf,
    mutex: Arc<tokio::sync::Mutex<()>>,
    held: Option<tokio::sync::OwnedMutexGuard<()>>,
}

impl InFlight {
    /// Wait until no other task in this process is materializing `env_path`
    async fn acquire(env_path: &Path, cancel: &Cancellation) -> Result<Self> {
        let mutex = IN_FLIGHT
            .lock()
            .entry(env_path.to_path_buf())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone();
        // Built before waiting so a cancelled waiter also cleans up
        let mut claim = Self {
            env_path: env_path.to_path_buf(),
            mutex,
            held: None,
        };
        let held = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(HookEnvError::cancelled("resolve")),
            held = Arc::clone(&claim.mutex).lock_owned() => held,
        };
        claim.held = Some(held);
        Ok(claim)
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        drop(self.held.take());
        let mut map = IN_FLIGHT.lock();
        // Clones are only made under the map lock, so the count cannot grow here.
        // Two references left means the map's and ours.
        if Arc::strong_count(&self.mutex) == 2
            && map
                .get(&self.env_path)
                .map(|entry| Arc::ptr_eq(entry, &self.mutex))
                .unwrap_or(false)
        {
            map.remove(&self.env_path);
        }
    }
}

/// Forget every in-flight guard. Only meaningful between tests.
#[doc(hidden)]
pub fn reset_in_flight() {
    IN_FLIGHT.lock().clear();
}

/// One hook's environment request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveRequest {
    pub repo_url: String,
    pub rev: String,
    pub hook_id: String,
    pub language: String,
    /// `"default"`, `"system"` or a concrete version
    pub version: String,
    pub additional_dependencies: Vec<String>,
}

impl ResolveRequest {
    pub fn new(
        repo_url: impl Into<String>,
        rev: impl Into<String>,
        hook_id: impl Into<String>,
        language: impl Into<String>,
    ) -> Self {
        Self {
            repo_url: repo_url.into(),
            rev: rev.into(),
            hook_id: hook_id.into(),
            language: language.into(),
            version: fingerprint::DEFAULT_VERSION.to_string(),
            additional_dependencies: Vec::new(),
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn with_additional_dependencies<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.additional_dependencies = deps.into_iter().map(Into::into).collect();
        self
    }
}

/// A Ready environment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedEnvironment {
    pub env_path: PathBuf,
    pub repo_path: PathBuf,
    /// Directory to put first on PATH when running the hook
    pub bin_path: PathBuf,
    /// Canonical language name
    pub language: String,
    /// Empty for languages that run from the repository
    pub env_name: String,
}

/// Facade over one cache root
pub struct Orchestrator {
    config: StoreConfig,
    catalog: Catalog,
    repo_store: RepoStore,
    registry: LanguageRegistry,
    runner: Arc<dyn CommandRunner>,
    lock: FileLock,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("cache_dir", &self.config.cache_dir())
            .field("languages", &self.registry.list_plugins())
            .finish()
    }
}

/// Create the cache root (0750) with its README and lock sentinel; returns the canonical root
fn prepare_cache_root(cache_dir: &Path) -> Result<PathBuf> {
    FileSystem::create_dir_all(cache_dir)?;
    let root = catalog::canonical_path(cache_dir)?;

    let readme = root.join(README_FILE);
    if !readme.exists() {
        FileSystem::write_private(&readme, README_CONTENTS.as_bytes())?;
    }
    FileLock::for_cache_root(&root).ensure_sentinel()?;
    Ok(root)
}

impl Orchestrator {
    /// Open (creating if needed) the cache root named by `config`
    pub fn open(config: StoreConfig, runner: Arc<dyn CommandRunner>) -> Result<Self> {
        let root = prepare_cache_root(config.cache_dir())?;
        let config = config.with_cache_dir(root.clone());

        let catalog = Catalog::open(&root)?;
        let repo_store = RepoStore::new(&root, catalog.clone(), Arc::clone(&runner))
            .with_subprocess_timeout(config.subprocess_timeout);
        let registry = LanguageRegistry::with_builtin_languages(&config);

        info!(cache_dir = %root.display(), "Opened environment cache");
        Ok(Self {
            lock: FileLock::for_cache_root(&root),
            config,
            catalog,
            repo_store,
            registry,
            runner,
        })
    }

    /// Cache root from the environment, real subprocesses
    pub fn open_default() -> Result<Self> {
        let config = StoreConfig::from_env()?;
        let runner = SystemCommandRunner::new().with_default_timeout(config.subprocess_timeout);
        Self::open(config, Arc::new(runner))
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn cache_dir(&self) -> &Path {
        self.config.cache_dir()
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn registry(&self) -> &LanguageRegistry {
        &self.registry
    }

    /// Where `request` resolves to, without touching the cache
    pub fn locate(&self, request: &ResolveRequest) -> Result<ResolvedEnvironment> {
        let language = self.registry.resolve(&request.language)?;
        Ok(self.locate_with(request, language.as_ref()))
    }

    fn locate_with(&self, request: &ResolveRequest, language: &dyn Language) -> ResolvedEnvironment {
        let version = LanguageVersion::parse(&request.version);
        let repo_path = self.repo_store.get_path(
            &request.repo_url,
            &request.rev,
            &request.additional_dependencies,
        );
        let env_name = if language.needs_environment_setup() {
            fingerprint::environment_name(language.name(), version.as_str())
        } else {
            String::new()
        };
        let env_path = if env_name.is_empty() {
            repo_path.clone()
        } else {
            repo_path.join(&env_name)
        };

        ResolvedEnvironment {
            bin_path: language.environment_bin_path(&env_path),
            env_path,
            repo_path,
            language: language.name().to_string(),
            env_name,
        }
    }

    /// Ready without any mutation: catalogued, cloned, install state present and structurally healthy
    fn is_ready(
        &self,
        request: &ResolveRequest,
        language: &dyn Language,
        resolved: &ResolvedEnvironment,
    ) -> bool {
        let catalog_ref =
            fingerprint::catalog_ref(&request.rev, &request.additional_dependencies);
        match self.catalog.get_repo_path(&request.repo_url, &catalog_ref) {
            Ok(Some(_)) => {}
            Ok(None) => return false,
            Err(e) => {
                warn!(error = %e, "Catalog read failed, treating as cache miss");
                return false;
            }
        }
        if !repo_store::is_cloned(&resolved.repo_path) {
            return false;
        }
        if !language.needs_environment_setup() {
            return true;
        }
        install_state::is_ready(&resolved.env_path)
            && language.check_environment_health(&resolved.env_path)
    }

    /// Return a Ready environment for `request`, cloning and installing as needed.
    ///
    /// A second call with identical inputs only reads the catalog and the
    /// filesystem. Errors leave no Ready-looking environment behind.
    pub async fn resolve(
        &self,
        request: &ResolveRequest,
        cancel: &Cancellation,
    ) -> Result<ResolvedEnvironment> {
        let span = spans::resolve_span(&request.repo_url, &request.rev, &request.language);
        async {
            cancel.check("resolve")?;
            let language = self.registry.resolve(&request.language)?;
            let resolved = self.locate_with(request, language.as_ref());

            if self.is_ready(request, language.as_ref(), &resolved) {
                debug!(hook = %request.hook_id, env_path = %resolved.env_path.display(), "Environment ready");
                return Ok(resolved);
            }

            let _in_flight = InFlight::acquire(&resolved.env_path, cancel).await?;
            let _lock = self.lock.acquire(cancel).await?;

            // Another caller may have finished while we waited
            if self.is_ready(request, language.as_ref(), &resolved) {
                debug!(hook = %request.hook_id, "Environment became ready while waiting");
                return Ok(resolved);
            }

            self.repo_store
                .ensure_cloned(
                    &request.repo_url,
                    &request.rev,
                    &request.additional_dependencies,
                    cancel,
                )
                .await?;

            if language.needs_environment_setup() {
                let ctx = self.setup_context(request, &resolved, cancel);
                let env_path = language.setup_environment(&ctx).await?;
                cancel.check("environment setup")?;
                install_state::write(&env_path, &request.additional_dependencies)?;
                info!(
                    hook = %request.hook_id,
                    language = %resolved.language,
                    env_path = %env_path.display(),
                    "Environment ready"
                );
            } else if !request.additional_dependencies.is_empty() {
                warn!(
                    language = %resolved.language,
                    "additional_dependencies are ignored for languages without an environment"
                );
            }

            Ok(resolved)
        }
        .instrument(span)
        .await
    }

    fn setup_context(
        &self,
        request: &ResolveRequest,
        resolved: &ResolvedEnvironment,
        cancel: &Cancellation,
    ) -> SetupContext {
        SetupContext {
            cache_dir: self.config.cache_dir().to_path_buf(),
            repo_path: resolved.repo_path.clone(),
            repo_url: request.repo_url.clone(),
            version: LanguageVersion::parse(&request.version),
            additional_dependencies: request.additional_dependencies.clone(),
            runner: Arc::clone(&self.runner),
            cancel: cancel.clone(),
            config: self.config.clone(),
        }
    }

    /// Run the language's full health check against an already Ready environment.
    ///
    /// Never installs anything; an environment that is not Ready fails the check.
    pub async fn check_health(
        &self,
        request: &ResolveRequest,
        cancel: &Cancellation,
    ) -> Result<ResolvedEnvironment> {
        let language = self.registry.resolve(&request.language)?;
        let resolved = self.locate_with(request, language.as_ref());

        if !self.is_ready(request, language.as_ref(), &resolved) {
            return Err(HookEnvError::Language(Box::new(LanguageError::HealthCheckFailed {
                language: resolved.language.clone(),
                env_path: resolved.env_path.clone(),
                message: "environment is not installed".to_string(),
            })));
        }
        if !language.needs_environment_setup() {
            return Ok(resolved);
        }

        let ctx = self.setup_context(request, &resolved, cancel);
        language
            .check_health(&ctx, &resolved.env_path, &ctx.version)
            .await?;
        debug!(env_path = %resolved.env_path.display(), "Health check passed");
        Ok(resolved)
    }

    /// Record that the config file at `path` uses this cache; returns the recorded path
    pub async fn mark_config_used(&self, path: &Path, cancel: &Cancellation) -> Result<PathBuf> {
        let canonical = catalog::canonical_path(path)?;
        let _lock = self.lock.acquire(cancel).await?;
        self.catalog.mark_config_used(&canonical)?;
        debug!(path = %canonical.display(), "Marked config as used");
        Ok(canonical)
    }

    pub fn list_configs(&self) -> Result<Vec<PathBuf>> {
        self.catalog.list_configs()
    }

    pub fn list_repos(&self) -> Result<Vec<RepoRecord>> {
        self.catalog.list_repos()
    }
}

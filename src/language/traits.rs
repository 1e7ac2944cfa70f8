// Core Language trait: the capability set every language manager implements

use async_trait::async_trait;
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::cancel::Cancellation;
use crate::config::StoreConfig;
use crate::error::{HookEnvError, LanguageError, Result};
use crate::fingerprint;
use crate::package_manager::InstallRequest;
use crate::process::{CommandRunner, ProcessConfig, ProcessOutput};

/// Requested runtime version
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum LanguageVersion {
    /// The language's preferred runtime
    #[default]
    Default,
    /// Whatever is installed on the host; never downloaded
    System,
    Specific(String),
}

impl LanguageVersion {
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "" | fingerprint::DEFAULT_VERSION => LanguageVersion::Default,
            "system" => LanguageVersion::System,
            other => LanguageVersion::Specific(other.to_string()),
        }
    }

    /// String used in environment directory names
    pub fn as_str(&self) -> &str {
        match self {
            LanguageVersion::Default => fingerprint::DEFAULT_VERSION,
            LanguageVersion::System => "system",
            LanguageVersion::Specific(version) => version,
        }
    }

    pub fn specific(&self) -> Option<&str> {
        match self {
            LanguageVersion::Specific(version) => Some(version),
            _ => None,
        }
    }
}

impl fmt::Display for LanguageVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inputs to one environment materialization
#[derive(Clone)]
pub struct SetupContext {
    pub cache_dir: PathBuf,
    pub repo_path: PathBuf,
    pub repo_url: String,
    pub version: LanguageVersion,
    pub additional_dependencies: Vec<String>,
    pub runner: Arc<dyn CommandRunner>,
    pub cancel: Cancellation,
    pub config: StoreConfig,
}

impl fmt::Debug for SetupContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SetupContext")
            .field("cache_dir", &self.cache_dir)
            .field("repo_path", &self.repo_path)
            .field("repo_url", &self.repo_url)
            .field("version", &self.version)
            .field("additional_dependencies", &self.additional_dependencies)
            .finish()
    }
}

impl SetupContext {
    /// `repo_path/<environment name>` for `language`
    pub fn env_path(&self, language: &str) -> PathBuf {
        let name = fingerprint::environment_name(language, self.version.as_str());
        if name.is_empty() {
            self.repo_path.clone()
        } else {
            self.repo_path.join(name)
        }
    }

    /// Command carrying the configured subprocess timeout
    pub fn command(&self, program: impl Into<String>) -> ProcessConfig {
        ProcessConfig::new(program).with_optional_timeout(self.config.subprocess_timeout)
    }

    /// Run one setup step; a non-zero exit becomes `EnvironmentSetupFailed`
    pub async fn run_step(
        &self,
        language: &str,
        env_path: &Path,
        config: ProcessConfig,
    ) -> Result<ProcessOutput> {
        let output = self.runner.run(&config, &self.cancel).await?;
        if output.success() {
            return Ok(output);
        }
        Err(HookEnvError::Language(Box::new(
            LanguageError::EnvironmentSetupFailed {
                language: language.to_string(),
                env_path: env_path.to_path_buf(),
                error: format!(
                    "{} exited with status {}",
                    config.command_line(),
                    output
                        .exit_code
                        .map(|code| code.to_string())
                        .unwrap_or_else(|| "signal".to_string())
                ),
                output: Some(output.combined_output()),
            },
        )))
    }

    /// Package-manager request targeting `env_path`
    pub fn install_request<'a>(
        &'a self,
        language: &'a str,
        env_path: &'a Path,
        dependencies: &'a [String],
        environment: Vec<(String, OsString)>,
    ) -> InstallRequest<'a> {
        InstallRequest {
            language,
            env_path,
            repo_path: &self.repo_path,
            dependencies,
            environment,
            timeout: self.config.subprocess_timeout,
            runner: self.runner.as_ref(),
            cancel: &self.cancel,
        }
    }
}

/// `PATH` with `dirs` prepended
pub fn prepend_path(dirs: &[PathBuf]) -> OsString {
    let mut paths: Vec<PathBuf> = dirs.to_vec();
    if let Some(existing) = std::env::var_os("PATH") {
        paths.extend(std::env::split_paths(&existing));
    }
    std::env::join_paths(paths).unwrap_or_default()
}

/// Capability set implemented once per supported language
#[async_trait]
pub trait Language: Send + Sync {
    /// Canonical registry name
    fn name(&self) -> &str;

    /// Binary the environment ultimately exposes
    fn executable_name(&self) -> &str;

    /// True iff a suitable host runtime is on PATH
    fn runtime_available(&self) -> bool {
        if which::which(self.executable_name()).is_ok() {
            return true;
        }
        self.name() == "python" && which::which("python3").is_ok()
    }

    fn needs_environment_setup(&self) -> bool {
        true
    }

    fn environment_bin_path(&self, env_root: &Path) -> PathBuf {
        env_root.join("bin")
    }

    /// Materialize the environment for `ctx` and return its path.
    ///
    /// Returns the existing path untouched when it is already ready and healthy.
    async fn setup_environment(&self, ctx: &SetupContext) -> Result<PathBuf> {
        super::base::materialize(self, ctx).await
    }

    /// Create the language-specific layout in a fresh `env_path` and install
    /// the hook repository into it
    async fn create_environment(&self, ctx: &SetupContext, env_path: &Path) -> Result<()>;

    /// Install `deps` into `env_path`; empty `deps` is a no-op
    async fn install_dependencies(
        &self,
        ctx: &SetupContext,
        env_path: &Path,
        deps: &[String],
    ) -> Result<()>;

    /// Quick structural check that needs no subprocess
    fn check_environment_health(&self, env_path: &Path) -> bool {
        env_path.is_dir() && self.environment_bin_path(env_path).is_dir()
    }

    /// Run the environment's executable with `--version`
    async fn check_health(
        &self,
        ctx: &SetupContext,
        env_path: &Path,
        version: &LanguageVersion,
    ) -> Result<()> {
        super::base::version_probe(self, ctx, env_path, version)
            .await
            .map(|_| ())
    }
}

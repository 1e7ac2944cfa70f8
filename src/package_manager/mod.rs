// Adapters for language-native package managers: each writes a manifest into the
// environment and drives the native tool to install from it

use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::cancel::Cancellation;
use crate::error::{HookEnvError, LanguageError, Result};
use crate::filesystem::FileSystem;
use crate::process::{CommandRunner, ProcessConfig, ProcessOutput};

pub mod dart;
pub mod gem;
pub mod npm;
pub mod pip;
pub mod swift;

pub use dart::DartPub;
pub use gem::Gem;
pub use npm::Npm;
pub use pip::Pip;
pub use swift::SwiftPackage;

/// Everything an adapter needs to install into one environment
pub struct InstallRequest<'a> {
    pub language: &'a str,
    pub env_path: &'a Path,
    pub repo_path: &'a Path,
    pub dependencies: &'a [String],
    /// Variables added to every command (PATH prefixes, GEM_HOME, ...)
    pub environment: Vec<(String, OsString)>,
    pub timeout: Option<Duration>,
    pub runner: &'a dyn CommandRunner,
    pub cancel: &'a Cancellation,
}

impl<'a> InstallRequest<'a> {
    /// Base command carrying the request's environment and timeout
    pub fn command(&self, program: impl Into<String>) -> ProcessConfig {
        let mut config = ProcessConfig::new(program).with_optional_timeout(self.timeout);
        for (key, value) in &self.environment {
            config = config.with_env(key.clone(), value.clone());
        }
        config
    }

    /// Run `config`, turning a non-zero exit into `DependencyInstallationFailed`
    pub async fn run(&self, config: ProcessConfig) -> Result<ProcessOutput> {
        let output = self.runner.run(&config, self.cancel).await?;
        if output.success() {
            return Ok(output);
        }
        Err(installation_failed(
            self.language,
            self.dependencies,
            &config.command_line(),
            &output,
        ))
    }
}

/// Error for a failed install command, carrying its output
pub fn installation_failed(
    language: &str,
    dependencies: &[String],
    command_line: &str,
    output: &ProcessOutput,
) -> HookEnvError {
    HookEnvError::Language(Box::new(LanguageError::DependencyInstallationFailed {
        language: language.to_string(),
        dependencies: dependencies.join(" "),
        error: format!(
            "{command_line} exited with status {}",
            output
                .exit_code
                .map(|code| code.to_string())
                .unwrap_or_else(|| "signal".to_string())
        ),
        output: Some(output.combined_output()),
    }))
}

/// Manifest-plus-native-tool installer shared by several language managers
#[async_trait]
pub trait PackageManager: Send + Sync {
    /// Tool name used in logs
    fn name(&self) -> &str;

    /// File written into the environment before installing
    fn manifest_file_name(&self) -> &'static str;

    /// Manifest contents, or `None` when no manifest is needed
    fn render_manifest(&self, request: &InstallRequest<'_>) -> Result<Option<String>>;

    /// Commands that install from the manifest, in order
    fn install_commands(&self, request: &InstallRequest<'_>) -> Result<Vec<ProcessConfig>>;

    /// Write the manifest (mode 0600) and return its path
    fn write_manifest(&self, request: &InstallRequest<'_>) -> Result<Option<PathBuf>> {
        match self.render_manifest(request)? {
            Some(contents) => {
                let path = request.env_path.join(self.manifest_file_name());
                FileSystem::write_private(&path, contents.as_bytes())?;
                debug!(manager = self.name(), path = %path.display(), "Wrote manifest");
                Ok(Some(path))
            }
            None => Ok(None),
        }
    }

    /// Write the manifest, then run every install command
    async fn install(&self, request: &InstallRequest<'_>) -> Result<()> {
        self.write_manifest(request)?;
        for config in self.install_commands(request)? {
            debug!(manager = self.name(), command = %config.command_line(), "Running install step");
            request.run(config).await?;
        }
        Ok(())
    }
}

/// Entries of `dir` with the given extension, sorted; a missing directory yields none
pub(crate) fn files_with_extension(dir: &Path, extension: &str) -> Vec<PathBuf> {
    let mut found: Vec<PathBuf> = std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|entry| entry.ok())
                .map(|entry| entry.path())
                .filter(|path| path.extension().map(|ext| ext == extension).unwrap_or(false))
                .collect()
        })
        .unwrap_or_default();
    found.sort();
    found
}

/// Split `name<sep>version` at the last separator that is not the first character
pub(crate) fn split_versioned(spec: &str, separator: char) -> (&str, Option<&str>) {
    match spec.rfind(separator) {
        Some(index) if index > 0 => (&spec[..index], Some(&spec[index + separator.len_utf8()..])),
        _ => (spec, None),
    }
}

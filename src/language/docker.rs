// Docker language plugins: `docker` builds an image from the hook repository,
// `docker_image` runs a published image and needs no environment

use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{HookEnvError, LanguageError, Result};
use crate::fingerprint;

use super::traits::{Language, LanguageVersion, SetupContext};

/// Label attached to every image built for a hook
pub const IMAGE_LABEL: &str = "PRE_COMMIT";

pub struct DockerLanguagePlugin;

impl DockerLanguagePlugin {
    pub fn new() -> Self {
        Self
    }

    /// `docker build` arguments for the repository at `repo_path`
    pub fn build_args(repo_path: &Path) -> Vec<OsString> {
        vec![
            "build".into(),
            "--tag".into(),
            fingerprint::docker_image_tag(repo_path).into(),
            "--label".into(),
            IMAGE_LABEL.into(),
            "--pull".into(),
            ".".into(),
        ]
    }
}

impl Default for DockerLanguagePlugin {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Language for DockerLanguagePlugin {
    fn name(&self) -> &str {
        "docker"
    }

    fn executable_name(&self) -> &str {
        "docker"
    }

    // The image lives in the daemon; the directory only marks it as built
    fn environment_bin_path(&self, env_root: &Path) -> PathBuf {
        env_root.to_path_buf()
    }

    async fn create_environment(&self, ctx: &SetupContext, env_path: &Path) -> Result<()> {
        debug!(tag = %fingerprint::docker_image_tag(&ctx.repo_path), "Building hook image");
        let build = ctx
            .command("docker")
            .with_args(Self::build_args(&ctx.repo_path))
            .with_working_dir(&ctx.repo_path);
        ctx.run_step(self.name(), env_path, build).await?;
        Ok(())
    }

    async fn install_dependencies(
        &self,
        _ctx: &SetupContext,
        env_path: &Path,
        deps: &[String],
    ) -> Result<()> {
        if deps.is_empty() {
            return Ok(());
        }
        Err(HookEnvError::Language(Box::new(
            LanguageError::EnvironmentSetupFailed {
                language: self.name().to_string(),
                env_path: env_path.to_path_buf(),
                error: format!(
                    "docker hooks do not support additional_dependencies (got {})",
                    deps.join(", ")
                ),
                output: None,
            },
        )))
    }

    async fn check_health(
        &self,
        ctx: &SetupContext,
        env_path: &Path,
        _version: &LanguageVersion,
    ) -> Result<()> {
        let tag = fingerprint::docker_image_tag(&ctx.repo_path);
        let inspect = ctx
            .command("docker")
            .with_args(["image", "inspect", tag.as_str()]);
        let output = ctx.runner.run(&inspect, &ctx.cancel).await?;
        if output.success() {
            return Ok(());
        }
        Err(HookEnvError::Language(Box::new(LanguageError::HealthCheckFailed {
            language: self.name().to_string(),
            env_path: env_path.to_path_buf(),
            message: format!("image {tag} is missing: {}", output.stderr.trim()),
        })))
    }
}

pub struct DockerImageLanguagePlugin;

impl DockerImageLanguagePlugin {
    pub fn new() -> Self {
        Self
    }
}

impl Default for DockerImageLanguagePlugin {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Language for DockerImageLanguagePlugin {
    fn name(&self) -> &str {
        "docker_image"
    }

    fn executable_name(&self) -> &str {
        "docker"
    }

    fn needs_environment_setup(&self) -> bool {
        false
    }

    fn environment_bin_path(&self, env_root: &Path) -> PathBuf {
        env_root.to_path_buf()
    }

    async fn setup_environment(&self, ctx: &SetupContext) -> Result<PathBuf> {
        Ok(ctx.repo_path.clone())
    }

    async fn create_environment(&self, _ctx: &SetupContext, _env_path: &Path) -> Result<()> {
        Ok(())
    }

    async fn install_dependencies(
        &self,
        _ctx: &SetupContext,
        _env_path: &Path,
        _deps: &[String],
    ) -> Result<()> {
        Ok(())
    }

    fn check_environment_health(&self, _env_path: &Path) -> bool {
        true
    }
}

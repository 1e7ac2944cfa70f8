// Conda language plugin: prefix environment created from the repository's environment.yml

use async_trait::async_trait;
use std::ffi::OsString;
use std::path::Path;

use crate::config::CondaFrontend;
use crate::error::Result;
use crate::filesystem::FileSystem;

use super::traits::{Language, SetupContext};

pub const ENVIRONMENT_FILE: &str = "environment.yml";

pub struct CondaLanguagePlugin {
    frontend: CondaFrontend,
}

impl CondaLanguagePlugin {
    pub fn new(frontend: CondaFrontend) -> Self {
        Self { frontend }
    }

    pub fn frontend(&self) -> CondaFrontend {
        self.frontend
    }

    /// `<frontend> env create -p <env> --file environment.yml`
    pub fn create_args(env_path: &Path) -> Vec<OsString> {
        vec![
            "env".into(),
            "create".into(),
            "-p".into(),
            env_path.as_os_str().to_os_string(),
            "--file".into(),
            ENVIRONMENT_FILE.into(),
        ]
    }
}

impl Default for CondaLanguagePlugin {
    fn default() -> Self {
        Self::new(CondaFrontend::default())
    }
}

#[async_trait]
impl Language for CondaLanguagePlugin {
    fn name(&self) -> &str {
        "conda"
    }

    fn executable_name(&self) -> &str {
        self.frontend.executable()
    }

    async fn create_environment(&self, ctx: &SetupContext, env_path: &Path) -> Result<()> {
        // conda refuses to create a prefix over an existing non-environment directory
        FileSystem::remove_dir_if_exists(env_path)?;
        let create = ctx
            .command(self.frontend.executable())
            .with_args(Self::create_args(env_path))
            .with_working_dir(&ctx.repo_path);
        ctx.run_step(self.name(), env_path, create).await?;
        FileSystem::create_dir_all(&env_path.join("bin"))
    }

    async fn install_dependencies(
        &self,
        ctx: &SetupContext,
        env_path: &Path,
        deps: &[String],
    ) -> Result<()> {
        if deps.is_empty() {
            return Ok(());
        }
        let request = ctx.install_request(self.name(), env_path, deps, Vec::new());
        let install = request
            .command(self.frontend.executable())
            .with_args([
                OsString::from("install"),
                "-p".into(),
                env_path.as_os_str().to_os_string(),
            ])
            .with_args(deps.iter().map(String::as_str))
            .with_working_dir(&ctx.repo_path);
        request.run(install).await?;
        Ok(())
    }
}

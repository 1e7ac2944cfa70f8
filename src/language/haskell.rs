// Haskell language plugin: cabal installs executables by copy into <env>/bin

use async_trait::async_trait;
use std::ffi::OsString;
use std::path::Path;

use crate::error::Result;
use crate::filesystem::FileSystem;
use crate::package_manager::files_with_extension;
use crate::process::ProcessConfig;

use super::traits::{prepend_path, Language, SetupContext};

pub struct HaskellLanguagePlugin;

impl HaskellLanguagePlugin {
    pub fn new() -> Self {
        Self
    }

    /// `cabal install --install-method copy --installdir <env>/bin <targets...>`
    fn cabal_install<I, S>(ctx: &SetupContext, env_path: &Path, targets: I) -> ProcessConfig
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        ctx.command("cabal")
            .with_env("PATH", prepend_path(&[env_path.join("bin")]))
            .with_args([
                OsString::from("install"),
                "--install-method".into(),
                "copy".into(),
                "--installdir".into(),
                env_path.join("bin").into_os_string(),
            ])
            .with_args(targets)
    }
}

impl Default for HaskellLanguagePlugin {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Language for HaskellLanguagePlugin {
    fn name(&self) -> &str {
        "haskell"
    }

    fn executable_name(&self) -> &str {
        "ghc"
    }

    fn runtime_available(&self) -> bool {
        which::which("ghc").is_ok() && which::which("cabal").is_ok()
    }

    async fn create_environment(&self, ctx: &SetupContext, env_path: &Path) -> Result<()> {
        FileSystem::create_dir_all(&env_path.join("bin"))?;
        ctx.run_step(self.name(), env_path, ctx.command("cabal").with_arg("update"))
            .await?;

        if !files_with_extension(&ctx.repo_path, "cabal").is_empty() {
            let install = Self::cabal_install(ctx, env_path, ["."]).with_working_dir(&ctx.repo_path);
            ctx.run_step(self.name(), env_path, install).await?;
        }
        Ok(())
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
        let install = Self::cabal_install(ctx, env_path, deps.iter().map(String::as_str))
            .with_working_dir(env_path);
        request.run(install).await?;
        Ok(())
    }
}

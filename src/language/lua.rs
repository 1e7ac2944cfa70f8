// Lua language plugin: luarocks tree rooted at the environment

use async_trait::async_trait;
use std::ffi::OsString;
use std::path::Path;

use crate::error::Result;
use crate::package_manager::files_with_extension;
use crate::process::ProcessConfig;

use super::traits::{prepend_path, Language, SetupContext};

pub struct LuaLanguagePlugin;

impl LuaLanguagePlugin {
    pub fn new() -> Self {
        Self
    }

    /// `luarocks --tree <env> <args...>`
    fn luarocks<I, S>(ctx: &SetupContext, env_path: &Path, args: I) -> ProcessConfig
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        ctx.command("luarocks")
            .with_env("PATH", prepend_path(&[env_path.join("bin")]))
            .with_args([OsString::from("--tree"), env_path.as_os_str().to_os_string()])
            .with_args(args)
    }
}

impl Default for LuaLanguagePlugin {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Language for LuaLanguagePlugin {
    fn name(&self) -> &str {
        "lua"
    }

    fn executable_name(&self) -> &str {
        "lua"
    }

    fn runtime_available(&self) -> bool {
        which::which("lua").is_ok() && which::which("luarocks").is_ok()
    }

    async fn create_environment(&self, ctx: &SetupContext, env_path: &Path) -> Result<()> {
        crate::filesystem::FileSystem::create_dir_all(&env_path.join("bin"))?;
        for rockspec in files_with_extension(&ctx.repo_path, "rockspec") {
            let make = Self::luarocks(ctx, env_path, [OsString::from("make"), rockspec.into_os_string()])
                .with_working_dir(&ctx.repo_path);
            ctx.run_step(self.name(), env_path, make).await?;
        }
        Ok(())
    }

    async fn install_dependencies(
        &self,
        ctx: &SetupContext,
        env_path: &Path,
        deps: &[String],
    ) -> Result<()> {
        let request = ctx.install_request(self.name(), env_path, deps, Vec::new());
        for dep in deps {
            let install = Self::luarocks(ctx, env_path, ["install", dep.as_str()]);
            request.run(install).await?;
        }
        Ok(())
    }
}

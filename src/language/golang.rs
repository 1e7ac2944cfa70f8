// Go language plugin: private GOPATH inside the environment, binaries land in <env>/bin

use async_trait::async_trait;
use std::ffi::OsString;
use std::path::Path;

use crate::error::Result;
use crate::filesystem::FileSystem;

use super::traits::{prepend_path, Language, LanguageVersion, SetupContext};

pub struct GolangLanguagePlugin;

impl GolangLanguagePlugin {
    pub fn new() -> Self {
        Self
    }

    /// GOPATH/GOBIN and, for a specific version, GOTOOLCHAIN
    pub fn environment(env_path: &Path, version: &LanguageVersion) -> Vec<(String, OsString)> {
        let mut vars = vec![
            (
                "GOPATH".to_string(),
                env_path.join("gopath").into_os_string(),
            ),
            ("GOBIN".to_string(), env_path.join("bin").into_os_string()),
            ("GOFLAGS".to_string(), OsString::from("-modcacherw")),
            ("PATH".to_string(), prepend_path(&[env_path.join("bin")])),
        ];
        if let LanguageVersion::Specific(requested) = version {
            let toolchain = if requested.starts_with("go") {
                requested.clone()
            } else {
                format!("go{requested}")
            };
            vars.push(("GOTOOLCHAIN".to_string(), OsString::from(toolchain)));
        }
        vars
    }

    /// `go install` target; a bare module path installs `@latest`
    fn install_target(dep: &str) -> String {
        if dep.contains('@') {
            dep.to_string()
        } else {
            format!("{dep}@latest")
        }
    }
}

impl Default for GolangLanguagePlugin {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Language for GolangLanguagePlugin {
    fn name(&self) -> &str {
        "go"
    }

    fn executable_name(&self) -> &str {
        "go"
    }

    async fn create_environment(&self, ctx: &SetupContext, env_path: &Path) -> Result<()> {
        FileSystem::create_dir_all(&env_path.join("bin"))?;
        if !ctx.repo_path.join("go.mod").exists() {
            return Ok(());
        }
        let request = ctx.install_request(
            self.name(),
            env_path,
            &[],
            Self::environment(env_path, &ctx.version),
        );
        let install = request
            .command("go")
            .with_args(["install", "./..."])
            .with_working_dir(&ctx.repo_path);
        ctx.run_step(self.name(), env_path, install).await?;
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
        let request = ctx.install_request(
            self.name(),
            env_path,
            deps,
            Self::environment(env_path, &ctx.version),
        );
        for dep in deps {
            let install = request
                .command("go")
                .with_args(["install".to_string(), Self::install_target(dep)])
                .with_working_dir(env_path);
            request.run(install).await?;
        }
        Ok(())
    }
}

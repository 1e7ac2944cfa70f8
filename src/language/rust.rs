// Rust language plugin: `cargo install --root <env>` for the hook crate and `cli:` extras

use async_trait::async_trait;
use std::ffi::OsString;
use std::path::Path;

use crate::error::Result;
use crate::package_manager::split_versioned;
use crate::process::ProcessConfig;

use super::traits::{prepend_path, Language, LanguageVersion, SetupContext};

/// Additional dependency split into binaries to install and libraries to add to the hook crate
#[derive(Debug, Default, PartialEq, Eq)]
pub struct RustDependencies {
    /// `cli:<name>[:<version>]`
    pub cli: Vec<(String, Option<String>)>,
    /// `<name>[:<version>]`
    pub lib: Vec<(String, Option<String>)>,
}

impl RustDependencies {
    pub fn parse(deps: &[String]) -> Self {
        let mut parsed = Self::default();
        for dep in deps {
            let (target, spec) = match dep.strip_prefix("cli:") {
                Some(rest) => (&mut parsed.cli, rest),
                None => (&mut parsed.lib, dep.as_str()),
            };
            let (name, version) = split_versioned(spec, ':');
            target.push((name.to_string(), version.map(str::to_string)));
        }
        parsed
    }
}

pub struct RustLanguagePlugin;

impl RustLanguagePlugin {
    pub fn new() -> Self {
        Self
    }

    /// `cargo [+toolchain]` for the requested version
    fn cargo(ctx: &SetupContext, env_path: &Path) -> ProcessConfig {
        let mut config = ctx
            .command("cargo")
            .with_env("PATH", prepend_path(&[env_path.join("bin")]));
        if let LanguageVersion::Specific(toolchain) = &ctx.version {
            config = config.with_arg(format!("+{toolchain}"));
        }
        config
    }

    fn install_repo(ctx: &SetupContext, env_path: &Path) -> ProcessConfig {
        Self::cargo(ctx, env_path)
            .with_args([
                OsString::from("install"),
                "--bins".into(),
                "--root".into(),
                env_path.as_os_str().to_os_string(),
                "--path".into(),
                ctx.repo_path.as_os_str().to_os_string(),
            ])
            .with_working_dir(&ctx.repo_path)
    }
}

impl Default for RustLanguagePlugin {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Language for RustLanguagePlugin {
    fn name(&self) -> &str {
        "rust"
    }

    fn executable_name(&self) -> &str {
        "cargo"
    }

    async fn create_environment(&self, ctx: &SetupContext, env_path: &Path) -> Result<()> {
        if ctx.repo_path.join("Cargo.toml").exists() {
            ctx.run_step(self.name(), env_path, Self::install_repo(ctx, env_path))
                .await?;
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
        let parsed = RustDependencies::parse(deps);
        let request = ctx.install_request(self.name(), env_path, deps, Vec::new());

        if !parsed.lib.is_empty() {
            let manifest = ctx.repo_path.join("Cargo.toml");
            for (name, version) in &parsed.lib {
                let spec = match version {
                    Some(version) => format!("{name}@{version}"),
                    None => name.clone(),
                };
                let add = Self::cargo(ctx, env_path)
                    .with_args([
                        OsString::from("add"),
                        spec.into(),
                        "--manifest-path".into(),
                        manifest.as_os_str().to_os_string(),
                    ])
                    .with_working_dir(&ctx.repo_path);
                request.run(add).await?;
            }
            request.run(Self::install_repo(ctx, env_path)).await?;
        }

        for (name, version) in &parsed.cli {
            let mut install = Self::cargo(ctx, env_path).with_args([
                OsString::from("install"),
                "--bins".into(),
                "--root".into(),
                env_path.as_os_str().to_os_string(),
                name.into(),
            ]);
            if let Some(version) = version {
                install = install.with_args(["--version", version.as_str()]);
            }
            request.run(install).await?;
        }
        Ok(())
    }
}

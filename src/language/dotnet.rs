// .NET language plugin: the repository is packed into local nupkgs and installed as tools

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::filesystem::FileSystem;
use crate::package_manager::{files_with_extension, split_versioned};
use crate::process::ProcessConfig;

use super::traits::{Language, SetupContext};

static NUPKG_NAME: Lazy<Option<Regex>> = Lazy::new(|| {
    Regex::new(r"^(?P<name>.+?)\.(?P<version>\d+(?:\.\d+)+(?:-[0-9A-Za-z.]+)?)\.nupkg$").ok()
});

pub struct DotnetLanguagePlugin;

impl DotnetLanguagePlugin {
    pub fn new() -> Self {
        Self
    }

    fn packages_dir(env_path: &Path) -> PathBuf {
        env_path.join("packages")
    }

    /// Tool id encoded in a `<id>.<version>.nupkg` file name
    pub fn tool_name(nupkg: &Path) -> Option<String> {
        let file_name = nupkg.file_name()?.to_str()?;
        NUPKG_NAME
            .as_ref()?
            .captures(file_name)
            .map(|captures| captures["name"].to_string())
    }

    fn tool_install(ctx: &SetupContext, env_path: &Path) -> ProcessConfig {
        ctx.command("dotnet")
            .with_env("DOTNET_CLI_TELEMETRY_OPTOUT", "1")
            .with_env("DOTNET_NOLOGO", "1")
            .with_args([
                OsString::from("tool"),
                "install".into(),
                "--tool-path".into(),
                env_path.join("bin").into_os_string(),
            ])
    }
}

impl Default for DotnetLanguagePlugin {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Language for DotnetLanguagePlugin {
    fn name(&self) -> &str {
        "dotnet"
    }

    fn executable_name(&self) -> &str {
        "dotnet"
    }

    async fn create_environment(&self, ctx: &SetupContext, env_path: &Path) -> Result<()> {
        let packages = Self::packages_dir(env_path);
        FileSystem::create_dir_all(&env_path.join("bin"))?;
        FileSystem::create_dir_all(&packages)?;

        let pack = ctx
            .command("dotnet")
            .with_env("DOTNET_CLI_TELEMETRY_OPTOUT", "1")
            .with_args([
                OsString::from("pack"),
                "--configuration".into(),
                "Release".into(),
                "--output".into(),
                packages.clone().into_os_string(),
            ])
            .with_working_dir(&ctx.repo_path);
        ctx.run_step(self.name(), env_path, pack).await?;

        for nupkg in files_with_extension(&packages, "nupkg") {
            if let Some(tool) = Self::tool_name(&nupkg) {
                let install = Self::tool_install(ctx, env_path).with_args([
                    OsString::from("--add-source"),
                    packages.clone().into_os_string(),
                    tool.into(),
                ]);
                ctx.run_step(self.name(), env_path, install).await?;
            }
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
            let (name, version) = split_versioned(dep, ':');
            let mut install = Self::tool_install(ctx, env_path).with_arg(name);
            if let Some(version) = version {
                install = install.with_args(["--version", version]);
            }
            request.run(install).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_name_from_nupkg() {
        assert_eq!(
            DotnetLanguagePlugin::tool_name(Path::new("/env/packages/dotnet-format.5.1.0.nupkg")),
            Some("dotnet-format".to_string())
        );
        assert_eq!(
            DotnetLanguagePlugin::tool_name(Path::new("My.Tool.1.0.0-beta.1.nupkg")),
            Some("My.Tool".to_string())
        );
        assert_eq!(DotnetLanguagePlugin::tool_name(Path::new("README.md")), None);
    }
}

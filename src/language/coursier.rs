// Coursier language plugin: JVM applications installed with `cs install` into <env>/bin

use async_trait::async_trait;
use std::ffi::OsString;
use std::path::Path;

use crate::error::Result;
use crate::filesystem::FileSystem;

use super::base;
use super::traits::{prepend_path, Language, SetupContext};

/// Channel directory a hook repository may ship
pub const CHANNEL_DIR: &str = ".pre-commit-channel";

pub struct CoursierLanguagePlugin;

impl CoursierLanguagePlugin {
    pub fn new() -> Self {
        Self
    }

    /// `cs` when on PATH, otherwise `coursier`
    fn executable() -> String {
        base::which_first(&["cs", "coursier"])
            .and_then(|path| path.file_name().map(|name| name.to_string_lossy().into_owned()))
            .unwrap_or_else(|| "cs".to_string())
    }

    /// Arguments for one `cs install`, using the repository's channel when present
    pub fn install_args(repo_path: &Path, env_path: &Path, dep: &str) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec!["install".into()];
        let channel = repo_path.join(CHANNEL_DIR);
        if channel.is_dir() {
            args.push("--default-channels=false".into());
            args.push("--channel".into());
            args.push(channel.into_os_string());
        }
        args.push("--install-dir".into());
        args.push(env_path.join("bin").into_os_string());
        args.push(dep.into());
        args
    }
}

impl Default for CoursierLanguagePlugin {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Language for CoursierLanguagePlugin {
    fn name(&self) -> &str {
        "coursier"
    }

    fn executable_name(&self) -> &str {
        "cs"
    }

    fn runtime_available(&self) -> bool {
        base::which_first(&["cs", "coursier"]).is_some()
    }

    async fn create_environment(&self, _ctx: &SetupContext, env_path: &Path) -> Result<()> {
        FileSystem::create_dir_all(&env_path.join("bin"))
    }

    async fn install_dependencies(
        &self,
        ctx: &SetupContext,
        env_path: &Path,
        deps: &[String],
    ) -> Result<()> {
        let request = ctx.install_request(
            self.name(),
            env_path,
            deps,
            vec![
                (
                    "COURSIER_CACHE".to_string(),
                    env_path.join(".cs-cache").into_os_string(),
                ),
                ("PATH".to_string(), prepend_path(&[env_path.join("bin")])),
            ],
        );
        let executable = Self::executable();
        for dep in deps {
            let install = request
                .command(executable.clone())
                .with_args(Self::install_args(&ctx.repo_path, env_path, dep))
                .with_working_dir(&ctx.repo_path);
            request.run(install).await?;
        }
        Ok(())
    }
}

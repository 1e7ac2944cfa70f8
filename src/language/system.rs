// Languages that run straight from the repository: system, script, fail and pygrep

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use crate::error::Result;

use super::traits::{Language, LanguageVersion, SetupContext};

/// A language with no environment; hooks use host tools or repository files directly
pub struct SystemLanguagePlugin {
    name: &'static str,
    executable: &'static str,
}

impl SystemLanguagePlugin {
    pub fn system() -> Self {
        Self {
            name: "system",
            executable: "sh",
        }
    }

    pub fn script() -> Self {
        Self {
            name: "script",
            executable: "sh",
        }
    }

    pub fn fail() -> Self {
        Self {
            name: "fail",
            executable: "false",
        }
    }

    pub fn pygrep() -> Self {
        Self {
            name: "pygrep",
            executable: "python",
        }
    }
}

#[async_trait]
impl Language for SystemLanguagePlugin {
    fn name(&self) -> &str {
        self.name
    }

    fn executable_name(&self) -> &str {
        self.executable
    }

    fn runtime_available(&self) -> bool {
        true
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

    async fn check_health(
        &self,
        _ctx: &SetupContext,
        _env_path: &Path,
        _version: &LanguageVersion,
    ) -> Result<()> {
        Ok(())
    }
}

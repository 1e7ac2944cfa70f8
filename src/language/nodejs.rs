// Node.js language plugin: node_modules under the environment, npm or yarn front-end,
// nodeenv when a specific Node version is requested

use async_trait::async_trait;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::config::NodePackageManager;
use crate::error::{HookEnvError, LanguageError, Result};
use crate::filesystem::FileSystem;
use crate::package_manager::{Npm, PackageManager};

use super::traits::{prepend_path, Language, LanguageVersion, SetupContext};

pub struct NodejsLanguagePlugin {
    npm: Npm,
}

impl NodejsLanguagePlugin {
    pub fn new(package_manager: NodePackageManager) -> Self {
        Self {
            npm: Npm::new(package_manager),
        }
    }

    fn environment(&self, env_path: &Path) -> Vec<(String, OsString)> {
        vec![
            ("NODE_VIRTUAL_ENV".to_string(), env_path.as_os_str().to_os_string()),
            ("npm_config_prefix".to_string(), env_path.as_os_str().to_os_string()),
            (
                "PATH".to_string(),
                prepend_path(&[env_path.join("bin"), self.environment_bin_path(env_path)]),
            ),
        ]
    }

    /// Link the host's `node` and package manager into `<env>/bin`, looked up in `search_path`
    pub fn link_host_runtime(&self, env_path: &Path, search_path: Option<OsString>) -> Result<()> {
        let bin_dir = env_path.join("bin");
        FileSystem::create_dir_all(&bin_dir)?;

        for tool in ["node", self.npm.manager().executable()] {
            let setup_failed = |error: String| {
                HookEnvError::Language(Box::new(LanguageError::EnvironmentSetupFailed {
                    language: "node".to_string(),
                    env_path: env_path.to_path_buf(),
                    error,
                    output: None,
                }))
            };
            let host = which::which_in(tool, search_path.as_ref(), env_path)
                .map_err(|e| setup_failed(format!("{tool} not found on PATH: {e}")))?;
            let link = bin_dir.join(tool);
            if fs::symlink_metadata(&link).is_ok() {
                fs::remove_file(&link).map_err(|e| setup_failed(e.to_string()))?;
            }
            #[cfg(unix)]
            std::os::unix::fs::symlink(&host, &link).map_err(|e| setup_failed(e.to_string()))?;
            #[cfg(not(unix))]
            fs::copy(&host, &link)
                .map(drop)
                .map_err(|e| setup_failed(e.to_string()))?;
            debug!(tool, host = %host.display(), "Linked host runtime");
        }
        Ok(())
    }

    /// `nodeenv` invocation installing Node `version` into `env_path`
    pub fn nodeenv_args(version: &str, env_path: &Path) -> Vec<OsString> {
        vec![
            "--prebuilt".into(),
            "--clean-src".into(),
            format!("--node={version}").into(),
            "--force".into(),
            env_path.as_os_str().to_os_string(),
        ]
    }
}

impl Default for NodejsLanguagePlugin {
    fn default() -> Self {
        Self::new(NodePackageManager::default())
    }
}

#[async_trait]
impl Language for NodejsLanguagePlugin {
    fn name(&self) -> &str {
        "node"
    }

    fn executable_name(&self) -> &str {
        "node"
    }

    fn runtime_available(&self) -> bool {
        which::which("node").is_ok() && which::which(self.npm.manager().executable()).is_ok()
    }

    fn environment_bin_path(&self, env_root: &Path) -> PathBuf {
        env_root.join("node_modules").join(".bin")
    }

    async fn create_environment(&self, ctx: &SetupContext, env_path: &Path) -> Result<()> {
        match &ctx.version {
            LanguageVersion::Specific(version) => {
                let nodeenv = ctx
                    .command("nodeenv")
                    .with_args(Self::nodeenv_args(version, env_path));
                ctx.run_step(self.name(), env_path, nodeenv).await?;
            }
            LanguageVersion::Default | LanguageVersion::System => {
                self.link_host_runtime(env_path, std::env::var_os("PATH"))?;
            }
        }

        let request = ctx.install_request(self.name(), env_path, &[], self.environment(env_path));
        self.npm.install(&request).await?;
        // npm only creates .bin when some package ships executables
        FileSystem::create_dir_all(&self.environment_bin_path(env_path))
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
        let request = ctx.install_request(self.name(), env_path, deps, self.environment(env_path));
        self.npm.install(&request).await
    }
}

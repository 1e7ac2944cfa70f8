// Swift language plugin: SwiftPM package in the environment, release build products on PATH

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::package_manager::swift::PACKAGE_RESOLVED;
use crate::package_manager::{PackageManager, SwiftPackage};

use super::traits::{Language, SetupContext};

pub struct SwiftLanguagePlugin;

impl SwiftLanguagePlugin {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SwiftLanguagePlugin {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Language for SwiftLanguagePlugin {
    fn name(&self) -> &str {
        "swift"
    }

    fn executable_name(&self) -> &str {
        "swift"
    }

    fn environment_bin_path(&self, env_root: &Path) -> PathBuf {
        env_root.join(".build").join("release")
    }

    async fn create_environment(&self, ctx: &SetupContext, env_path: &Path) -> Result<()> {
        let request = ctx.install_request(self.name(), env_path, &[], Vec::new());
        SwiftPackage.install(&request).await
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
        SwiftPackage.install(&request).await
    }

    fn check_environment_health(&self, env_path: &Path) -> bool {
        env_path.join(PACKAGE_RESOLVED).is_file()
    }
}

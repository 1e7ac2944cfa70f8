// Dart language plugin: pub project rooted at the environment, compiled executables in <env>/bin

use async_trait::async_trait;
use std::path::Path;

use crate::error::Result;
use crate::package_manager::dart::PACKAGE_CONFIG;
use crate::package_manager::{DartPub, PackageManager};

use super::traits::{Language, SetupContext};

pub struct DartLanguagePlugin;

impl DartLanguagePlugin {
    pub fn new() -> Self {
        Self
    }
}

impl Default for DartLanguagePlugin {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Language for DartLanguagePlugin {
    fn name(&self) -> &str {
        "dart"
    }

    fn executable_name(&self) -> &str {
        "dart"
    }

    async fn create_environment(&self, ctx: &SetupContext, env_path: &Path) -> Result<()> {
        let request = ctx.install_request(self.name(), env_path, &[], Vec::new());
        DartPub.install(&request).await
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
        DartPub.install(&request).await
    }

    fn check_environment_health(&self, env_path: &Path) -> bool {
        env_path.join(PACKAGE_CONFIG).is_file()
    }
}

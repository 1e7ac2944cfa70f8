// Ruby language plugin: private GEM_HOME rooted at the environment

use async_trait::async_trait;
use std::ffi::OsString;
use std::path::Path;

use crate::error::Result;
use crate::filesystem::FileSystem;
use crate::package_manager::{Gem, PackageManager};

use super::traits::{prepend_path, Language, SetupContext};

pub struct RubyLanguagePlugin;

impl RubyLanguagePlugin {
    pub fn new() -> Self {
        Self
    }

    fn environment(env_path: &Path) -> Vec<(String, OsString)> {
        vec![
            ("GEM_HOME".to_string(), env_path.as_os_str().to_os_string()),
            ("GEM_PATH".to_string(), OsString::new()),
            ("BUNDLE_IGNORE_CONFIG".to_string(), OsString::from("1")),
            ("PATH".to_string(), prepend_path(&[env_path.join("bin")])),
        ]
    }
}

impl Default for RubyLanguagePlugin {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Language for RubyLanguagePlugin {
    fn name(&self) -> &str {
        "ruby"
    }

    fn executable_name(&self) -> &str {
        "ruby"
    }

    fn runtime_available(&self) -> bool {
        which::which("ruby").is_ok() && which::which("gem").is_ok()
    }

    async fn create_environment(&self, ctx: &SetupContext, env_path: &Path) -> Result<()> {
        FileSystem::create_dir_all(&env_path.join("bin"))?;
        let request = ctx.install_request(self.name(), env_path, &[], Self::environment(env_path));
        Gem.install_repository(&request).await
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
        let request = ctx.install_request(self.name(), env_path, deps, Self::environment(env_path));
        Gem.install(&request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gem_home_points_at_environment() {
        let vars = RubyLanguagePlugin::environment(Path::new("/env"));
        let gem_home = vars.iter().find(|(key, _)| key == "GEM_HOME").unwrap();
        assert_eq!(gem_home.1, OsString::from("/env"));
    }
}

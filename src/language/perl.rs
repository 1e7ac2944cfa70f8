// Perl language plugin: local::lib style install base at the environment, driven by cpan

use async_trait::async_trait;
use std::ffi::OsString;
use std::path::Path;

use crate::error::Result;

use super::traits::{prepend_path, Language, SetupContext};

pub struct PerlLanguagePlugin;

impl PerlLanguagePlugin {
    pub fn new() -> Self {
        Self
    }

    fn environment(env_path: &Path) -> Vec<(String, OsString)> {
        let root = env_path.to_string_lossy();
        vec![
            (
                "PERL5LIB".to_string(),
                env_path.join("lib").join("perl5").into_os_string(),
            ),
            (
                "PERL_LOCAL_LIB_ROOT".to_string(),
                env_path.as_os_str().to_os_string(),
            ),
            (
                "PERL_MB_OPT".to_string(),
                OsString::from(format!("--install_base {root}")),
            ),
            (
                "PERL_MM_OPT".to_string(),
                OsString::from(format!("INSTALL_BASE={root}")),
            ),
            ("PATH".to_string(), prepend_path(&[env_path.join("bin")])),
        ]
    }
}

impl Default for PerlLanguagePlugin {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Language for PerlLanguagePlugin {
    fn name(&self) -> &str {
        "perl"
    }

    fn executable_name(&self) -> &str {
        "perl"
    }

    fn runtime_available(&self) -> bool {
        which::which("perl").is_ok() && which::which("cpan").is_ok()
    }

    async fn create_environment(&self, ctx: &SetupContext, env_path: &Path) -> Result<()> {
        crate::filesystem::FileSystem::create_dir_all(&env_path.join("bin"))?;
        let request = ctx.install_request(self.name(), env_path, &[], Self::environment(env_path));
        let install = request
            .command("cpan")
            .with_args(["-T", "."])
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
        let request = ctx.install_request(self.name(), env_path, deps, Self::environment(env_path));
        let install = request
            .command("cpan")
            .with_arg("-T")
            .with_args(deps.iter().map(String::as_str))
            .with_working_dir(env_path);
        request.run(install).await?;
        Ok(())
    }
}

// Python language plugin: one virtualenv per environment, populated through its own pip

use async_trait::async_trait;
use std::ffi::OsString;
use std::path::Path;
use tracing::debug;

use crate::error::Result;
use crate::package_manager::{PackageManager, Pip};

use super::base;
use super::traits::{prepend_path, Language, LanguageVersion, SetupContext};

pub struct PythonLanguagePlugin;

impl PythonLanguagePlugin {
    pub fn new() -> Self {
        Self
    }

    /// Host interpreter names to try for a version request, most specific first
    pub fn interpreter_candidates(version: &LanguageVersion) -> Vec<String> {
        match version {
            LanguageVersion::Specific(requested) => {
                let requested = requested.strip_prefix("python").unwrap_or(requested);
                vec![
                    format!("python{requested}"),
                    "python3".to_string(),
                    "python".to_string(),
                ]
            }
            LanguageVersion::Default | LanguageVersion::System => {
                vec!["python3".to_string(), "python".to_string()]
            }
        }
    }

    fn interpreter(version: &LanguageVersion) -> String {
        let candidates = Self::interpreter_candidates(version);
        let names: Vec<&str> = candidates.iter().map(String::as_str).collect();
        base::which_first(&names)
            .map(|path| path.to_string_lossy().into_owned())
            .unwrap_or_else(|| candidates[0].clone())
    }

    fn environment(env_path: &Path) -> Vec<(String, OsString)> {
        vec![
            ("VIRTUAL_ENV".to_string(), env_path.as_os_str().to_os_string()),
            ("PATH".to_string(), prepend_path(&[env_path.join("bin")])),
        ]
    }
}

impl Default for PythonLanguagePlugin {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Language for PythonLanguagePlugin {
    fn name(&self) -> &str {
        "python"
    }

    fn executable_name(&self) -> &str {
        "python"
    }

    async fn create_environment(&self, ctx: &SetupContext, env_path: &Path) -> Result<()> {
        let interpreter = Self::interpreter(&ctx.version);
        debug!(interpreter = %interpreter, env_path = %env_path.display(), "Creating virtualenv");
        let venv = ctx
            .command(interpreter)
            .with_args([
                OsString::from("-m"),
                "venv".into(),
                env_path.as_os_str().to_os_string(),
            ]);
        ctx.run_step(self.name(), env_path, venv).await?;

        let request = ctx.install_request(self.name(), env_path, &[], Self::environment(env_path));
        if let Some(install) = Pip::repo_install_command(&request) {
            request.run(install).await?;
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
        let request = ctx.install_request(self.name(), env_path, deps, Self::environment(env_path));
        Pip.install(&request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interpreter_candidates() {
        assert_eq!(
            PythonLanguagePlugin::interpreter_candidates(&LanguageVersion::Default),
            vec!["python3", "python"]
        );
        assert_eq!(
            PythonLanguagePlugin::interpreter_candidates(&LanguageVersion::parse("3.11"))[0],
            "python3.11"
        );
        assert_eq!(
            PythonLanguagePlugin::interpreter_candidates(&LanguageVersion::parse("python3.9"))[0],
            "python3.9"
        );
    }

    #[test]
    fn test_environment_layout() {
        let plugin = PythonLanguagePlugin::new();
        let env = Path::new("/cache/repos/repoabc/py_env-default");
        assert_eq!(plugin.environment_bin_path(env), env.join("bin"));
        assert!(plugin.needs_environment_setup());

        let vars = PythonLanguagePlugin::environment(env);
        assert_eq!(vars[0].1, OsString::from("/cache/repos/repoabc/py_env-default"));
    }
}

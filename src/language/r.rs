// R language plugin: private package library under <env>/library, installed through Rscript

use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::filesystem::FileSystem;

use super::traits::{prepend_path, Language, SetupContext};

pub const CRAN_MIRROR: &str = "https://cloud.r-project.org";

pub struct RLanguagePlugin;

/// Single-quoted R string literal
fn r_string(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"))
}

impl RLanguagePlugin {
    pub fn new() -> Self {
        Self
    }

    fn library(env_path: &Path) -> PathBuf {
        env_path.join("library")
    }

    /// `install.packages` call installing the hook repository from source
    pub fn repo_install_expression(repo_path: &Path, library: &Path) -> String {
        format!(
            "install.packages({}, repos = NULL, type = 'source', lib = {})",
            r_string(&repo_path.to_string_lossy()),
            r_string(&library.to_string_lossy())
        )
    }

    /// `install.packages` call for additional CRAN packages
    pub fn dependency_install_expression(deps: &[String], library: &Path) -> String {
        let packages: Vec<String> = deps.iter().map(|dep| r_string(dep)).collect();
        format!(
            "install.packages(c({}), lib = {}, repos = {})",
            packages.join(", "),
            r_string(&library.to_string_lossy()),
            r_string(CRAN_MIRROR)
        )
    }

    fn environment(env_path: &Path) -> Vec<(String, OsString)> {
        vec![
            ("R_LIBS_USER".to_string(), Self::library(env_path).into_os_string()),
            ("RENV_PROJECT".to_string(), env_path.as_os_str().to_os_string()),
            ("PATH".to_string(), prepend_path(&[env_path.join("bin")])),
        ]
    }
}

impl Default for RLanguagePlugin {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Language for RLanguagePlugin {
    fn name(&self) -> &str {
        "r"
    }

    fn executable_name(&self) -> &str {
        "Rscript"
    }

    async fn create_environment(&self, ctx: &SetupContext, env_path: &Path) -> Result<()> {
        let library = Self::library(env_path);
        FileSystem::create_dir_all(&library)?;
        FileSystem::create_dir_all(&env_path.join("bin"))?;
        if !ctx.repo_path.join("DESCRIPTION").exists() {
            return Ok(());
        }
        let request = ctx.install_request(self.name(), env_path, &[], Self::environment(env_path));
        let install = request
            .command("Rscript")
            .with_args([
                "--vanilla".to_string(),
                "-e".to_string(),
                Self::repo_install_expression(&ctx.repo_path, &library),
            ])
            .with_working_dir(env_path);
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
            .command("Rscript")
            .with_args([
                "--vanilla".to_string(),
                "-e".to_string(),
                Self::dependency_install_expression(deps, &Self::library(env_path)),
            ])
            .with_working_dir(env_path);
        request.run(install).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_install_expressions() {
        let library = Path::new("/env/library");
        assert_eq!(
            RLanguagePlugin::repo_install_expression(Path::new("/repo"), library),
            "install.packages('/repo', repos = NULL, type = 'source', lib = '/env/library')"
        );
        let deps = vec!["lintr".to_string(), "styler".to_string()];
        assert_eq!(
            RLanguagePlugin::dependency_install_expression(&deps, library),
            "install.packages(c('lintr', 'styler'), lib = '/env/library', repos = 'https://cloud.r-project.org')"
        );
    }

    #[test]
    fn test_quotes_are_escaped() {
        assert_eq!(r_string("it's"), "'it\\'s'");
    }
}

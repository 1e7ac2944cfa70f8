// Julia language plugin: the environment is a Julia project instantiated from the repository's manifests

use async_trait::async_trait;
use std::ffi::OsString;
use std::path::Path;

use crate::error::Result;
use crate::filesystem::FileSystem;

use super::traits::{Language, SetupContext};

/// Project files copied from the repository, in lookup order
const PROJECT_FILES: &[(&str, &str)] = &[
    ("JuliaProject.toml", "Project.toml"),
    ("Project.toml", "Project.toml"),
    ("JuliaManifest.toml", "Manifest.toml"),
    ("Manifest.toml", "Manifest.toml"),
];

pub struct JuliaLanguagePlugin;

/// Julia string literal
fn julia_string(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\"").replace('$', "\\$"))
}

impl JuliaLanguagePlugin {
    pub fn new() -> Self {
        Self
    }

    fn environment(env_path: &Path) -> Vec<(String, OsString)> {
        let mut load_path = OsString::from("@:");
        load_path.push(env_path.as_os_str());
        load_path.push(":@stdlib");
        vec![
            ("JULIA_PROJECT".to_string(), env_path.as_os_str().to_os_string()),
            ("JULIA_LOAD_PATH".to_string(), load_path),
            ("JULIA_DEPOT_PATH".to_string(), env_path.join("depot").into_os_string()),
        ]
    }

    /// `Pkg.add` call for additional packages
    pub fn add_expression(deps: &[String]) -> String {
        let packages: Vec<String> = deps.iter().map(|dep| julia_string(dep)).collect();
        format!("using Pkg; Pkg.add([{}]); Pkg.instantiate()", packages.join(", "))
    }
}

impl Default for JuliaLanguagePlugin {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Language for JuliaLanguagePlugin {
    fn name(&self) -> &str {
        "julia"
    }

    fn executable_name(&self) -> &str {
        "julia"
    }

    async fn create_environment(&self, ctx: &SetupContext, env_path: &Path) -> Result<()> {
        FileSystem::create_dir_all(&env_path.join("bin"))?;
        for (source, target) in PROJECT_FILES {
            let source = ctx.repo_path.join(source);
            let target = env_path.join(target);
            if source.is_file() && !target.exists() {
                std::fs::copy(&source, &target)?;
            }
        }

        let request = ctx.install_request(self.name(), env_path, &[], Self::environment(env_path));
        let instantiate = request
            .command("julia")
            .with_args(["--startup-file=no", "-e", "using Pkg; Pkg.instantiate()"])
            .with_working_dir(env_path);
        ctx.run_step(self.name(), env_path, instantiate).await?;
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
        let add = request
            .command("julia")
            .with_args([
                "--startup-file=no".to_string(),
                "-e".to_string(),
                Self::add_expression(deps),
            ])
            .with_working_dir(env_path);
        request.run(add).await?;
        Ok(())
    }
}

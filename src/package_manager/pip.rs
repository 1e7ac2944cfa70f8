// pip adapter: requirements.txt plus `pip install`
use std::path::{Path, PathBuf};

use super::{InstallRequest, PackageManager};
use crate::error::Result;
use crate::process::ProcessConfig;

pub const REQUIREMENTS_FILE: &str = "requirements.txt";

/// Installs into a virtualenv through its own pip
#[derive(Debug, Clone, Default)]
pub struct Pip;

impl Pip {
    /// `bin/pip` inside the environment, falling back to `bin/pip3`
    pub fn executable(env_path: &Path) -> PathBuf {
        let bin = env_path.join("bin");
        let pip = bin.join("pip");
        if pip.exists() {
            return pip;
        }
        let pip3 = bin.join("pip3");
        if pip3.exists() {
            return pip3;
        }
        pip
    }

    /// Repositories with a setup.py or pyproject.toml are installed themselves
    pub fn is_installable(repo_path: &Path) -> bool {
        repo_path.join("setup.py").exists() || repo_path.join("pyproject.toml").exists()
    }

    /// `pip install <repo>` when the repository is a Python package
    pub fn repo_install_command(request: &InstallRequest<'_>) -> Option<ProcessConfig> {
        if !Self::is_installable(request.repo_path) {
            return None;
        }
        let pip = Self::executable(request.env_path);
        Some(
            request
                .command(pip.to_string_lossy().into_owned())
                .with_args(["install".into(), request.repo_path.as_os_str().to_os_string()])
                .with_working_dir(request.repo_path),
        )
    }
}

impl PackageManager for Pip {
    fn name(&self) -> &str {
        "pip"
    }

    fn manifest_file_name(&self) -> &'static str {
        REQUIREMENTS_FILE
    }

    fn render_manifest(&self, request: &InstallRequest<'_>) -> Result<Option<String>> {
        if request.dependencies.is_empty() {
            return Ok(None);
        }
        let mut contents = request.dependencies.join("\n");
        contents.push('\n');
        Ok(Some(contents))
    }

    fn install_commands(&self, request: &InstallRequest<'_>) -> Result<Vec<ProcessConfig>> {
        if request.dependencies.is_empty() {
            return Ok(Vec::new());
        }
        let pip = Self::executable(request.env_path);
        Ok(vec![request
            .command(pip.to_string_lossy().into_owned())
            .with_args(["install", "-r", REQUIREMENTS_FILE])
            .with_working_dir(request.env_path)])
    }
}

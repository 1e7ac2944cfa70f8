// npm/yarn adapter: package.json plus `npm install --prefix` or `yarn install --cwd`
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use super::{split_versioned, InstallRequest, PackageManager};
use crate::config::NodePackageManager;
use crate::error::Result;
use crate::process::ProcessConfig;

pub const PACKAGE_JSON: &str = "package.json";
pub const ENV_PACKAGE_NAME: &str = "pre-commit-env";
pub const ENV_PACKAGE_VERSION: &str = "1.0.0";

#[derive(Debug, Serialize)]
struct PackageJson {
    name: &'static str,
    version: &'static str,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    dependencies: BTreeMap<String, String>,
}

/// Node installer; the front-end follows `StoreConfig::node_package_manager`
#[derive(Debug, Clone, Default)]
pub struct Npm {
    manager: NodePackageManager,
}

impl Npm {
    pub fn new(manager: NodePackageManager) -> Self {
        Self { manager }
    }

    pub fn manager(&self) -> NodePackageManager {
        self.manager
    }

    /// Package name a repository publishes, falling back to its directory name
    fn repo_package_name(repo_path: &Path) -> Option<String> {
        let manifest = repo_path.join(PACKAGE_JSON);
        if !manifest.exists() {
            return None;
        }
        let declared = fs::read_to_string(&manifest)
            .ok()
            .and_then(|raw| serde_json::from_str::<serde_json::Value>(&raw).ok())
            .and_then(|value| value.get("name").and_then(|n| n.as_str()).map(str::to_string));
        declared.or_else(|| {
            repo_path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
        })
    }
}

impl PackageManager for Npm {
    fn name(&self) -> &str {
        self.manager.executable()
    }

    fn manifest_file_name(&self) -> &'static str {
        PACKAGE_JSON
    }

    fn render_manifest(&self, request: &InstallRequest<'_>) -> Result<Option<String>> {
        let mut dependencies = BTreeMap::new();
        if let Some(name) = Self::repo_package_name(request.repo_path) {
            dependencies.insert(name, format!("file:{}", request.repo_path.display()));
        }
        for dep in request.dependencies {
            let (name, version) = split_versioned(dep, '@');
            dependencies.insert(name.to_string(), version.unwrap_or("*").to_string());
        }

        let manifest = PackageJson {
            name: ENV_PACKAGE_NAME,
            version: ENV_PACKAGE_VERSION,
            dependencies,
        };
        let mut rendered = serde_json::to_string_pretty(&manifest)?;
        rendered.push('\n');
        Ok(Some(rendered))
    }

    fn install_commands(&self, request: &InstallRequest<'_>) -> Result<Vec<ProcessConfig>> {
        let env = request.env_path.as_os_str().to_os_string();
        let command = match self.manager {
            NodePackageManager::Npm => request
                .command("npm")
                .with_args(["install".into(), "--no-audit".into(), "--no-fund".into(), "--prefix".into(), env]),
            NodePackageManager::Yarn => request
                .command("yarn")
                .with_args(["install".into(), "--non-interactive".into(), "--cwd".into(), env]),
        };
        Ok(vec![command.with_working_dir(request.env_path)])
    }
}

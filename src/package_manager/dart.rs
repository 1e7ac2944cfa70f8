// Dart pub adapter: pubspec.yaml plus `dart pub get` and `dart compile exe` per executable
use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs;
use std::path::Path;

use super::{files_with_extension, split_versioned, InstallRequest, PackageManager};
use crate::error::Result;
use crate::process::ProcessConfig;

pub const PUBSPEC: &str = "pubspec.yaml";
pub const PACKAGE_CONFIG: &str = ".dart_tool/package_config.json";

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum PubDependency {
    Version(String),
    Path { path: String },
}

#[derive(Debug, Serialize)]
struct Pubspec {
    name: &'static str,
    environment: BTreeMap<&'static str, &'static str>,
    dependencies: BTreeMap<String, PubDependency>,
}

/// Resolves packages into the environment and compiles the repository's executables
#[derive(Debug, Clone, Default)]
pub struct DartPub;

impl DartPub {
    /// Package name from the repository's pubspec.yaml
    fn repo_package_name(repo_path: &Path) -> Option<String> {
        let raw = fs::read_to_string(repo_path.join(PUBSPEC)).ok()?;
        let value: serde_yaml::Value = serde_yaml::from_str(&raw).ok()?;
        value.get("name")?.as_str().map(str::to_string)
    }
}

#[async_trait]
impl PackageManager for DartPub {
    fn name(&self) -> &str {
        "dart pub"
    }

    fn manifest_file_name(&self) -> &'static str {
        PUBSPEC
    }

    fn render_manifest(&self, request: &InstallRequest<'_>) -> Result<Option<String>> {
        let mut dependencies = BTreeMap::new();
        if let Some(name) = Self::repo_package_name(request.repo_path) {
            dependencies.insert(
                name,
                PubDependency::Path {
                    path: request.repo_path.to_string_lossy().into_owned(),
                },
            );
        }
        for dep in request.dependencies {
            let (name, version) = split_versioned(dep, ':');
            dependencies.insert(
                name.to_string(),
                PubDependency::Version(version.unwrap_or("any").to_string()),
            );
        }

        let pubspec = Pubspec {
            name: "pre_commit_env",
            environment: BTreeMap::from([("sdk", ">=2.12.0 <4.0.0")]),
            dependencies,
        };
        Ok(Some(serde_yaml::to_string(&pubspec)?))
    }

    fn install_commands(&self, request: &InstallRequest<'_>) -> Result<Vec<ProcessConfig>> {
        let mut commands = vec![request
            .command("dart")
            .with_args(["pub", "get"])
            .with_working_dir(request.env_path)];

        let bin_dir = request.env_path.join("bin");
        for entry in files_with_extension(&request.repo_path.join("bin"), "dart") {
            let stem = entry
                .file_stem()
                .map(|s| s.to_os_string())
                .unwrap_or_default();
            commands.push(
                request
                    .command("dart")
                    .with_args([
                        OsString::from("compile"),
                        "exe".into(),
                        entry.into_os_string(),
                        "--output".into(),
                        bin_dir.join(stem).into_os_string(),
                    ])
                    .with_working_dir(request.repo_path),
            );
        }
        Ok(commands)
    }

    async fn install(&self, request: &InstallRequest<'_>) -> Result<()> {
        self.write_manifest(request)?;
        crate::filesystem::FileSystem::create_dir_all(&request.env_path.join("bin"))?;
        for config in self.install_commands(request)? {
            request.run(config).await?;
        }
        Ok(())
    }
}

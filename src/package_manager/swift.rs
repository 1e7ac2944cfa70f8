// Swift Package Manager adapter: Package.swift plus `swift package resolve` and a release build
use std::ffi::OsString;

use super::{InstallRequest, PackageManager};
use crate::error::Result;
use crate::process::ProcessConfig;

pub const PACKAGE_SWIFT: &str = "Package.swift";
pub const PACKAGE_RESOLVED: &str = "Package.resolved";

/// Builds the hook repository's executables into `<env>/.build/release`
#[derive(Debug, Clone, Default)]
pub struct SwiftPackage;

fn escape_swift(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// `.package(...)` entry for `<url>` or `<url>@<version>`
fn package_entry(dep: &str) -> String {
    let version_at = dep
        .rfind('@')
        .filter(|&index| index > dep.rfind('/').unwrap_or(0));
    match version_at {
        Some(index) => format!(
            "        .package(url: \"{}\", from: \"{}\"),\n",
            escape_swift(&dep[..index]),
            escape_swift(&dep[index + 1..])
        ),
        None => format!(
            "        .package(url: \"{}\", branch: \"main\"),\n",
            escape_swift(dep)
        ),
    }
}

impl PackageManager for SwiftPackage {
    fn name(&self) -> &str {
        "swift package"
    }

    fn manifest_file_name(&self) -> &'static str {
        PACKAGE_SWIFT
    }

    fn render_manifest(&self, request: &InstallRequest<'_>) -> Result<Option<String>> {
        let mut manifest = String::from(
            "// swift-tools-version:5.5\nimport PackageDescription\n\nlet package = Package(\n    name: \"pre-commit-env\",\n    dependencies: [\n",
        );
        manifest.push_str(&format!(
            "        .package(path: \"{}\"),\n",
            escape_swift(&request.repo_path.to_string_lossy())
        ));
        for dep in request.dependencies {
            manifest.push_str(&package_entry(dep));
        }
        manifest.push_str("    ]\n)\n");
        Ok(Some(manifest))
    }

    fn install_commands(&self, request: &InstallRequest<'_>) -> Result<Vec<ProcessConfig>> {
        let build_path = request.env_path.join(".build");
        Ok(vec![
            request
                .command("swift")
                .with_args(["package", "resolve"])
                .with_working_dir(request.env_path),
            request
                .command("swift")
                .with_args([
                    OsString::from("build"),
                    "-c".into(),
                    "release".into(),
                    "--package-path".into(),
                    request.repo_path.as_os_str().to_os_string(),
                    "--build-path".into(),
                    build_path.into_os_string(),
                ])
                .with_working_dir(request.repo_path),
        ])
    }
}

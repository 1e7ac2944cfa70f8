// RubyGems adapter: Gemfile plus `gem build` / `gem install --install-dir`
use std::ffi::OsString;
use std::path::PathBuf;
use tracing::debug;

use super::{files_with_extension, split_versioned, InstallRequest, PackageManager};
use crate::error::Result;
use crate::process::ProcessConfig;

pub const GEMFILE: &str = "Gemfile";
pub const GEMFILE_HEADER: &str = "source 'https://rubygems.org'\n\n";

/// Installs gems into a private GEM_HOME rooted at the environment
#[derive(Debug, Clone, Default)]
pub struct Gem;

impl Gem {
    /// `gem install` into the environment for the given gem arguments
    fn gem_install(request: &InstallRequest<'_>, gem_args: Vec<OsString>) -> ProcessConfig {
        let bin_dir = request.env_path.join("bin");
        request
            .command("gem")
            .with_args([
                OsString::from("install"),
                "--no-document".into(),
                "--no-format-executable".into(),
                "--install-dir".into(),
                request.env_path.as_os_str().to_os_string(),
                "--bindir".into(),
                bin_dir.into_os_string(),
            ])
            .with_args(gem_args)
            .with_working_dir(request.env_path)
    }

    /// One `gem install` per additional dependency; `name:version` pins a version
    fn dependency_commands(request: &InstallRequest<'_>) -> Vec<ProcessConfig> {
        request
            .dependencies
            .iter()
            .map(|dep| {
                let (name, version) = split_versioned(dep, ':');
                let mut args: Vec<OsString> = vec![name.into()];
                if let Some(version) = version {
                    args.push("--version".into());
                    args.push(version.into());
                }
                Self::gem_install(request, args)
            })
            .collect()
    }

    /// `gem build` for every gemspec the repository ships
    pub fn repo_build_commands(request: &InstallRequest<'_>) -> Vec<ProcessConfig> {
        files_with_extension(request.repo_path, "gemspec")
            .into_iter()
            .map(|gemspec| {
                request
                    .command("gem")
                    .with_args([OsString::from("build"), gemspec.into_os_string()])
                    .with_working_dir(request.repo_path)
            })
            .collect()
    }

    /// Build the repository's gemspecs and install the resulting gems.
    ///
    /// Built gem file names are only known after `gem build` ran.
    pub async fn install_repository(&self, request: &InstallRequest<'_>) -> Result<()> {
        for build in Self::repo_build_commands(request) {
            request.run(build).await?;
        }

        let built: Vec<OsString> = files_with_extension(request.repo_path, "gem")
            .into_iter()
            .map(PathBuf::into_os_string)
            .collect();
        if !built.is_empty() {
            debug!(count = built.len(), "Installing gems built from repository");
            request.run(Self::gem_install(request, built)).await?;
        }
        Ok(())
    }
}

impl PackageManager for Gem {
    fn name(&self) -> &str {
        "gem"
    }

    fn manifest_file_name(&self) -> &'static str {
        GEMFILE
    }

    fn render_manifest(&self, request: &InstallRequest<'_>) -> Result<Option<String>> {
        if request.dependencies.is_empty() {
            return Ok(None);
        }
        let mut contents = String::from(GEMFILE_HEADER);
        for dep in request.dependencies {
            match split_versioned(dep, ':') {
                (name, Some(version)) => contents.push_str(&format!("gem '{name}', '{version}'\n")),
                (name, None) => contents.push_str(&format!("gem '{name}'\n")),
            }
        }
        Ok(Some(contents))
    }

    fn install_commands(&self, request: &InstallRequest<'_>) -> Result<Vec<ProcessConfig>> {
        Ok(Self::dependency_commands(request))
    }
}

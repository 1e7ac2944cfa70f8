// Cloned hook repositories under `<root>/repos/repo<fingerprint>/`
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn, Instrument};

use crate::cancel::Cancellation;
use crate::catalog::Catalog;
use crate::error::{GitError, HookEnvError, Result};
use crate::filesystem::FileSystem;
use crate::fingerprint;
use crate::logging::spans;
use crate::process::{CommandRunner, ProcessConfig};

/// Variables that would redirect git at the caller's repository instead of the clone
const INHERITED_GIT_VARS: &[&str] = &[
    "GIT_DIR",
    "GIT_WORK_TREE",
    "GIT_INDEX_FILE",
    "GIT_OBJECT_DIRECTORY",
    "GIT_ALTERNATE_OBJECT_DIRECTORIES",
];

/// Owner of the repository clones inside one cache root
#[derive(Clone)]
pub struct RepoStore {
    repos_dir: PathBuf,
    catalog: Catalog,
    runner: Arc<dyn CommandRunner>,
    subprocess_timeout: Option<Duration>,
}

impl std::fmt::Debug for RepoStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepoStore")
            .field("repos_dir", &self.repos_dir)
            .field("subprocess_timeout", &self.subprocess_timeout)
            .finish()
    }
}

/// `git` invocation isolated from the caller's repository environment
pub fn git_command<I, S>(args: I) -> ProcessConfig
where
    I: IntoIterator<Item = S>,
    S: Into<std::ffi::OsString>,
{
    let mut config = ProcessConfig::new("git")
        .with_args(args)
        .with_env("GIT_TERMINAL_PROMPT", "0");
    for var in INHERITED_GIT_VARS {
        config = config.without_env(*var);
    }
    config
}

/// A working copy is usable only if its `.git` is present
pub fn is_cloned(path: &Path) -> bool {
    path.join(".git").exists()
}

/// Commit checked out in the working copy at `path`
pub fn head_commit(path: &Path) -> Result<String> {
    let invalid = |error: git2::Error| {
        HookEnvError::Git(Box::new(GitError::InvalidWorkingCopy {
            path: path.to_path_buf(),
            error: error.message().to_string(),
        }))
    };
    let repo = git2::Repository::open(path).map_err(invalid)?;
    let commit = repo
        .head()
        .and_then(|head| head.peel_to_commit())
        .map_err(invalid)?;
    Ok(commit.id().to_string())
}

impl RepoStore {
    pub fn new(cache_dir: &Path, catalog: Catalog, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            repos_dir: cache_dir.join("repos"),
            catalog,
            runner,
            subprocess_timeout: None,
        }
    }

    pub fn with_subprocess_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.subprocess_timeout = timeout;
        self
    }

    pub fn repos_dir(&self) -> &Path {
        &self.repos_dir
    }

    /// Where `(url, rev, deps)` is cloned. Pure; touches nothing on disk.
    pub fn get_path(&self, url: &str, rev: &str, deps: &[String]) -> PathBuf {
        self.repos_dir
            .join(fingerprint::repo_dir_name(url, rev, deps))
    }

    /// Ensure a clone of `url` checked out at `rev` exists and is catalogued.
    ///
    /// Must be called with the cache root's file lock held. A failed clone is
    /// removed before the error is returned so the next attempt starts clean,
    /// and a working copy without a catalog row is cloned again.
    pub async fn ensure_cloned(
        &self,
        url: &str,
        rev: &str,
        deps: &[String],
        cancel: &Cancellation,
    ) -> Result<PathBuf> {
        let path = self.get_path(url, rev, deps);
        let catalog_ref = fingerprint::catalog_ref(rev, deps);

        if is_cloned(&path) {
            if self.catalog.get_repo_path(url, &catalog_ref)?.is_some() {
                debug!(repo = url, rev, path = %path.display(), "Repository already cloned");
                return Ok(path);
            }
            // The catalog row is written last, so an uncatalogued working copy was never finished
            warn!(repo = url, rev, path = %path.display(), "Discarding uncatalogued working copy");
        }

        let span = spans::repo_clone_span(url, rev, &path);
        async {
            FileSystem::remove_dir_if_exists(&path)?;

            // Clone, checkout and submodules happen in a staging directory that is
            // renamed into place only once complete; dropping it on error or
            // cancellation removes the partial clone
            let staging = FileSystem::staging_dir(&self.repos_dir, ".clone-")?;
            self.fetch(url, rev, staging.path(), cancel).await?;
            FileSystem::publish_dir(staging, &path)?;

            self.catalog.put_repo_entry(url, &catalog_ref, &path)?;
            info!(repo = url, rev, path = %path.display(), "Cloned repository");
            Ok(path.clone())
        }
        .instrument(span)
        .await
    }

    async fn fetch(&self, url: &str, rev: &str, path: &Path, cancel: &Cancellation) -> Result<()> {
        let path_arg = path.as_os_str().to_os_string();

        self.run_git(
            git_command(vec!["clone".into(), "--no-checkout".into(), url.into(), path_arg.clone()]),
            url,
            rev,
            "clone",
            cancel,
        )
        .await?;

        self.run_git(
            git_command(vec!["-C".into(), path_arg.clone(), "checkout".into(), rev.into()]),
            url,
            rev,
            "checkout",
            cancel,
        )
        .await?;

        if path.join(".gitmodules").exists() {
            self.run_git(
                git_command(vec![
                    "-C".into(),
                    path_arg,
                    "submodule".into(),
                    "update".into(),
                    "--init".into(),
                    "--recursive".into(),
                ]),
                url,
                rev,
                "submodule update",
                cancel,
            )
            .await?;
        }
        Ok(())
    }

    async fn run_git(
        &self,
        config: ProcessConfig,
        url: &str,
        rev: &str,
        step: &str,
        cancel: &Cancellation,
    ) -> Result<()> {
        let config = config.with_optional_timeout(self.subprocess_timeout);
        // A git that cannot be spawned or times out is still a fetch failure
        let output = self.runner.run(&config, cancel).await.map_err(|e| match e {
            HookEnvError::Process(process_err) => HookEnvError::Git(Box::new(GitError::FetchFailed {
                url: url.to_string(),
                revision: rev.to_string(),
                message: format!("git {step} failed: {process_err}"),
                output: String::new(),
            })),
            other => other,
        })?;
        if output.success() {
            return Ok(());
        }
        Err(HookEnvError::Git(Box::new(GitError::FetchFailed {
            url: url.to_string(),
            revision: rev.to_string(),
            message: format!(
                "git {step} exited with {}",
                output
                    .exit_code
                    .map(|code| code.to_string())
                    .unwrap_or_else(|| "a signal".to_string())
            ),
            output: output.combined_output(),
        })))
    }
}

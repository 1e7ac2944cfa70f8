// CLI interface for hookenv using clap
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

use crate::cancel::Cancellation;
use crate::config::StoreConfig;
use crate::error::{CliError, HookEnvError, Result};
use crate::fingerprint;
use crate::orchestrator::{Orchestrator, ResolveRequest};
use crate::process::SystemCommandRunner;
use crate::repo_store;

#[derive(Parser)]
#[command(
    name = "hookenv",
    about = "hookenv - pre-commit compatible hook repository and environment cache",
    version = crate::VERSION,
    long_about = "hookenv clones hook repositories and materializes their language environments in a cache shared with pre-commit."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Control color output (auto, always, never)
    #[arg(long, global = true, value_name = "WHEN")]
    pub color: Option<String>,

    /// Cache root (defaults to PRE_COMMIT_HOME or ~/.cache/pre-commit)
    #[arg(long, global = true, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Clone a hook repository and install its environment, printing the environment path
    InstallEnv {
        /// Repository URL
        #[arg(long)]
        repo: String,

        /// Revision to check out
        #[arg(long)]
        rev: String,

        /// Hook id, used for logging
        #[arg(long, default_value = "")]
        hook: String,

        /// Hook language
        #[arg(long)]
        language: String,

        /// Language version
        #[arg(long, default_value = fingerprint::DEFAULT_VERSION)]
        language_version: String,

        /// Additional dependency (repeatable, order matters)
        #[arg(long = "additional-dependency", value_name = "DEP")]
        additional_dependencies: Vec<String>,
    },

    /// Run the full health check of an installed environment without installing anything
    CheckEnv {
        #[arg(long)]
        repo: String,

        #[arg(long)]
        rev: String,

        #[arg(long)]
        language: String,

        #[arg(long, default_value = fingerprint::DEFAULT_VERSION)]
        language_version: String,

        #[arg(long = "additional-dependency", value_name = "DEP")]
        additional_dependencies: Vec<String>,
    },

    /// Record that a config file uses this cache
    MarkConfig {
        /// Config file path
        path: PathBuf,
    },

    /// List config files recorded in the cache
    ListConfigs,

    /// List cloned repositories with their checked-out commit
    ListRepos,

    /// List supported languages and whether their runtime is on PATH
    ListLanguages,

    /// Print the environment directory name for a language and version
    EnvName {
        #[arg(long)]
        language: String,

        #[arg(long, default_value = fingerprint::DEFAULT_VERSION)]
        language_version: String,
    },

    /// Print the repository directory name for a repo, revision and dependencies
    Fingerprint {
        #[arg(long)]
        repo: String,

        #[arg(long)]
        rev: String,

        #[arg(long = "additional-dependency", value_name = "DEP")]
        additional_dependencies: Vec<String>,
    },

    /// Generate shell completion scripts
    GenerateCompletion {
        /// Shell to generate completion for
        shell: Shell,
    },
}

impl Cli {
    pub fn run(&self) -> Result<i32> {
        self.init_logging();

        if self.verbose && self.quiet {
            return Err(HookEnvError::Cli(Box::new(CliError::ConflictingArguments {
                first: "--verbose".to_string(),
                second: "--quiet".to_string(),
                suggestion: "Use either --verbose for more output or --quiet for less output, but not both".to_string(),
            })));
        }

        match &self.command {
            Commands::EnvName {
                language,
                language_version,
            } => {
                println!("{}", fingerprint::environment_name(language, language_version));
                Ok(0)
            }
            Commands::Fingerprint {
                repo,
                rev,
                additional_dependencies,
            } => {
                println!(
                    "{}",
                    fingerprint::repo_dir_name(repo, rev, additional_dependencies)
                );
                Ok(0)
            }
            Commands::GenerateCompletion { shell } => {
                let mut cmd = Self::command();
                let name = cmd.get_name().to_string();
                generate(*shell, &mut cmd, name, &mut std::io::stdout());
                Ok(0)
            }
            _ => self.run_with_cache(),
        }
    }

    fn store_config(&self) -> Result<StoreConfig> {
        let config = StoreConfig::from_env()?;
        Ok(match &self.cache_dir {
            Some(dir) => config.with_cache_dir(dir.clone()),
            None => config,
        })
    }

    // Subcommands that open the cache run on a tokio runtime with Ctrl-C wired to cancellation
    fn run_with_cache(&self) -> Result<i32> {
        let config = self.store_config()?;
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .map_err(|e| {
                HookEnvError::Cli(Box::new(CliError::RuntimeError {
                    message: format!("failed to start async runtime: {e}"),
                }))
            })?;

        runtime.block_on(async {
            let runner = SystemCommandRunner::new().with_default_timeout(config.subprocess_timeout);
            let orchestrator = Orchestrator::open(config, Arc::new(runner))?;

            let cancel = Cancellation::new();
            let on_interrupt = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    debug!("Interrupted, cancelling");
                    on_interrupt.cancel();
                }
            });

            self.dispatch(&orchestrator, &cancel).await
        })
    }

    async fn dispatch(&self, orchestrator: &Orchestrator, cancel: &Cancellation) -> Result<i32> {
        match &self.command {
            Commands::InstallEnv {
                repo,
                rev,
                hook,
                language,
                language_version,
                additional_dependencies,
            } => {
                let request = ResolveRequest::new(repo, rev, hook, language)
                    .with_version(language_version)
                    .with_additional_dependencies(additional_dependencies.iter().cloned());
                let resolved = orchestrator.resolve(&request, cancel).await?;
                println!("{}", resolved.env_path.display());
                Ok(0)
            }
            Commands::CheckEnv {
                repo,
                rev,
                language,
                language_version,
                additional_dependencies,
            } => {
                let request = ResolveRequest::new(repo, rev, "", language)
                    .with_version(language_version)
                    .with_additional_dependencies(additional_dependencies.iter().cloned());
                let resolved = orchestrator.check_health(&request, cancel).await?;
                if !self.quiet {
                    println!("{}", resolved.env_path.display());
                }
                Ok(0)
            }
            Commands::MarkConfig { path } => {
                let recorded = orchestrator.mark_config_used(path, cancel).await?;
                if !self.quiet {
                    println!("{}", recorded.display());
                }
                Ok(0)
            }
            Commands::ListConfigs => {
                for path in orchestrator.list_configs()? {
                    println!("{}", path.display());
                }
                Ok(0)
            }
            Commands::ListRepos => {
                for record in orchestrator.list_repos()? {
                    let head = repo_store::head_commit(&record.path)
                        .unwrap_or_else(|_| "-".to_string());
                    println!("{}\t{}\t{}\t{}", record.repo, record.rev, head, record.path.display());
                }
                Ok(0)
            }
            Commands::ListLanguages => {
                let registry = orchestrator.registry();
                for name in registry.list_plugins() {
                    if let Some(language) = registry.get_plugin(&name) {
                        let status = if language.runtime_available() {
                            "available"
                        } else {
                            "missing"
                        };
                        println!("{name}\t{}\t{status}", language.executable_name());
                    }
                }
                Ok(0)
            }
            Commands::EnvName { .. }
            | Commands::Fingerprint { .. }
            | Commands::GenerateCompletion { .. } => Ok(0),
        }
    }

    fn init_logging(&self) {
        use crate::logging::{init_logging, LogConfig};

        let log_config = LogConfig::from_cli(self.verbose, self.quiet, self.color.clone());

        if let Err(e) = init_logging(log_config) {
            eprintln!("Failed to initialize logging: {e}");
        }
    }
}

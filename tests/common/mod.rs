// Shared test utilities: a recording command runner that simulates git/venv/npm on disk

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use hookenv::cancel::Cancellation;
use hookenv::config::StoreConfig;
use hookenv::error::{HookEnvError, Result};
use hookenv::orchestrator::{Orchestrator, ResolveRequest};
use hookenv::process::{CommandRunner, ProcessConfig, ProcessOutput};

/// Records every command and fakes the filesystem effects of the few tools the cache drives
#[derive(Default)]
pub struct MockRunner {
    calls: Mutex<Vec<ProcessConfig>>,
    failures: Mutex<Vec<(String, String)>>,
    delay: Option<Duration>,
}

impl MockRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep this long inside every command (cancellable)
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Make `program <subcommand>` exit 1
    pub fn fail_on(&self, program: &str, subcommand: &str) {
        self.failures
            .lock()
            .push((program.to_string(), subcommand.to_string()));
    }

    pub fn clear_failures(&self) {
        self.failures.lock().clear();
    }

    pub fn calls(&self) -> Vec<ProcessConfig> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Invocations of `program` whose sub-command is `subcommand`
    pub fn count(&self, program: &str, subcommand: &str) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|config| {
                program_name(config) == program
                    && config.subcommand().as_deref() == Some(subcommand)
            })
            .count()
    }

    fn should_fail(&self, config: &ProcessConfig) -> bool {
        let program = program_name(config);
        let subcommand = config.subcommand().unwrap_or_default();
        self.failures
            .lock()
            .iter()
            .any(|(p, s)| *p == program && *s == subcommand)
    }
}

fn program_name(config: &ProcessConfig) -> String {
    Path::new(&config.command)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn args(config: &ProcessConfig) -> Vec<String> {
    config
        .args
        .iter()
        .map(|arg| arg.to_string_lossy().into_owned())
        .collect()
}

fn touch(path: &Path) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, "").unwrap();
}

fn simulate(config: &ProcessConfig) {
    let program = program_name(config);
    let args = args(config);

    match program.as_str() {
        "git" if args.first().map(String::as_str) == Some("clone") => {
            let target = PathBuf::from(args.last().unwrap());
            fs::create_dir_all(target.join(".git")).unwrap();
            fs::write(target.join(".pre-commit-hooks.yaml"), "- id: hook\n").unwrap();
        }
        name if name.starts_with("python") && args.len() >= 3 && args[0] == "-m" && args[1] == "venv" => {
            let env = PathBuf::from(&args[2]);
            touch(&env.join("bin").join("python"));
            touch(&env.join("bin").join("pip"));
        }
        "npm" => {
            if let Some(index) = args.iter().position(|arg| arg == "--prefix") {
                let env = PathBuf::from(&args[index + 1]);
                fs::create_dir_all(env.join("node_modules").join(".bin")).unwrap();
            }
        }
        _ => {}
    }
}

#[async_trait]
impl CommandRunner for MockRunner {
    async fn run(&self, config: &ProcessConfig, cancel: &Cancellation) -> Result<ProcessOutput> {
        cancel.check(&config.command_line())?;
        self.calls.lock().push(config.clone());

        if let Some(delay) = self.delay {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(HookEnvError::cancelled(config.command_line())),
                _ = tokio::time::sleep(delay) => {}
            }
        }

        if self.should_fail(config) {
            return Ok(ProcessOutput {
                exit_code: Some(1),
                stdout: String::new(),
                stderr: format!("mock failure: {}", config.command_line()),
                duration: Duration::ZERO,
            });
        }

        simulate(config);
        Ok(ProcessOutput {
            exit_code: Some(0),
            stdout: String::new(),
            stderr: String::new(),
            duration: Duration::ZERO,
        })
    }
}

/// Orchestrator over `cache` driven by `runner`
pub fn orchestrator(cache: &Path, runner: Arc<MockRunner>) -> Orchestrator {
    Orchestrator::open(StoreConfig::new(cache), runner).unwrap()
}

/// The S1 request: python, default version, no deps
pub fn python_request() -> ResolveRequest {
    ResolveRequest::new("https://example/p", "v1", "hook", "python")
}

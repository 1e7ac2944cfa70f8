// Subprocess execution as values: every invocation yields exit code, stdout and stderr,
// and callers decide how to classify a failure

use async_trait::async_trait;
use std::collections::HashMap;
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::{Output, Stdio};
use std::time::{Duration, Instant};
use tokio::process::{Child, Command};
use tracing::{debug, trace};

use crate::cancel::Cancellation;
use crate::error::{HookEnvError, ProcessError, Result};

/// Process execution configuration
#[derive(Debug, Clone, Default)]
pub struct ProcessConfig {
    pub command: String,
    pub args: Vec<OsString>,
    pub working_dir: Option<PathBuf>,
    pub environment: HashMap<String, OsString>,
    pub removed_environment: Vec<String>,
    pub timeout: Option<Duration>,
}

impl ProcessConfig {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            ..Self::default()
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn with_arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<OsString>) -> Self {
        self.environment.insert(key.into(), value.into());
        self
    }

    /// Drop an inherited variable from the child's environment
    pub fn without_env(mut self, key: impl Into<String>) -> Self {
        self.removed_environment.push(key.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Apply an optional timeout, keeping an existing one when `None`
    pub fn with_optional_timeout(mut self, timeout: Option<Duration>) -> Self {
        if timeout.is_some() {
            self.timeout = timeout;
        }
        self
    }

    /// First argument, used to tell `git clone` from `git checkout` in logs and tests
    pub fn subcommand(&self) -> Option<String> {
        self.args
            .iter()
            .map(|arg| arg.to_string_lossy())
            .find(|arg| !arg.starts_with('-') && !arg.contains('/'))
            .map(|arg| arg.into_owned())
    }

    /// Shell-like rendering of the command for error messages
    pub fn command_line(&self) -> String {
        let mut line = self.command.clone();
        for arg in &self.args {
            line.push(' ');
            line.push_str(&arg.to_string_lossy());
        }
        line
    }
}

/// Captured result of one subprocess
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    /// `None` when the process was terminated by a signal
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub duration: Duration,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// stdout followed by stderr, the way a terminal would show them
    pub fn combined_output(&self) -> String {
        let mut combined = self.stdout.clone();
        if !combined.is_empty() && !combined.ends_with('\n') && !self.stderr.is_empty() {
            combined.push('\n');
        }
        combined.push_str(&self.stderr);
        combined
    }

    /// Turn a non-zero exit into `ProcessError::NonZeroExit`
    pub fn into_checked(self, command: impl Into<String>) -> Result<ProcessOutput> {
        if self.success() {
            return Ok(self);
        }
        Err(HookEnvError::Process(Box::new(ProcessError::NonZeroExit {
            command: command.into(),
            exit_code: self.exit_code,
            stdout: self.stdout,
            stderr: self.stderr,
        })))
    }

    fn from_output(output: Output, duration: Duration) -> Self {
        Self {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            duration,
        }
    }
}

/// Seam between the cache logic and the operating system's process table
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `config` to completion. A non-zero exit is returned as a value, not an error.
    async fn run(&self, config: &ProcessConfig, cancel: &Cancellation) -> Result<ProcessOutput>;
}

/// `CommandRunner` backed by `tokio::process`
#[derive(Debug, Clone, Default)]
pub struct SystemCommandRunner {
    default_timeout: Option<Duration>,
}

impl SystemCommandRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Timeout applied to processes whose config does not carry one
    pub fn with_default_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.default_timeout = timeout;
        self
    }

    fn build_command(config: &ProcessConfig) -> Command {
        let mut cmd = Command::new(&config.command);
        cmd.args(&config.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if let Some(ref dir) = config.working_dir {
            cmd.current_dir(dir);
        }
        for key in &config.removed_environment {
            cmd.env_remove(key);
        }
        for (key, value) in &config.environment {
            cmd.env(key, value);
        }
        cmd
    }

    // Dropping the child on timeout kills it through kill_on_drop
    async fn wait_bounded(child: Child, timeout: Option<Duration>) -> Option<std::io::Result<Output>> {
        match timeout {
            Some(limit) => tokio::time::timeout(limit, child.wait_with_output())
                .await
                .ok(),
            None => Some(child.wait_with_output().await),
        }
    }
}

#[async_trait]
impl CommandRunner for SystemCommandRunner {
    async fn run(&self, config: &ProcessConfig, cancel: &Cancellation) -> Result<ProcessOutput> {
        let command_line = config.command_line();
        cancel.check(&command_line)?;

        debug!(command = %command_line, cwd = ?config.working_dir, "Spawning process");
        let start = Instant::now();

        let child = Self::build_command(config).spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                HookEnvError::Process(Box::new(ProcessError::CommandNotFound {
                    command: config.command.clone(),
                    suggestion: Some(format!("Install '{}' and make sure it is on PATH", config.command)),
                }))
            } else {
                HookEnvError::Process(Box::new(ProcessError::SpawnFailed {
                    command: command_line.clone(),
                    error: e.to_string(),
                }))
            }
        })?;

        let timeout = config.timeout.or(self.default_timeout);

        let waited = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!(command = %command_line, "Process cancelled");
                return Err(HookEnvError::cancelled(command_line));
            }
            waited = Self::wait_bounded(child, timeout) => waited,
        };

        let output = match waited {
            Some(result) => result.map_err(|e| {
                HookEnvError::Process(Box::new(ProcessError::OutputCaptureFailed {
                    message: e.to_string(),
                    command: command_line.clone(),
                }))
            })?,
            None => {
                return Err(HookEnvError::Process(Box::new(ProcessError::Timeout {
                    command: command_line,
                    duration: timeout.unwrap_or_default(),
                })));
            }
        };

        let output = ProcessOutput::from_output(output, start.elapsed());
        trace!(
            command = %command_line,
            exit_code = ?output.exit_code,
            duration_ms = output.duration.as_millis() as u64,
            "Process finished"
        );
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_line_rendering() {
        let config = ProcessConfig::new("git")
            .with_args(["clone", "--no-checkout", "https://example/p", "/tmp/repo"]);
        assert_eq!(
            config.command_line(),
            "git clone --no-checkout https://example/p /tmp/repo"
        );
        assert_eq!(config.subcommand().as_deref(), Some("clone"));
    }

    #[test]
    fn test_subcommand_skips_flags_and_paths() {
        let config = ProcessConfig::new("git").with_args(["-C", "/tmp/repo", "checkout", "v1"]);
        assert_eq!(config.subcommand().as_deref(), Some("checkout"));
    }

    #[test]
    fn test_into_checked() {
        let ok = ProcessOutput {
            exit_code: Some(0),
            stdout: "done".to_string(),
            stderr: String::new(),
            duration: Duration::ZERO,
        };
        assert!(ok.into_checked("true").is_ok());

        let failed = ProcessOutput {
            exit_code: Some(2),
            stdout: String::new(),
            stderr: "boom".to_string(),
            duration: Duration::ZERO,
        };
        let err = failed.into_checked("false").unwrap_err();
        match err {
            HookEnvError::Process(process_err) => match *process_err {
                ProcessError::NonZeroExit {
                    exit_code, stderr, ..
                } => {
                    assert_eq!(exit_code, Some(2));
                    assert_eq!(stderr, "boom");
                }
                other => panic!("unexpected process error: {other:?}"),
            },
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_combined_output() {
        let output = ProcessOutput {
            exit_code: Some(1),
            stdout: "out".to_string(),
            stderr: "err".to_string(),
            duration: Duration::ZERO,
        };
        assert_eq!(output.combined_output(), "out\nerr");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_system_runner_captures_output() {
        let runner = SystemCommandRunner::new();
        let config = ProcessConfig::new("sh").with_args(["-c", "echo hello; echo oops >&2; exit 3"]);
        let output = runner.run(&config, &Cancellation::new()).await.unwrap();
        assert_eq!(output.exit_code, Some(3));
        assert_eq!(output.stdout.trim(), "hello");
        assert_eq!(output.stderr.trim(), "oops");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_system_runner_timeout() {
        let runner = SystemCommandRunner::new();
        let config = ProcessConfig::new("sleep")
            .with_arg("5")
            .with_timeout(Duration::from_millis(50));
        let err = runner.run(&config, &Cancellation::new()).await.unwrap_err();
        assert!(matches!(
            err,
            HookEnvError::Process(ref e) if matches!(**e, ProcessError::Timeout { .. })
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_system_runner_cancellation() {
        let runner = SystemCommandRunner::new();
        let cancel = Cancellation::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });
        let config = ProcessConfig::new("sleep").with_arg("5");
        let err = runner.run(&config, &cancel).await.unwrap_err();
        assert!(matches!(err, HookEnvError::Cancelled { .. }));
    }

    #[tokio::test]
    async fn test_system_runner_missing_command() {
        let runner = SystemCommandRunner::new();
        let config = ProcessConfig::new("hookenv-definitely-not-a-real-binary");
        let err = runner.run(&config, &Cancellation::new()).await.unwrap_err();
        assert!(matches!(
            err,
            HookEnvError::Process(ref e) if matches!(**e, ProcessError::CommandNotFound { .. })
        ));
    }
}

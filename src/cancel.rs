// Cancellation tokens with optional deadlines, threaded through every blocking step
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::{HookEnvError, Result};

/// Cooperative cancellation signal plus an optional absolute deadline.
///
/// Cloning shares the underlying token; `child()` derives a token that is
/// cancelled together with its parent but can also be cancelled on its own.
#[derive(Debug, Clone, Default)]
pub struct Cancellation {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl Cancellation {
    pub fn new() -> Self {
        Self::default()
    }

    /// A token that is never cancelled by anyone but its holder
    pub fn none() -> Self {
        Self::default()
    }

    /// Wrap an existing tokio-util token
    pub fn from_token(token: CancellationToken) -> Self {
        Self {
            token,
            deadline: None,
        }
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(existing) if existing < deadline => existing,
            _ => deadline,
        });
        self
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
            deadline: self.deadline,
        }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left before the deadline; `None` when no deadline is set
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
            || self
                .deadline
                .map(|deadline| Instant::now() >= deadline)
                .unwrap_or(false)
    }

    /// Resolves once the token is cancelled or the deadline passes
    pub async fn cancelled(&self) {
        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    _ = self.token.cancelled() => {}
                    _ = tokio::time::sleep_until(deadline) => {}
                }
            }
            None => self.token.cancelled().await,
        }
    }

    /// Return `Cancelled` naming `operation` if this token has fired
    pub fn check(&self, operation: &str) -> Result<()> {
        if self.is_cancelled() {
            return Err(HookEnvError::cancelled(operation));
        }
        Ok(())
    }
}

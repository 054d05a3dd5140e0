// ABOUTME: Deadline bookkeeping and the shared "pause, then re-check the deadline" poll helper
// ABOUTME: Every waiting loop in the command engine goes through these two types

use crate::client::error::{ModemError, ModemResult};
use std::future::Future;
use std::time::Duration;
use tokio::time::{Instant, sleep};

/// Overall time budget for one operation
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    start: Instant,
    budget: Duration,
}

impl Deadline {
    pub fn after(budget: Duration) -> Self {
        Self {
            start: Instant::now(),
            budget,
        }
    }

    pub fn after_ms(ms: u64) -> Self {
        Self::after(Duration::from_millis(ms))
    }

    pub fn expired(&self) -> bool {
        self.start.elapsed() >= self.budget
    }

    pub fn remaining(&self) -> Duration {
        self.budget.saturating_sub(self.start.elapsed())
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    /// The timeout error for `operation` measured against this deadline
    pub fn timeout(&self, operation: &'static str) -> ModemError {
        ModemError::Timeout {
            operation,
            waited_ms: self.elapsed_ms(),
        }
    }

    /// Drive `fut` for at most the remaining budget
    pub async fn run<F: Future>(&self, operation: &'static str, fut: F) -> ModemResult<F::Output> {
        tokio::time::timeout(self.remaining(), fut)
            .await
            .map_err(|_| self.timeout(operation))
    }
}

/// Bounded back-off between polling attempts of one operation
#[derive(Debug, Clone, Copy)]
pub(crate) struct Poller {
    deadline: Deadline,
    operation: &'static str,
}

impl Poller {
    pub(crate) fn new(deadline: Deadline, operation: &'static str) -> Self {
        Self {
            deadline,
            operation,
        }
    }

    /// Sleep for `pause` (never past the deadline), then fail if the budget is spent
    pub(crate) async fn wait(&self, pause: Duration) -> ModemResult<()> {
        if !pause.is_zero() && !self.deadline.expired() {
            sleep(pause.min(self.deadline.remaining())).await;
        }
        if self.deadline.expired() {
            return Err(self.deadline.timeout(self.operation));
        }
        Ok(())
    }
}

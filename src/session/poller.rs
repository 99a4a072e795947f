//! Bounded, cancellable readiness polling.
//!
//! A check is called once per attempt. Each failed attempt is followed by one
//! interval of waiting, so a check that never succeeds is called exactly
//! `max_attempts` times and the poll gives up `max_attempts * interval` after
//! it started. Check errors count as "not ready".

use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Polling budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollConfig {
    /// Wait between attempts
    pub interval: Duration,
    /// Total check calls before giving up
    pub max_attempts: u32,
}

impl PollConfig {
    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts,
        }
    }

    pub fn from_millis(interval_ms: u64, max_attempts: u32) -> Self {
        Self::new(Duration::from_millis(interval_ms), max_attempts)
    }
}

impl Default for PollConfig {
    /// Interactive session defaults: 1s between checks, 10 checks.
    fn default() -> Self {
        Self::from_millis(1000, 10)
    }
}

/// How a poll ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome<T = ()> {
    /// A check reported readiness
    Ready(T),
    /// Every attempt was used without success
    TimedOut,
    /// The poll was cancelled before it settled
    Cancelled,
}

impl<T> PollOutcome<T> {
    pub fn is_ready(&self) -> bool {
        matches!(self, PollOutcome::Ready(_))
    }
}

/// Generic bounded-retry poller.
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionPoller {
    config: PollConfig,
}

impl SessionPoller {
    pub fn new(config: PollConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PollConfig {
        &self.config
    }

    /// Call `check` until it yields a value, the budget runs out, or `cancel` fires.
    ///
    /// `Ok(None)` and `Err(_)` both mean "not ready yet". After cancellation no
    /// further check is issued and the pending wait is dropped.
    pub async fn poll_until<T, E, F, Fut>(&self, mut check: F, cancel: &CancellationToken) -> PollOutcome<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Option<T>, E>>,
        E: Display,
    {
        for attempt in 1..=self.config.max_attempts {
            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => return PollOutcome::Cancelled,
                result = check() => result,
            };

            match result {
                Ok(Some(value)) => {
                    debug!("Check ready after {} attempt(s)", attempt);
                    return PollOutcome::Ready(value);
                }
                Ok(None) => {
                    debug!("Check not ready (attempt {}/{})", attempt, self.config.max_attempts);
                }
                Err(e) => {
                    debug!(
                        "Check failed (attempt {}/{}): {}",
                        attempt, self.config.max_attempts, e
                    );
                }
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return PollOutcome::Cancelled,
                _ = tokio::time::sleep(self.config.interval) => {}
            }
        }

        PollOutcome::TimedOut
    }

    /// [`poll_until`](Self::poll_until) for a boolean check.
    pub async fn poll<E, F, Fut>(&self, mut check: F, cancel: &CancellationToken) -> PollOutcome
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<bool, E>>,
        E: Display,
    {
        self.poll_until(
            || {
                let fut = check();
                async move { fut.await.map(|ready| ready.then_some(())) }
            },
            cancel,
        )
        .await
    }

    /// Run [`poll_until`](Self::poll_until) as its own task.
    pub fn spawn<T, E, F, Fut>(&self, check: F) -> PollHandle<T>
    where
        T: Send + 'static,
        E: Display + Send + 'static,
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Result<Option<T>, E>> + Send + 'static,
    {
        self.spawn_with(check, CancellationToken::new())
    }

    /// Like [`spawn`](Self::spawn), also cancelled when `parent` is.
    pub fn spawn_linked<T, E, F, Fut>(&self, check: F, parent: &CancellationToken) -> PollHandle<T>
    where
        T: Send + 'static,
        E: Display + Send + 'static,
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Result<Option<T>, E>> + Send + 'static,
    {
        self.spawn_with(check, parent.child_token())
    }

    fn spawn_with<T, E, F, Fut>(&self, check: F, cancel: CancellationToken) -> PollHandle<T>
    where
        T: Send + 'static,
        E: Display + Send + 'static,
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Result<Option<T>, E>> + Send + 'static,
    {
        let poller = *self;
        let token = cancel.clone();
        let task = tokio::spawn(async move { poller.poll_until(check, &token).await });

        PollHandle {
            cancel,
            task: Some(task),
        }
    }
}

/// Handle to a spawned poll. Dropping it cancels the poll.
#[derive(Debug)]
pub struct PollHandle<T> {
    cancel: CancellationToken,
    task: Option<JoinHandle<PollOutcome<T>>>,
}

impl<T> PollHandle<T> {
    /// Stop probing; the outcome becomes [`PollOutcome::Cancelled`] unless already settled.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Wait for the poll to settle.
    pub async fn outcome(mut self) -> PollOutcome<T> {
        let Some(task) = self.task.as_mut() else {
            return PollOutcome::Cancelled;
        };
        let outcome = task.await.unwrap_or(PollOutcome::Cancelled);
        self.task = None;
        outcome
    }
}

impl<T> Drop for PollHandle<T> {
    fn drop(&mut self) {
        if self.task.is_some() {
            self.cancel.cancel();
        }
    }
}

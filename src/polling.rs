//! Submit-then-poll support for oneshot analytics.
//!
//! A submitted oneshot run is polled while its status is `pending` or
//! `running`. Every loop is bounded by [`PollOptions`] and can be aborted
//! through a [`CancellationToken`].

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::{Result, YetiError};
use crate::models::OneshotInstance;

const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(600);

/// Bounds for a polling loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollOptions {
    /// Delay between two status requests.
    pub interval: Duration,
    /// Give up once this much time has passed since submission.
    pub timeout: Option<Duration>,
    /// Give up after this many status requests.
    pub max_attempts: Option<u32>,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            timeout: Some(DEFAULT_TIMEOUT),
            max_attempts: None,
        }
    }
}

impl PollOptions {
    #[must_use]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Poll until a terminal state or cancellation, however long it takes.
    #[must_use]
    pub fn without_timeout(mut self) -> Self {
        self.timeout = None;
        self
    }

    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }
}

/// Poll a oneshot run until it leaves `pending`/`running`.
///
/// `submitted` is the instance returned by the run request; if it is already
/// terminal no status request is made. `fetch` is called with the run id and
/// must return the current instance.
///
/// # Errors
///
/// - [`YetiError::PollTimeout`] when the timeout or attempt cap is hit
/// - [`YetiError::Cancelled`] when `cancel` fires
/// - any error returned by `fetch`
pub async fn poll_until_terminal<F, Fut>(
    submitted: OneshotInstance,
    options: &PollOptions,
    cancel: &CancellationToken,
    mut fetch: F,
) -> Result<OneshotInstance>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<OneshotInstance>>,
{
    let id = submitted.id.clone();
    let started = Instant::now();
    let deadline = options.timeout.and_then(|t| started.checked_add(t));
    let mut attempts: u32 = 0;
    let mut current = submitted;

    while !current.status.is_terminal() {
        if options.max_attempts.is_some_and(|max| attempts >= max) {
            return Err(timed_out(&id, attempts, started));
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(YetiError::Cancelled { id }),
            _ = expired(deadline) => return Err(timed_out(&id, attempts, started)),
            _ = tokio::time::sleep(options.interval) => {}
        }

        attempts += 1;
        current = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(YetiError::Cancelled { id }),
            _ = expired(deadline) => return Err(timed_out(&id, attempts, started)),
            polled = fetch(id.clone()) => polled?,
        };
        tracing::debug!(%id, attempts, status = %current.status, "polled oneshot");
    }

    if current.id.is_empty() {
        current.id = id;
    }
    Ok(current)
}

/// Resolves at `deadline`, or never when there is none.
async fn expired(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

fn timed_out(id: &str, attempts: u32, started: Instant) -> YetiError {
    YetiError::PollTimeout {
        id: id.to_string(),
        attempts,
        elapsed: started.elapsed(),
    }
}

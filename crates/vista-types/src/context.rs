use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::{SourceError, SourceResult};

/// Deadline and cancellation scope for a single fetch.
///
/// One context is derived per refresh cycle and shared by every source
/// fetched in that cycle. Sources that perform I/O should wrap it in
/// [`FetchContext::run`] so a slow upstream cannot outlive the cycle.
#[derive(Clone, Debug)]
pub struct FetchContext {
    deadline: Instant,
    cancel: CancellationToken,
}

impl FetchContext {
    pub fn new(deadline: Instant, cancel: CancellationToken) -> Self {
        Self { deadline, cancel }
    }

    /// A context that expires `timeout` from now, with its own token.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::new(deadline_after(timeout), CancellationToken::new())
    }

    /// A context whose token is a child of `parent`: cancelling the parent
    /// cancels this fetch, but not the other way round.
    pub fn child_of(parent: &CancellationToken, timeout: Duration) -> Self {
        Self::new(deadline_after(timeout), parent.child_token())
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    pub fn token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Time left until the deadline, zero once it has passed.
    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    /// Returns `true` once the context is cancelled or past its deadline.
    pub fn is_done(&self) -> bool {
        self.cancel.is_cancelled() || Instant::now() >= self.deadline
    }

    /// Cancel every fetch sharing this context.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Drive `fut` until it completes, the deadline passes, or the context
    /// is cancelled, whichever happens first.
    pub async fn run<F, T>(&self, fut: F) -> SourceResult<T>
    where
        F: Future<Output = SourceResult<T>>,
    {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(SourceError::Cancelled),
            res = tokio::time::timeout_at(self.deadline, fut) => match res {
                Ok(inner) => inner,
                Err(_) => Err(SourceError::Timeout),
            },
        }
    }
}

/// `now + timeout`, saturating at roughly thirty years out.
fn deadline_after(timeout: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(timeout)
        .unwrap_or_else(|| now + Duration::from_secs(86_400 * 365 * 30))
}

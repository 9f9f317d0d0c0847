use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use vista_engine::SnapshotStore;
use vista_types::Clock;

use crate::error::{MailError, MailResult};
use crate::mailer::{Mailer, Report};
use crate::schedule::DailySchedule;

/// Sends the live snapshot by email, on demand or on a daily schedule.
pub struct Dispatcher {
    mailer: Arc<dyn Mailer>,
    store: Arc<SnapshotStore>,
    subject: String,
}

impl Dispatcher {
    pub fn new(
        mailer: Arc<dyn Mailer>,
        store: Arc<SnapshotStore>,
        subject: impl Into<String>,
    ) -> Self {
        Self {
            mailer,
            store,
            subject: subject.into(),
        }
    }

    /// Send the current snapshot once. Failures are not retried.
    pub async fn dispatch(&self) -> MailResult<()> {
        let artifact = self.store.read().ok_or(MailError::NoSnapshot)?;
        let report = Report::from_artifact(self.subject.as_str(), &artifact);
        self.mailer.send(&report).await?;
        info!(cycle_id = %artifact.cycle_id, "email dispatched");
        Ok(())
    }

    /// Run until `shutdown`, dispatching at every occurrence of `schedule`.
    /// Delivery failures are logged and the loop carries on.
    pub async fn run(
        &self,
        schedule: DailySchedule,
        clock: Arc<dyn Clock>,
        shutdown: CancellationToken,
    ) {
        let mut next = schedule.next_after(clock.now());
        info!(at = %schedule.at(), timezone = %schedule.timezone(), %next, "daily email scheduled");

        loop {
            let wait = (next - clock.now()).to_std().unwrap_or(Duration::ZERO);
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(wait) => {}
            }
            if let Err(err) = self.dispatch().await {
                error!(error = %err, "email dispatch failed");
            }
            next = schedule.next_after(next);
            debug!(%next, "next email scheduled");
        }
        debug!("email loop stopped");
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("subject", &self.subject)
            .finish()
    }
}

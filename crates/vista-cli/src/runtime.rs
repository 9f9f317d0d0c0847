use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::time::{interval_at, timeout, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{error, info, warn};

use vista_engine::{Aggregator, SnapshotStore};
use vista_mail::{DailySchedule, Dispatcher, SmtpMailer};
use vista_render::TemplateRenderer;
use vista_server::VistaServer;
use vista_sources::SourceRegistry;
use vista_types::SystemClock;

use crate::config::AppConfig;

/// Email side of the runtime, present when `[email]` is configured.
pub struct Mail {
    pub dispatcher: Dispatcher,
    pub schedule: DailySchedule,
    pub send_at_start: bool,
}

pub struct Components {
    pub aggregator: Arc<Aggregator>,
    pub store: Arc<SnapshotStore>,
    pub mail: Option<Mail>,
}

/// Construct sources, renderer, aggregator and mailer from configuration.
pub fn build(config: &AppConfig) -> anyhow::Result<Components> {
    let entries = SourceRegistry::new(config.timezone)?.build_all(&config.sources)?;
    let renderer = TemplateRenderer::from_config(&config.render, config.timezone)?;
    let aggregator = Aggregator::new(entries, Arc::new(renderer), config.engine.engine_config())?;
    let store = Arc::new(SnapshotStore::new());

    let mail = match &config.email {
        Some(email) => {
            let schedule = email.schedule(config.timezone)?;
            let mailer = SmtpMailer::from_config(email).context("invalid [email] section")?;
            let dispatcher =
                Dispatcher::new(Arc::new(mailer), store.clone(), email.subject.as_str());
            Some(Mail {
                dispatcher,
                schedule,
                send_at_start: email.send_at_start,
            })
        }
        None => None,
    };

    Ok(Components {
        aggregator: Arc::new(aggregator),
        store,
        mail,
    })
}

/// Run until SIGINT/SIGTERM or until the HTTP server stops on its own.
pub async fn run(config: AppConfig) -> anyhow::Result<()> {
    let Components { aggregator, store, mail } = build(&config)?;
    let shutdown = CancellationToken::new();

    aggregator
        .refresh(&store, &shutdown)
        .await
        .context("initial cycle failed")?;

    if let Some(mail) = &mail {
        if mail.send_at_start {
            if let Err(err) = mail.dispatcher.dispatch().await {
                error!(error = %err, "startup email failed");
            }
        }
    }

    let server = VistaServer::new(config.http.clone(), store.clone());
    let listener = server.bind().await?;

    let tracker = TaskTracker::new();
    tracker.spawn(refresh_loop(
        aggregator,
        store,
        config.engine.refresh_interval(),
        shutdown.clone(),
    ));
    if let Some(Mail { dispatcher, schedule, .. }) = mail {
        let token = shutdown.clone();
        tracker.spawn(async move { dispatcher.run(schedule, Arc::new(SystemClock), token).await });
    }
    let mut server_task = tracker.spawn(server.serve(listener, shutdown.clone()));
    tracker.close();

    let finished = tokio::select! {
        _ = shutdown_signal() => None,
        res = &mut server_task => {
            warn!("server stopped unexpectedly");
            Some(res)
        }
    };
    shutdown.cancel();

    let grace = Duration::from_secs(config.http.shutdown_grace_secs);
    if !drain(&tracker, grace).await {
        error!(grace_secs = grace.as_secs(), "background tasks still running, exiting");
        std::process::exit(1);
    }
    let result = match finished {
        Some(res) => res,
        None => server_task.await,
    };
    result.context("server task panicked")??;
    info!("shut down");
    Ok(())
}

/// Wait up to `grace` for every tracked task. Returns `false` on timeout.
async fn drain(tracker: &TaskTracker, grace: Duration) -> bool {
    timeout(grace, tracker.wait()).await.is_ok()
}

/// Refresh every `every` until `shutdown`. The first tick is one interval
/// out; the caller has already run the initial cycle.
pub async fn refresh_loop(
    aggregator: Arc<Aggregator>,
    store: Arc<SnapshotStore>,
    every: Duration,
    shutdown: CancellationToken,
) {
    let mut ticker = interval_at(Instant::now() + every, every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = ticker.tick() => {}
        }
        // Failures are logged by the aggregator; the previous snapshot stays.
        let _ = aggregator.refresh(&store, &shutdown).await;
    }
    info!("refresh loop stopped");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "cannot listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                error!(error = %err, "cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    info!("shutdown requested");
}

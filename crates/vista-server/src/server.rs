use std::sync::Arc;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

use vista_engine::SnapshotStore;

use crate::config::HttpConfig;
use crate::error::ServerResult;
use crate::router::build_router;

/// Serves the live snapshot until told to stop.
pub struct VistaServer {
    config: HttpConfig,
    store: Arc<SnapshotStore>,
}

impl VistaServer {
    pub fn new(config: HttpConfig, store: Arc<SnapshotStore>) -> Self {
        Self { config, store }
    }

    pub fn config(&self) -> &HttpConfig {
        &self.config
    }

    /// Build the router (useful for testing).
    pub fn router(&self) -> axum::Router {
        build_router(Arc::clone(&self.store), &self.config)
    }

    /// Bind the configured address. Kept apart from [`serve`](Self::serve)
    /// so bind failures surface before any background work starts.
    pub async fn bind(&self) -> ServerResult<TcpListener> {
        Ok(TcpListener::bind(self.config.address).await?)
    }

    /// Serve on `listener` until `shutdown` is cancelled, then drain
    /// in-flight requests.
    pub async fn serve(
        self,
        listener: TcpListener,
        shutdown: CancellationToken,
    ) -> ServerResult<()> {
        let app = self.router();
        let addr = listener.local_addr()?;
        info!(%addr, path = %self.config.path, "HTTP server listening");
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown.cancelled_owned())
            .await?;
        info!("HTTP server stopped");
        Ok(())
    }
}

use std::sync::Arc;

use axum::{routing::get, Router};
use tower_http::compression::CompressionLayer;
use tower_http::trace::TraceLayer;
use tower_http::CompressionLevel;

use vista_engine::SnapshotStore;

use crate::config::HttpConfig;
use crate::handler::{self, AppState};

/// Build the axum router over `store`.
pub fn build_router(store: Arc<SnapshotStore>, config: &HttpConfig) -> Router {
    let router = Router::new()
        .route(&config.path, get(handler::document_handler))
        .route("/text", get(handler::text_handler))
        .route("/healthz", get(handler::health_handler))
        .with_state(AppState { store });

    let router = if config.gzip {
        let level = CompressionLevel::Precise(config.effective_gzip_level() as i32);
        router.layer(CompressionLayer::new().quality(level))
    } else {
        router
    };
    router.layer(TraceLayer::new_for_http())
}

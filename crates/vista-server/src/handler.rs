use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;

use vista_engine::SnapshotStore;
use vista_render::to_plain_text;

/// Clients may reuse a document for two minutes.
pub const CACHE_CONTROL: &str = "public, max-age=120";

/// Shared handler state: the snapshot store, nothing else.
#[derive(Clone, Debug)]
pub struct AppState {
    pub store: Arc<SnapshotStore>,
}

/// The full HTML document.
pub async fn document_handler(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let Some(artifact) = state.store.read() else {
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    };

    let etag = format!("\"{}\"", artifact.etag);
    if etag_matches(&headers, &etag) {
        return (
            StatusCode::NOT_MODIFIED,
            [(header::ETAG, etag), (header::CACHE_CONTROL, CACHE_CONTROL.to_string())],
        )
            .into_response();
    }

    (
        [
            (header::CONTENT_TYPE, "text/html; charset=utf-8"),
            (header::CACHE_CONTROL, CACHE_CONTROL),
        ],
        [(header::ETAG, etag)],
        artifact.rendered_default.clone(),
    )
        .into_response()
}

/// The simplified document as plain text.
pub async fn text_handler(State(state): State<AppState>) -> Response {
    let Some(artifact) = state.store.read() else {
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    };
    let text = to_plain_text(artifact.simplified_or_default());
    (
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8"),
            (header::CACHE_CONTROL, CACHE_CONTROL),
        ],
        text,
    )
        .into_response()
}

/// Liveness plus a little metadata about the live artifact.
pub async fn health_handler(State(state): State<AppState>) -> Response {
    let Some(artifact) = state.store.read() else {
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    };
    let status = if artifact.is_partial() { "degraded" } else { "ok" };
    Json(json!({
        "status": status,
        "generated_at": artifact.generated_at.to_rfc3339(),
        "cycle_id": artifact.cycle_id.to_string(),
        "failed_sources": &artifact.failed_sources,
        "version": env!("CARGO_PKG_VERSION"),
    }))
    .into_response()
}

fn etag_matches(headers: &HeaderMap, etag: &str) -> bool {
    headers
        .get_all(header::IF_NONE_MATCH)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .map(|tag| tag.trim().trim_start_matches("W/"))
        .any(|tag| tag == "*" || tag == etag)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &'static str) -> HeaderMap {
        let mut h = HeaderMap::new();
        h.insert(header::IF_NONE_MATCH, HeaderValue::from_static(value));
        h
    }

    #[test]
    fn etag_matching() {
        assert!(etag_matches(&headers("\"abc\""), "\"abc\""));
        assert!(etag_matches(&headers("\"x\", W/\"abc\""), "\"abc\""));
        assert!(etag_matches(&headers("*"), "\"abc\""));
        assert!(!etag_matches(&headers("\"abd\""), "\"abc\""));
        assert!(!etag_matches(&HeaderMap::new(), "\"abc\""));
    }
}

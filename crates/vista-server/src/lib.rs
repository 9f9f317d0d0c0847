//! HTTP surface for Vista.
//!
//! Every handler reads the injected
//! [`SnapshotStore`](vista_engine::SnapshotStore) and nothing else; no
//! request ever triggers a fetch. Until the first cycle has published an
//! artifact all routes answer `503 Service Unavailable` with an empty body.
//!
//! | route          | response                                        |
//! |----------------|-------------------------------------------------|
//! | `<path>`       | full HTML document, `ETag`, gzip if accepted    |
//! | `/text`        | simplified document as plain text               |
//! | `/healthz`     | JSON status of the live artifact                |

pub mod config;
pub mod error;
pub mod handler;
pub mod router;
pub mod server;

pub use config::{HttpConfig, DEFAULT_GZIP_LEVEL, RESERVED_PATHS};
pub use error::{ServerError, ServerResult};
pub use handler::{AppState, CACHE_CONTROL};
pub use router::build_router;
pub use server::VistaServer;

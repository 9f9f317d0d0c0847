//! Built-in data sources for Vista.
//!
//! Each adapter turns one kind of upstream into a [`SourceData`] whose
//! fragment opens with a collapsible section header anchored at the
//! source's id:
//!
//! | type      | upstream                                   |
//! |-----------|--------------------------------------------|
//! | `static`  | fixed HTML and summary lines from config   |
//! | `file`    | an HTML file re-read on every fetch        |
//! | `command` | stdout of an external program              |
//! | `http`    | an HTML fragment served over HTTP          |
//!
//! [`SourceRegistry`] resolves the `[[sources]]` configuration into the
//! ordered list the aggregator fans out to, adding a cache layer where
//! requested.
//!
//! [`SourceData`]: vista_types::SourceData

pub mod command;
pub mod config;
pub mod error;
pub mod file;
pub mod fragment;
pub mod http;
pub mod registry;
pub mod static_source;

pub use command::CommandSource;
pub use config::{
    CommandSpec, FileSpec, HttpSpec, SourceKind, SourceSpec, StaticSpec, DEFAULT_CACHE_EXPIRY_SECS,
};
pub use error::{SourceConfigError, SourceConfigResult};
pub use file::FileSource;
pub use http::HttpSource;
pub use registry::SourceRegistry;
pub use static_source::StaticSource;

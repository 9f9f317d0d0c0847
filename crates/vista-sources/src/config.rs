use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Expiry applied to cached sources that do not set one.
pub const DEFAULT_CACHE_EXPIRY_SECS: u64 = 300;

fn default_cache_expiry_secs() -> u64 {
    DEFAULT_CACHE_EXPIRY_SECS
}

fn default_max_retries() -> u32 {
    2
}

fn default_retry_backoff_ms() -> u64 {
    500
}

/// One `[[sources]]` entry of the configuration file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSpec {
    /// Display name; also the fragment anchor and the log key.
    pub name: String,
    /// Wrap the source in a refresh-interval cache.
    #[serde(default)]
    pub cached: bool,
    #[serde(default = "default_cache_expiry_secs")]
    pub cache_expiry_secs: u64,
    #[serde(default)]
    pub exclude_from_summary: bool,
    #[serde(flatten)]
    pub kind: SourceKind,
}

impl SourceSpec {
    pub fn new(name: impl Into<String>, kind: SourceKind) -> Self {
        Self {
            name: name.into(),
            cached: false,
            cache_expiry_secs: DEFAULT_CACHE_EXPIRY_SECS,
            exclude_from_summary: false,
            kind,
        }
    }
}

/// Type-specific settings, selected by the `type` key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SourceKind {
    Static(StaticSpec),
    File(FileSpec),
    Command(CommandSpec),
    Http(HttpSpec),
}

impl SourceKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Static(_) => "static",
            Self::File(_) => "file",
            Self::Command(_) => "command",
            Self::Http(_) => "http",
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticSpec {
    pub html: String,
    pub simplified_html: Option<String>,
    #[serde(default)]
    pub summary: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSpec {
    pub path: PathBuf,
    pub simplified_path: Option<PathBuf>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSpec {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
    /// Output lines with this prefix become summary lines.
    pub summary_prefix: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpSpec {
    pub url: String,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
    /// Response header carrying comma-separated summary lines.
    pub summary_header: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct File {
        sources: Vec<SourceSpec>,
    }

    #[test]
    fn parses_every_source_type() {
        let file: File = toml::from_str(
            r#"
            [[sources]]
            type = "static"
            name = "Notes"
            html = "<p>hi</p>"
            summary = ["one note"]

            [[sources]]
            type = "file"
            name = "Agenda"
            path = "/var/lib/vista/agenda.html"
            exclude_from_summary = true

            [[sources]]
            type = "command"
            name = "Backups"
            program = "/usr/local/bin/backup-report"
            args = ["--html"]
            summary_prefix = "SUMMARY:"

            [[sources]]
            type = "http"
            name = "Weather"
            url = "http://weather.local/fragment"
            cached = true
            cache_expiry_secs = 900
            "#,
        )
        .unwrap();

        let types: Vec<_> = file.sources.iter().map(|s| s.kind.type_name()).collect();
        assert_eq!(types, vec!["static", "file", "command", "http"]);

        assert_eq!(file.sources[0].cache_expiry_secs, DEFAULT_CACHE_EXPIRY_SECS);
        assert!(!file.sources[0].cached);
        assert!(file.sources[1].exclude_from_summary);
        match &file.sources[2].kind {
            SourceKind::Command(c) => {
                assert_eq!(c.args, vec!["--html"]);
                assert_eq!(c.summary_prefix.as_deref(), Some("SUMMARY:"));
            }
            other => panic!("unexpected kind: {other:?}"),
        }
        assert!(file.sources[3].cached);
        assert_eq!(file.sources[3].cache_expiry_secs, 900);
        match &file.sources[3].kind {
            SourceKind::Http(h) => {
                assert_eq!(h.max_retries, 2);
                assert_eq!(h.retry_backoff_ms, 500);
                assert!(h.summary_header.is_none());
            }
            other => panic!("unexpected kind: {other:?}"),
        }
    }

    #[test]
    fn unknown_type_is_rejected() {
        let res: Result<File, _> = toml::from_str(
            r#"
            [[sources]]
            type = "carrier-pigeon"
            name = "Mail"
            "#,
        );
        assert!(res.is_err());
    }
}

use std::net::SocketAddr;

use serde::{Deserialize, Serialize};

use crate::error::{ServerError, ServerResult};

/// Paths the server reserves for itself.
pub const RESERVED_PATHS: [&str; 2] = ["/text", "/healthz"];

pub const DEFAULT_GZIP_LEVEL: u32 = 6;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub address: SocketAddr,
    /// Where the HTML document is served.
    pub path: String,
    pub gzip: bool,
    /// 1 (fastest) to 9 (smallest); anything else means the default.
    pub gzip_level: u32,
    /// How long shutdown waits for in-flight requests.
    pub shutdown_grace_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            address: SocketAddr::from(([0, 0, 0, 0], 8080)),
            path: "/".into(),
            gzip: true,
            gzip_level: DEFAULT_GZIP_LEVEL,
            shutdown_grace_secs: 5,
        }
    }
}

impl HttpConfig {
    pub fn validate(&self) -> ServerResult<()> {
        if !self.path.starts_with('/') {
            return Err(ServerError::Config(format!(
                "path {:?} must start with '/'",
                self.path
            )));
        }
        if RESERVED_PATHS.contains(&self.path.as_str()) {
            return Err(ServerError::Config(format!(
                "path {:?} is reserved",
                self.path
            )));
        }
        Ok(())
    }

    pub fn effective_gzip_level(&self) -> u32 {
        if (1..=9).contains(&self.gzip_level) {
            self.gzip_level
        } else {
            DEFAULT_GZIP_LEVEL
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let c = HttpConfig::default();
        assert_eq!(c.address, "0.0.0.0:8080".parse::<SocketAddr>().unwrap());
        assert_eq!(c.path, "/");
        assert!(c.gzip);
        assert_eq!(c.shutdown_grace_secs, 5);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn path_rules() {
        let with_path = |p: &str| HttpConfig {
            path: p.into(),
            ..HttpConfig::default()
        };
        assert!(with_path("/dashboard").validate().is_ok());
        assert!(with_path("dashboard").validate().is_err());
        assert!(with_path("/text").validate().is_err());
        assert!(with_path("/healthz").validate().is_err());
    }

    #[test]
    fn out_of_range_gzip_level_uses_default() {
        let with_level = |l| HttpConfig {
            gzip_level: l,
            ..HttpConfig::default()
        };
        assert_eq!(with_level(9).effective_gzip_level(), 9);
        assert_eq!(with_level(0).effective_gzip_level(), DEFAULT_GZIP_LEVEL);
        assert_eq!(with_level(42).effective_gzip_level(), DEFAULT_GZIP_LEVEL);
    }
}

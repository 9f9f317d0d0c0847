use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use vista_engine::{EngineConfig, MAX_CYCLE_TIMEOUT};
use vista_mail::EmailConfig;
use vista_render::RenderConfig;
use vista_server::HttpConfig;
use vista_sources::{SourceRegistry, SourceSpec};

/// Top-level configuration file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Where "midnight" is for cached sources; default for the email schedule.
    #[serde(default = "default_timezone")]
    pub timezone: Tz,
    #[serde(default)]
    pub engine: EngineSection,
    #[serde(default)]
    pub render: RenderConfig,
    #[serde(default)]
    pub http: HttpConfig,
    pub email: Option<EmailConfig>,
    #[serde(default)]
    pub sources: Vec<SourceSpec>,
}

fn default_timezone() -> Tz {
    Tz::UTC
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSection {
    pub refresh_interval_secs: u64,
    pub cycle_timeout_secs: u64,
    pub max_concurrency: usize,
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            refresh_interval_secs: 60,
            cycle_timeout_secs: 60,
            max_concurrency: 8,
        }
    }
}

impl EngineSection {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    /// Engine settings with the cycle timeout clamped to the refresh interval.
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            cycle_timeout: Duration::from_secs(self.cycle_timeout_secs),
            max_concurrency: self.max_concurrency,
        }
        .clamped_to(self.refresh_interval())
    }
}

impl AppConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read configuration {}", path.display()))?;
        toml::from_str(&raw).with_context(|| format!("invalid configuration {}", path.display()))
    }

    /// Everything that can be checked before the core is constructed.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.sources.is_empty() {
            bail!("no sources configured");
        }
        let max_secs = MAX_CYCLE_TIMEOUT.as_secs();
        if self.engine.refresh_interval_secs == 0 || self.engine.refresh_interval_secs > max_secs {
            bail!("engine.refresh_interval_secs must be between 1 and {max_secs}");
        }
        if self.engine.cycle_timeout_secs > max_secs {
            bail!("engine.cycle_timeout_secs must not exceed {max_secs}");
        }
        self.engine.engine_config().validate()?;
        self.http.validate()?;
        SourceRegistry::new(self.timezone)?.build_all(&self.sources)?;
        if let Some(email) = &self.email {
            email.validate(self.timezone).context("invalid [email] section")?;
        }
        Ok(())
    }
}

use std::fmt;
use std::path::{Path, PathBuf};

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::{MailError, MailResult};
use crate::schedule::DailySchedule;

/// Transport security for the SMTP connection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Security {
    /// Plain connection upgraded with STARTTLS (port 587).
    #[default]
    Starttls,
    /// Implicit TLS (port 465).
    Tls,
    /// No encryption (port 25). Only for local relays.
    None,
}

impl Security {
    pub fn default_port(self) -> u16 {
        match self {
            Self::Starttls => 587,
            Self::Tls => 465,
            Self::None => 25,
        }
    }
}

/// SASL mechanism used when credentials are configured.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuthMechanism {
    #[default]
    Plain,
    Login,
    CramMd5,
}

impl AuthMechanism {
    /// The matching bit in an EHLO `auth_mechanisms` set.
    pub fn mask(self) -> u64 {
        match self {
            Self::Plain => smtp_proto::AUTH_PLAIN,
            Self::Login => smtp_proto::AUTH_LOGIN,
            Self::CramMd5 => smtp_proto::AUTH_CRAM_MD5,
        }
    }
}

impl fmt::Display for AuthMechanism {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Plain => "PLAIN",
            Self::Login => "LOGIN",
            Self::CramMd5 => "CRAM-MD5",
        })
    }
}

fn default_subject() -> String {
    "Vista".into()
}

/// The `[email]` section.
///
/// Every credential and address can be given inline or through a `*_file`
/// key; inline values win. File contents are trimmed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailConfig {
    /// Daily dispatch time, `HH:MM`.
    pub at: String,
    /// Falls back to the top-level timezone.
    pub timezone: Option<Tz>,
    /// `host` or `host:port`.
    pub host: String,
    #[serde(default)]
    pub security: Security,
    #[serde(default)]
    pub auth: AuthMechanism,
    pub username: Option<String>,
    pub username_file: Option<PathBuf>,
    pub password: Option<String>,
    pub password_file: Option<PathBuf>,
    pub from: Option<String>,
    pub from_file: Option<PathBuf>,
    #[serde(default)]
    pub recipients: Vec<String>,
    /// Comma-separated addresses.
    pub recipients_file: Option<PathBuf>,
    #[serde(default = "default_subject")]
    pub subject: String,
    /// Also send once right after the first cycle.
    #[serde(default)]
    pub send_at_start: bool,
}

impl EmailConfig {
    pub fn schedule(&self, fallback: Tz) -> MailResult<DailySchedule> {
        DailySchedule::parse(&self.at, self.timezone.unwrap_or(fallback))
    }

    /// Split `host` into host name and port.
    pub fn endpoint(&self) -> MailResult<(String, u16)> {
        let host = self.host.trim();
        if host.is_empty() {
            return Err(MailError::Config("host must not be empty".into()));
        }
        match host.rsplit_once(':') {
            Some((name, port)) => {
                let port = port
                    .parse()
                    .map_err(|_| MailError::Config(format!("invalid port in {host:?}")))?;
                Ok((name.to_string(), port))
            }
            None => Ok((host.to_string(), self.security.default_port())),
        }
    }

    pub fn username(&self) -> MailResult<Option<String>> {
        secret(self.username.as_deref(), self.username_file.as_deref())
    }

    pub fn password(&self) -> MailResult<Option<String>> {
        secret(self.password.as_deref(), self.password_file.as_deref())
    }

    pub fn sender(&self) -> MailResult<String> {
        secret(self.from.as_deref(), self.from_file.as_deref())?
            .ok_or_else(|| MailError::Config("one of from or from_file is required".into()))
    }

    pub fn recipient_list(&self) -> MailResult<Vec<String>> {
        let list: Vec<String> = if !self.recipients.is_empty() {
            self.recipients.iter().map(|r| r.trim().to_string()).collect()
        } else if let Some(path) = &self.recipients_file {
            read_secret(path)?
                .split(',')
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .map(String::from)
                .collect()
        } else {
            Vec::new()
        };
        if list.is_empty() {
            return Err(MailError::Config(
                "one of recipients or recipients_file is required".into(),
            ));
        }
        Ok(list)
    }

    /// Check everything that can be checked without talking to the server.
    pub fn validate(&self, fallback: Tz) -> MailResult<()> {
        self.schedule(fallback)?;
        self.endpoint()?;
        self.sender()?;
        self.recipient_list()?;
        if self.username()?.is_some() != self.password()?.is_some() {
            return Err(MailError::Config(
                "username and password must be set together".into(),
            ));
        }
        Ok(())
    }
}

fn secret(inline: Option<&str>, file: Option<&Path>) -> MailResult<Option<String>> {
    match (inline.filter(|v| !v.is_empty()), file) {
        (Some(value), _) => Ok(Some(value.to_string())),
        (None, Some(path)) => read_secret(path).map(Some),
        (None, None) => Ok(None),
    }
}

fn read_secret(path: &Path) -> MailResult<String> {
    std::fs::read_to_string(path)
        .map(|s| s.trim().to_string())
        .map_err(|source| MailError::SecretFile {
            path: path.to_path_buf(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(extra: &str) -> EmailConfig {
        toml::from_str(&format!(
            "at = \"07:30\"\nhost = \"smtp.example.org\"\n{extra}"
        ))
        .unwrap()
    }

    #[test]
    fn defaults() {
        let c = parse("from = \"vista@example.org\"\nrecipients = [\"me@example.org\"]");
        assert_eq!(c.security, Security::Starttls);
        assert_eq!(c.auth, AuthMechanism::Plain);
        assert_eq!(c.subject, "Vista");
        assert!(!c.send_at_start);
        assert_eq!(c.endpoint().unwrap(), ("smtp.example.org".to_string(), 587));
        assert!(c.validate(Tz::UTC).is_ok());
    }

    #[test]
    fn explicit_port_and_security() {
        let c = parse("security = \"tls\"\nauth = \"login\"");
        assert_eq!(c.security, Security::Tls);
        assert_eq!(c.auth, AuthMechanism::Login);

        let mut c = c;
        assert_eq!(c.endpoint().unwrap().1, 465);
        c.host = "mail.local:2525".into();
        assert_eq!(c.endpoint().unwrap(), ("mail.local".to_string(), 2525));
        c.host = "mail.local:smtp".into();
        assert!(c.endpoint().is_err());
    }

    #[test]
    fn cram_md5_is_selectable() {
        let c = parse("auth = \"cram-md5\"");
        assert_eq!(c.auth, AuthMechanism::CramMd5);
        assert_eq!(c.auth.to_string(), "CRAM-MD5");
        assert_eq!(c.auth.mask(), smtp_proto::AUTH_CRAM_MD5);

        let bad: Result<EmailConfig, _> =
            toml::from_str("at = \"07:30\"\nhost = \"h\"\nauth = \"digest-md5\"");
        assert!(bad.is_err());
    }

    #[test]
    fn secrets_from_files_are_trimmed() {
        let dir = tempfile::tempdir().unwrap();
        let user = dir.path().join("user");
        let pass = dir.path().join("pass");
        let rcpt = dir.path().join("rcpt");
        std::fs::write(&user, "vista\n").unwrap();
        std::fs::write(&pass, "  hunter2\n").unwrap();
        std::fs::write(&rcpt, "a@example.org, b@example.org,\n").unwrap();

        let c = parse(&format!(
            "from = \"vista@example.org\"\nusername_file = {:?}\npassword_file = {:?}\nrecipients_file = {:?}",
            user, pass, rcpt
        ));
        assert_eq!(c.username().unwrap().as_deref(), Some("vista"));
        assert_eq!(c.password().unwrap().as_deref(), Some("hunter2"));
        assert_eq!(c.recipient_list().unwrap(), vec!["a@example.org", "b@example.org"]);
        assert!(c.validate(Tz::UTC).is_ok());
    }

    #[test]
    fn inline_value_wins_over_file() {
        let c = parse("username = \"inline\"\nusername_file = \"/nonexistent\"");
        assert_eq!(c.username().unwrap().as_deref(), Some("inline"));
    }

    #[test]
    fn missing_secret_file_is_reported() {
        let c = parse("password_file = \"/nonexistent/pass\"");
        assert!(matches!(c.password(), Err(MailError::SecretFile { .. })));
    }

    #[test]
    fn validation_failures() {
        let no_sender = parse("recipients = [\"me@example.org\"]");
        assert!(no_sender.validate(Tz::UTC).is_err());

        let no_recipients = parse("from = \"vista@example.org\"");
        assert!(no_recipients.validate(Tz::UTC).is_err());

        let half_credentials =
            parse("from = \"v@example.org\"\nrecipients = [\"me@example.org\"]\nusername = \"u\"");
        assert!(half_credentials.validate(Tz::UTC).is_err());

        let mut bad_time = parse("from = \"v@example.org\"\nrecipients = [\"me@example.org\"]");
        bad_time.at = "7:3o".into();
        assert!(bad_time.validate(Tz::UTC).is_err());
    }

    #[test]
    fn timezone_falls_back() {
        let berlin: Tz = "Europe/Berlin".parse().unwrap();
        let c = parse("");
        assert_eq!(c.schedule(berlin).unwrap().timezone(), berlin);

        let c = parse("timezone = \"America/New_York\"");
        assert_eq!(c.schedule(berlin).unwrap().timezone(), chrono_tz::America::New_York);
    }
}

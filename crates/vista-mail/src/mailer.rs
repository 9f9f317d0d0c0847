use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use email_address::EmailAddress;
use mail_send::mail_builder::headers::address::Address;
use mail_send::mail_builder::MessageBuilder;
use mail_send::{Credentials, SmtpClient, SmtpClientBuilder};
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::debug;

use vista_engine::Artifact;
use vista_render::to_plain_text;

use crate::config::{AuthMechanism, EmailConfig, Security};
use crate::error::{MailError, MailResult};

const HELO_HOST: &str = "localhost";
const SMTP_TIMEOUT: Duration = Duration::from_secs(60);

/// One email: an HTML body with a plain-text alternative.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Report {
    pub subject: String,
    pub html: String,
    pub text: String,
}

impl Report {
    /// The full document as HTML body, the simplified one as text part.
    pub fn from_artifact(subject: impl Into<String>, artifact: &Artifact) -> Self {
        Self {
            subject: subject.into(),
            html: String::from_utf8_lossy(&artifact.rendered_default).into_owned(),
            text: to_plain_text(artifact.simplified_or_default()),
        }
    }
}

/// Delivers a [`Report`] to a fixed set of recipients.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, report: &Report) -> MailResult<()>;
}

/// `addr@example.org` or `Display Name <addr@example.org>`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Mailbox {
    pub name: Option<String>,
    pub email: String,
}

impl Mailbox {
    fn to_address(&self) -> Address<'_> {
        Address::new_address(self.name.as_deref(), self.email.as_str())
    }
}

impl FromStr for Mailbox {
    type Err = MailError;

    fn from_str(value: &str) -> MailResult<Self> {
        let trimmed = value.trim();
        let (name, email) = match trimmed.rsplit_once('<') {
            Some((name, rest)) => {
                let email = rest.strip_suffix('>').unwrap_or(rest);
                let name = name.trim().trim_matches('"').trim();
                ((!name.is_empty()).then(|| name.to_string()), email.trim())
            }
            None => (None, trimmed),
        };
        let email = EmailAddress::from_str(email).map_err(|source| MailError::Address {
            value: value.to_string(),
            source,
        })?;
        Ok(Self {
            name,
            email: email.to_string(),
        })
    }
}

impl fmt::Display for Mailbox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{name} <{}>", self.email),
            None => f.write_str(&self.email),
        }
    }
}

/// [`Mailer`] speaking SMTP through mail-send. Each send opens its own
/// connection.
pub struct SmtpMailer {
    host: String,
    port: u16,
    security: Security,
    auth: AuthMechanism,
    credentials: Option<Credentials<String>>,
    from: Mailbox,
    recipients: Vec<Mailbox>,
}

impl SmtpMailer {
    /// Resolve addresses and credentials. No connection is made until the
    /// first send.
    pub fn from_config(config: &EmailConfig) -> MailResult<Self> {
        let (host, port) = config.endpoint()?;
        let credentials = match (config.username()?, config.password()?) {
            (Some(username), Some(password)) => Some(Credentials::new(username, password)),
            _ => None,
        };

        let from: Mailbox = config.sender()?.parse()?;
        let recipients = config
            .recipient_list()?
            .iter()
            .map(|r| r.parse())
            .collect::<MailResult<Vec<Mailbox>>>()?;

        debug!(
            %host,
            port,
            security = ?config.security,
            auth = %config.auth,
            recipients = recipients.len(),
            "SMTP transport configured"
        );
        Ok(Self {
            host,
            port,
            security: config.security,
            auth: config.auth,
            credentials,
            from,
            recipients,
        })
    }

    fn client_builder(&self) -> SmtpClientBuilder<String> {
        SmtpClientBuilder::new(self.host.clone(), self.port)
            .implicit_tls(self.security == Security::Tls)
            .say_ehlo(false)
            .timeout(SMTP_TIMEOUT)
    }

    /// EHLO, authenticate with the configured mechanism only, then hand
    /// over the message.
    async fn deliver<S>(&self, mut client: SmtpClient<S>, report: &Report) -> MailResult<()>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let mut capabilities = client.capabilities(HELO_HOST, false).await?;
        if let Some(credentials) = &self.credentials {
            capabilities.auth_mechanisms &= self.auth.mask();
            if capabilities.auth_mechanisms == 0 {
                return Err(MailError::UnsupportedAuth(self.auth));
            }
            client.authenticate(credentials, &capabilities).await?;
        }
        client
            .send(compose(&self.from, &self.recipients, report))
            .await?;
        client.quit().await?;
        Ok(())
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, report: &Report) -> MailResult<()> {
        let builder = self.client_builder();
        match self.security {
            Security::None => self.deliver(builder.connect_plain().await?, report).await,
            Security::Starttls | Security::Tls => {
                self.deliver(builder.connect().await?, report).await
            }
        }
    }
}

impl fmt::Debug for SmtpMailer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpMailer")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("from", &self.from.to_string())
            .field("recipients", &self.recipients.len())
            .finish()
    }
}

/// Assemble a `multipart/alternative` message.
pub fn compose<'a>(
    from: &'a Mailbox,
    recipients: &'a [Mailbox],
    report: &'a Report,
) -> MessageBuilder<'a> {
    let to = recipients.iter().map(Mailbox::to_address).collect();
    MessageBuilder::new()
        .from(from.to_address())
        .to(Address::new_list(to))
        .subject(report.subject.as_str())
        .text_body(report.text.as_str())
        .html_body(report.html.as_str())
}

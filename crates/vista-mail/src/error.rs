use std::path::PathBuf;

use thiserror::Error;

use crate::config::AuthMechanism;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("invalid email configuration: {0}")]
    Config(String),

    #[error("cannot read {path}: {source}")]
    SecretFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid address {value:?}: {source}")]
    Address {
        value: String,
        source: email_address::Error,
    },

    #[error("SMTP delivery failed: {0}")]
    Smtp(#[from] mail_send::Error),

    #[error("server does not offer {0} authentication")]
    UnsupportedAuth(AuthMechanism),

    /// Nothing has been rendered yet.
    #[error("no snapshot available")]
    NoSnapshot,
}

pub type MailResult<T> = Result<T, MailError>;

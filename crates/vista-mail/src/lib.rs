//! Scheduled email delivery for Vista.
//!
//! The [`Dispatcher`] reads the live snapshot and hands it to a [`Mailer`]
//! as an HTML message with a plain-text alternative. [`SmtpMailer`] is the
//! mail-send backed implementation; [`DailySchedule`] decides when the daily
//! dispatch fires in the configured timezone.
//!
//! Delivery is best effort: a failed send is logged and not retried until
//! the next scheduled occurrence.

pub mod config;
pub mod dispatch;
pub mod error;
pub mod mailer;
pub mod schedule;

pub use config::{AuthMechanism, EmailConfig, Security};
pub use dispatch::Dispatcher;
pub use error::{MailError, MailResult};
pub use mailer::{compose, Mailbox, Mailer, Report, SmtpMailer};
pub use schedule::DailySchedule;

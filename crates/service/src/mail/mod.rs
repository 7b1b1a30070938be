//! Outgoing email.
//!
//! Workflows hand an [`OutgoingMail`] to [`MailDispatcher::dispatch`], which delivers it on a
//! detached task. Delivery errors end in the log and never reach the request that caused them.

pub mod smtp;
pub mod templates;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{error, info};

pub use smtp::SmtpMailer;

/// Error type for email delivery failures.
#[derive(Debug, Error)]
pub enum MailError {
    /// SMTP transport-level failure (authentication, connection, etc.).
    #[error("SMTP transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),

    /// The recipient or sender address could not be parsed.
    #[error("Email address parse error: {0}")]
    Address(#[from] lettre::address::AddressError),

    /// The MIME message could not be assembled.
    #[error("Email build error: {0}")]
    Build(String),
}

/// A rendered HTML email.
#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingMail {
    pub to: String,
    pub subject: String,
    pub html: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, mail: OutgoingMail) -> Result<(), MailError>;
}

/// Used when SMTP is not configured: records the send in the log only.
#[derive(Debug, Default, Clone)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, mail: OutgoingMail) -> Result<(), MailError> {
        info!(to = %mail.to, subject = %mail.subject, "smtp not configured; email not sent");
        Ok(())
    }
}

/// Fire-and-forget front for a [`Mailer`].
#[derive(Clone)]
pub struct MailDispatcher {
    mailer: Arc<dyn Mailer>,
}

impl MailDispatcher {
    pub fn new(mailer: Arc<dyn Mailer>) -> Self { Self { mailer } }

    /// Deliver on a detached task. The handle may be dropped.
    pub fn dispatch(&self, mail: OutgoingMail) -> JoinHandle<()> {
        let mailer = Arc::clone(&self.mailer);
        tokio::spawn(async move {
            let to = mail.to.clone();
            let subject = mail.subject.clone();
            match mailer.send(mail).await {
                Ok(()) => info!(%to, %subject, "email sent"),
                Err(e) => error!(%to, %subject, error = %e, "email delivery failed"),
            }
        })
    }
}

/// Test mailers.
pub mod mock {
    use super::*;
    use std::sync::Mutex;
    use tokio::sync::Notify;

    /// Keeps every mail it is asked to send.
    #[derive(Default)]
    pub struct RecordingMailer {
        sent: Mutex<Vec<OutgoingMail>>,
        notify: Notify,
    }

    impl RecordingMailer {
        pub fn new() -> Self { Self::default() }

        pub fn sent(&self) -> Vec<OutgoingMail> {
            self.sent.lock().unwrap().clone()
        }

        /// Wait until at least `n` mails were sent and return them.
        pub async fn wait_for(&self, n: usize) -> Vec<OutgoingMail> {
            loop {
                {
                    let sent = self.sent.lock().unwrap();
                    if sent.len() >= n {
                        return sent.clone();
                    }
                }
                self.notify.notified().await;
            }
        }
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send(&self, mail: OutgoingMail) -> Result<(), MailError> {
            self.sent.lock().unwrap().push(mail);
            self.notify.notify_one();
            Ok(())
        }
    }

    /// Always fails, like an unreachable SMTP relay.
    #[derive(Default)]
    pub struct FailingMailer;

    #[async_trait]
    impl Mailer for FailingMailer {
        async fn send(&self, _mail: OutgoingMail) -> Result<(), MailError> {
            Err(MailError::Build("relay unreachable".into()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mock::{FailingMailer, RecordingMailer};
    use super::*;

    fn mail() -> OutgoingMail {
        OutgoingMail { to: "alice@x.com".into(), subject: "hi".into(), html: "<p>hi</p>".into() }
    }

    #[tokio::test]
    async fn dispatch_delivers_in_background() {
        let rec = Arc::new(RecordingMailer::new());
        let d = MailDispatcher::new(rec.clone());
        d.dispatch(mail()).await.unwrap();
        assert_eq!(rec.sent(), vec![mail()]);
    }

    #[tokio::test]
    async fn delivery_failure_does_not_panic_the_task() {
        let d = MailDispatcher::new(Arc::new(FailingMailer));
        assert!(d.dispatch(mail()).await.is_ok());
    }

    #[test]
    fn email_error_display_build() {
        let err = MailError::Build("missing body".to_string());
        assert_eq!(err.to_string(), "Email build error: missing body");
    }
}

use async_trait::async_trait;
use configs::SmtpConfig;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use super::{MailError, Mailer, OutgoingMail};

/// STARTTLS relay. The transport is built once and shared by every send.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(cfg: &SmtpConfig) -> Result<Self, MailError> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&cfg.host)?.port(cfg.port);
        if let (Some(user), Some(pass)) = (&cfg.username, &cfg.password) {
            builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }
        Ok(Self { transport: builder.build(), from: cfg.from_address.parse()? })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, mail: OutgoingMail) -> Result<(), MailError> {
        let message = Message::builder()
            .from(self.from.clone())
            .to(mail.to.parse()?)
            .subject(mail.subject)
            .header(ContentType::TEXT_HTML)
            .body(mail.html)
            .map_err(|e| MailError::Build(e.to_string()))?;
        self.transport.send(message).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(from: &str) -> SmtpConfig {
        SmtpConfig {
            host: "smtp.example.com".into(),
            port: 587,
            username: Some("u".into()),
            password: Some("p".into()),
            from_address: from.into(),
        }
    }

    #[tokio::test]
    async fn bad_from_address_is_rejected_up_front() {
        assert!(matches!(SmtpMailer::new(&cfg("not-an-email")), Err(MailError::Address(_))));
    }

    #[tokio::test]
    async fn builds_with_valid_config() {
        assert!(SmtpMailer::new(&cfg("Marketplace <noreply@example.com>")).is_ok());
    }
}

use std::time::Duration;

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Mailbox, Message};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Tokio1Executor};
use secrecy::ExposeSecret;

use crate::address::EmailAddress;
use crate::config::SmtpConfig;
use crate::error::MailError;
use crate::sender::Mailer;
use crate::transport::{MailMessage, MailTransport};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Authenticated SMTP relay. STARTTLS is required when `enable_ssl` is set,
/// otherwise the session stays in plain text.
pub struct SmtpTransport {
    inner: AsyncSmtpTransport<Tokio1Executor>,
    relay: String,
}

impl SmtpTransport {
    /// Builds the relay client. No connection is opened until the first
    /// delivery.
    ///
    /// # Errors
    /// [`MailError::Transport`] if the TLS parameters for `server` cannot be
    /// built.
    pub fn from_config(config: &SmtpConfig) -> Result<Self, MailError> {
        let builder = if config.enable_ssl {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.server)
                .map_err(|e| MailError::transport(e.to_string()))?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(config.server.as_str())
        };
        let credentials = Credentials::new(
            config.user.clone(),
            config.password.expose_secret().to_owned(),
        );
        let inner = builder
            .port(config.port)
            .credentials(credentials)
            .timeout(Some(CONNECT_TIMEOUT))
            .build();
        Ok(Self {
            inner,
            relay: config.relay(),
        })
    }

    #[must_use]
    pub fn relay(&self) -> &str {
        &self.relay
    }
}

fn mailbox(address: &EmailAddress) -> Result<Mailbox, MailError> {
    address
        .as_str()
        .parse()
        .map_err(|_| MailError::invalid(address.as_str(), "rejected by the SMTP encoder"))
}

/// Renders an HTML message for the wire.
///
/// # Errors
/// [`MailError::InvalidAddress`] if an address does not survive RFC 5322
/// encoding, [`MailError::Transport`] if the message cannot be assembled.
pub fn encode(message: &MailMessage) -> Result<Message, MailError> {
    let mut builder = Message::builder()
        .from(mailbox(&message.from)?)
        .to(mailbox(&message.to)?)
        .subject(message.subject.as_str())
        .header(ContentType::TEXT_HTML);
    for cc in &message.cc {
        builder = builder.cc(mailbox(cc)?);
    }
    for bcc in &message.bcc {
        builder = builder.bcc(mailbox(bcc)?);
    }
    builder
        .body(message.body_html.clone())
        .map_err(|e| MailError::transport(e.to_string()))
}

#[async_trait]
impl MailTransport for SmtpTransport {
    #[tracing::instrument(skip_all, fields(relay = %self.relay, to = %message.to))]
    async fn deliver(&self, message: MailMessage) -> Result<(), MailError> {
        let email = encode(&message)?;
        let response = self
            .inner
            .send(email)
            .await
            .map_err(|e| MailError::transport(e.to_string()))?;
        tracing::debug!(code = %response.code(), "message accepted by relay");
        Ok(())
    }
}

impl Mailer<SmtpTransport> {
    /// Mailer delivering through the relay described by `config`.
    ///
    /// # Errors
    /// Malformed sender address or relay parameters.
    pub fn smtp(config: &SmtpConfig) -> Result<Self, MailError> {
        Self::new(config, SmtpTransport::from_config(config)?)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    fn config(server: &str, port: u16, enable_ssl: bool) -> SmtpConfig {
        serde_json::from_value(serde_json::json!({
            "server": server,
            "port": port,
            "user": "mailer",
            "password": "hunter2",
            "sender": "noreply@example.com",
            "enable_ssl": enable_ssl
        }))
        .unwrap()
    }

    fn message() -> MailMessage {
        MailMessage {
            from: EmailAddress::parse("noreply@example.com").unwrap(),
            to: EmailAddress::parse("jane@example.com").unwrap(),
            cc: vec![EmailAddress::parse("a@example.com").unwrap()],
            bcc: vec![EmailAddress::parse("b@example.org").unwrap()],
            subject: "Weekly digest".to_owned(),
            body_html: "<p>Hi</p>".to_owned(),
        }
    }

    #[test]
    fn encoded_message_reaches_every_recipient() {
        let email = encode(&message()).unwrap();

        let mut recipients: Vec<String> =
            email.envelope().to().iter().map(ToString::to_string).collect();
        recipients.sort();
        assert_eq!(
            recipients,
            vec!["a@example.com", "b@example.org", "jane@example.com"]
        );
        assert_eq!(
            email.envelope().from().map(ToString::to_string).as_deref(),
            Some("noreply@example.com")
        );

        let raw = String::from_utf8(email.formatted()).unwrap();
        assert!(raw.contains("Subject: Weekly digest"));
        assert!(raw.contains("text/html"));
        assert!(raw.contains("<p>Hi</p>"));
    }

    #[tokio::test]
    async fn relay_is_built_for_both_tls_modes() {
        let secure = SmtpTransport::from_config(&config("smtp.example.com", 587, true)).unwrap();
        assert_eq!(secure.relay(), "smtp.example.com:587");

        let plain = Mailer::smtp(&config("localhost", 2525, false)).unwrap();
        assert_eq!(plain.transport().relay(), "localhost:2525");
        assert_eq!(plain.from_address().as_str(), "noreply@example.com");
    }

    #[tokio::test]
    async fn unreachable_relay_is_a_transport_error() {
        let transport = SmtpTransport::from_config(&config("127.0.0.1", 1, false)).unwrap();

        let err = transport.deliver(message()).await.unwrap_err();

        assert!(matches!(err, MailError::Transport(_)));
    }
}

use std::sync::Arc;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tracing::Instrument;

use crate::address::{EmailAddress, split_list};
use crate::config::SmtpConfig;
use crate::error::MailError;
use crate::transport::{MailMessage, MailTransport};

#[async_trait]
pub trait EmailSender: Send + Sync {
    /// Sends an HTML message. Malformed CC/BCC entries are skipped.
    ///
    /// # Errors
    /// Invalid recipient address or transport failure.
    async fn send_email(
        &self,
        recipient: &str,
        subject: &str,
        body_html: &str,
        cc: &[String],
        bcc: &[String],
    ) -> Result<(), MailError>;

    /// [`send_email`](Self::send_email) with comma separated CC/BCC lists.
    ///
    /// # Errors
    /// Invalid recipient address or transport failure.
    async fn send_email_list(
        &self,
        recipient: &str,
        subject: &str,
        body_html: &str,
        cc_list: &str,
        bcc_list: &str,
    ) -> Result<(), MailError> {
        self.send_email(
            recipient,
            subject,
            body_html,
            &split_list(cc_list),
            &split_list(bcc_list),
        )
        .await
    }
}

/// [`EmailSender`] over a [`MailTransport`].
pub struct Mailer<T: MailTransport> {
    transport: Arc<T>,
    from: EmailAddress,
}

impl<T: MailTransport> Clone for Mailer<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            from: self.from.clone(),
        }
    }
}

impl<T: MailTransport> Mailer<T> {
    /// # Errors
    /// [`MailError::InvalidAddress`] if the configured sender is malformed.
    pub fn new(config: &SmtpConfig, transport: T) -> Result<Self, MailError> {
        let from = EmailAddress::parse(&config.sender)?;
        tracing::debug!(relay = %config.relay(), ssl = config.enable_ssl, from = %from, "mailer ready");
        Ok(Self {
            transport: Arc::new(transport),
            from,
        })
    }

    #[must_use]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    #[must_use]
    pub fn from_address(&self) -> &EmailAddress {
        &self.from
    }

    /// Builds the message, dropping malformed CC/BCC entries.
    ///
    /// # Errors
    /// [`MailError::InvalidAddress`] if `recipient` is malformed.
    pub fn compose(
        &self,
        recipient: &str,
        subject: &str,
        body_html: &str,
        cc: &[String],
        bcc: &[String],
    ) -> Result<MailMessage, MailError> {
        Ok(MailMessage {
            from: self.from.clone(),
            to: EmailAddress::parse(recipient)?,
            cc: valid_addresses(cc, "cc"),
            bcc: valid_addresses(bcc, "bcc"),
            subject: subject.to_owned(),
            body_html: body_html.to_owned(),
        })
    }

    /// Fire-and-forget delivery on the tokio runtime. Delivery failures are
    /// logged, never retried.
    ///
    /// # Errors
    /// [`MailError::InvalidAddress`] if `recipient` is malformed; nothing is
    /// spawned in that case.
    pub fn send_detached(
        &self,
        recipient: &str,
        subject: &str,
        body_html: &str,
        cc: &[String],
        bcc: &[String],
    ) -> Result<JoinHandle<()>, MailError> {
        let message = self.compose(recipient, subject, body_html, cc, bcc)?;
        let transport = Arc::clone(&self.transport);
        let delivery = async move {
            let to = message.to.clone();
            if let Err(e) = transport.deliver(message).await {
                tracing::warn!(to = %to, error = %e, "unable to deliver email");
            }
        };
        Ok(tokio::spawn(delivery.instrument(tracing::Span::current())))
    }
}

fn valid_addresses(raw: &[String], field: &'static str) -> Vec<EmailAddress> {
    raw.iter()
        .filter_map(|entry| match EmailAddress::parse(entry) {
            Ok(address) => Some(address),
            Err(e) => {
                tracing::warn!(field, error = %e, "skipping recipient");
                None
            }
        })
        .collect()
}

#[async_trait]
impl<T: MailTransport> EmailSender for Mailer<T> {
    #[tracing::instrument(skip_all, fields(to = recipient))]
    async fn send_email(
        &self,
        recipient: &str,
        subject: &str,
        body_html: &str,
        cc: &[String],
        bcc: &[String],
    ) -> Result<(), MailError> {
        let message = self.compose(recipient, subject, body_html, cc, bcc)?;
        self.transport.deliver(message).await
    }
}

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::address::EmailAddress;
use crate::error::MailError;

/// A composed HTML message with validated addresses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailMessage {
    pub from: EmailAddress,
    pub to: EmailAddress,
    pub cc: Vec<EmailAddress>,
    pub bcc: Vec<EmailAddress>,
    pub subject: String,
    pub body_html: String,
}

/// Delivers composed messages. Implementations own the connection to the
/// relay; delivery is attempted once.
#[async_trait]
pub trait MailTransport: Send + Sync + 'static {
    async fn deliver(&self, message: MailMessage) -> Result<(), MailError>;
}

/// Transport that keeps messages in memory instead of sending them.
#[derive(Debug, Default)]
pub struct MemoryTransport {
    outbox: Mutex<Vec<MailMessage>>,
    fail_with: Mutex<Option<String>>,
}

impl MemoryTransport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every following delivery fail with `message`.
    pub fn fail_with(&self, message: impl Into<String>) {
        *self.fail_with.lock() = Some(message.into());
    }

    #[must_use]
    pub fn sent(&self) -> Vec<MailMessage> {
        self.outbox.lock().clone()
    }
}

#[async_trait]
impl MailTransport for MemoryTransport {
    async fn deliver(&self, message: MailMessage) -> Result<(), MailError> {
        if let Some(reason) = self.fail_with.lock().clone() {
            return Err(MailError::transport(reason));
        }
        self.outbox.lock().push(message);
        Ok(())
    }
}

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MailError {
    #[error("invalid email address `{address}`: {reason}")]
    InvalidAddress { address: String, reason: &'static str },

    #[error("mail transport failed: {0}")]
    Transport(String),
}

impl MailError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    pub(crate) fn invalid(address: &str, reason: &'static str) -> Self {
        Self::InvalidAddress {
            address: address.to_owned(),
            reason,
        }
    }
}

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Outgoing HTML email.

pub mod address;
pub mod config;
pub mod error;
pub mod sender;
pub mod smtp;
pub mod transport;

pub use address::EmailAddress;
pub use config::SmtpConfig;
pub use error::MailError;
pub use sender::{EmailSender, Mailer};
pub use smtp::SmtpTransport;
pub use transport::{MailMessage, MailTransport, MemoryTransport};

use secrecy::SecretString;
use serde::Deserialize;

/// SMTP relay settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SmtpConfig {
    /// Host name or IP address of the relay.
    pub server: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub user: String,
    pub password: SecretString,
    /// Address messages are sent from.
    pub sender: String,
    #[serde(default = "default_enable_ssl")]
    pub enable_ssl: bool,
}

fn default_port() -> u16 {
    587
}

fn default_enable_ssl() -> bool {
    true
}

impl SmtpConfig {
    /// `server:port`, for logs.
    #[must_use]
    pub fn relay(&self) -> String {
        format!("{}:{}", self.server, self.port)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use secrecy::ExposeSecret;

    use super::*;

    #[test]
    fn defaults_and_redaction() {
        let config: SmtpConfig = serde_json::from_value(serde_json::json!({
            "server": "smtp.example.com",
            "user": "mailer",
            "password": "hunter2",
            "sender": "noreply@example.com"
        }))
        .unwrap();

        assert_eq!(config.port, 587);
        assert!(config.enable_ssl);
        assert_eq!(config.relay(), "smtp.example.com:587");
        assert_eq!(config.password.expose_secret(), "hunter2");
        assert!(!format!("{config:?}").contains("hunter2"));
    }
}

use std::fmt;

use crate::error::MailError;

/// A syntactically plausible mailbox address (`local@domain.tld`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EmailAddress(String);

impl EmailAddress {
    /// Parses a trimmed address.
    ///
    /// # Errors
    /// [`MailError::InvalidAddress`] describing the first problem found.
    pub fn parse(raw: &str) -> Result<Self, MailError> {
        let address = raw.trim();
        if address.is_empty() {
            return Err(MailError::invalid(raw, "empty"));
        }
        if address.chars().any(char::is_whitespace) {
            return Err(MailError::invalid(raw, "contains whitespace"));
        }
        let Some((local, domain)) = address.split_once('@') else {
            return Err(MailError::invalid(raw, "missing `@`"));
        };
        if local.is_empty() {
            return Err(MailError::invalid(raw, "empty local part"));
        }
        if domain.contains('@') {
            return Err(MailError::invalid(raw, "more than one `@`"));
        }
        let labels: Vec<&str> = domain.split('.').collect();
        if labels.len() < 2 || labels.iter().any(|label| label.is_empty()) {
            return Err(MailError::invalid(raw, "domain is not a dotted name"));
        }
        Ok(Self(address.to_owned()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn domain(&self) -> &str {
        self.0.split_once('@').map_or("", |(_, domain)| domain)
    }
}

impl fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Splits a comma separated recipient list, dropping blank entries.
#[must_use]
pub fn split_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_owned)
        .collect()
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_addresses() {
        let address = EmailAddress::parse("  jane.doe@example.com ").unwrap();
        assert_eq!(address.as_str(), "jane.doe@example.com");
        assert_eq!(address.domain(), "example.com");
    }

    #[test]
    fn rejects_malformed_addresses() {
        for raw in ["", "jane", "@example.com", "jane@", "jane@example", "a@b@c.com", "ja ne@x.com", "jane@x..com"] {
            assert!(
                matches!(EmailAddress::parse(raw), Err(MailError::InvalidAddress { .. })),
                "{raw} should be rejected"
            );
        }
    }

    #[test]
    fn split_list_trims_and_skips_blanks() {
        assert_eq!(
            split_list(" a@x.com, ,b@y.org,"),
            vec!["a@x.com".to_owned(), "b@y.org".to_owned()]
        );
        assert!(split_list("   ").is_empty());
    }
}

use thiserror::Error;

use crate::validation::ENTITY_KEY;

/// Returned by service operations when the permission hook rejects the
/// caller. Storage and validation failures never surface as errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("access denied: {reason}")]
pub struct AccessDenied {
    reason: String,
}

impl AccessDenied {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn reason(&self) -> &str {
        &self.reason
    }
}

/// DTO to entity conversion failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot map input{}: {message}", field_suffix(.field.as_deref()))]
pub struct MappingError {
    field: Option<String>,
    message: String,
}

fn field_suffix(field: Option<&str>) -> String {
    field.map_or_else(String::new, |f| format!(" field `{f}`"))
}

impl MappingError {
    /// Failure that concerns the input as a whole.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            field: None,
            message: message.into(),
        }
    }

    pub fn field(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: Some(field.into()),
            message: message.into(),
        }
    }

    /// Validation key the failure is reported under.
    #[must_use]
    pub fn key(&self) -> &str {
        self.field.as_deref().unwrap_or(ENTITY_KEY)
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

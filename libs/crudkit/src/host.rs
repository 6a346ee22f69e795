//! Glue between a request-handling framework and crudkit services.

use crate::validation::{ENTITY_KEY, ValidationSink};

/// Anything that owns a framework-side validation handle (a controller,
/// a request extension, a form model).
pub trait ValidationHost {
    fn model_state_mut(&mut self) -> &mut ValidationSink;
}

impl ValidationHost for ValidationSink {
    fn model_state_mut(&mut self) -> &mut ValidationSink {
        self
    }
}

/// Per-request validation root.
///
/// Services are built with [`sink`](Self::sink), so they report into the
/// same state the request layer renders.
#[derive(Debug, Clone, Default)]
pub struct ApiValidation {
    sink: ValidationSink,
}

impl ApiValidation {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle to pass to services.
    #[must_use]
    pub fn sink(&self) -> ValidationSink {
        self.sink.clone()
    }

    /// Runs before each action: absorbs errors the host already collected,
    /// then points the host at the request state. Afterwards both sides see
    /// one combined set of errors.
    pub fn sync<H: ValidationHost + ?Sized>(&self, host: &mut H) {
        let state = host.model_state_mut();
        self.sink.merge(state);
        state.rebind(&self.sink);
    }

    /// Records errors that have no field, such as identity or account
    /// failures.
    pub fn add_errors<I, S>(&self, errors: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for error in errors {
            self.sink.add_error(ENTITY_KEY, error);
        }
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.sink.is_valid()
    }
}

/// Lowercases a shared-secret key and splits it into groups of four
/// characters for display.
#[must_use]
pub fn format_key(unformatted: &str) -> String {
    let chars: Vec<char> = unformatted.chars().collect();
    let mut out = String::with_capacity(chars.len() + chars.len().div_euclid(4));
    let mut pos = 0;
    while pos + 4 < chars.len() {
        out.extend(&chars[pos..pos + 4]);
        out.push(' ');
        pos += 4;
    }
    out.extend(&chars[pos..]);
    out.to_lowercase()
}

/// True for application-relative URLs: `/path` or `~/path`, but not
/// protocol-relative `//host` or `/\host`.
#[must_use]
pub fn is_local_url(url: &str) -> bool {
    if let Some(rest) = url.strip_prefix('/') {
        return !rest.starts_with('/') && !rest.starts_with('\\');
    }
    url.starts_with("~/")
}

/// Redirect target after a login-style flow: `url` when it stays inside the
/// application, otherwise `fallback`.
#[must_use]
pub fn local_redirect<'a>(url: Option<&'a str>, fallback: &'a str) -> &'a str {
    match url {
        Some(url) if is_local_url(url) => url,
        _ => fallback,
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    struct Controller {
        model_state: ValidationSink,
    }

    impl ValidationHost for Controller {
        fn model_state_mut(&mut self) -> &mut ValidationSink {
            &mut self.model_state
        }
    }

    #[test]
    fn sync_merges_then_shares_state() {
        let api = ApiValidation::new();
        let service_sink = api.sink();
        service_sink.add_error("Name", "required");

        let mut controller = Controller {
            model_state: ValidationSink::new(),
        };
        controller.model_state.add_error("Email", "invalid");

        api.sync(&mut controller);

        assert!(controller.model_state.shares_state_with(&service_sink));
        assert_eq!(controller.model_state.errors_for("Name"), vec!["required".to_owned()]);
        assert_eq!(service_sink.errors_for("Email"), vec!["invalid".to_owned()]);

        // Errors added after the sync are visible on both sides.
        service_sink.add_error("Title", "too long");
        assert_eq!(controller.model_state.error_count(), 3);
    }

    #[test]
    fn sync_twice_does_not_duplicate() {
        let api = ApiValidation::new();
        let mut host = ValidationSink::new();
        host.add_error("x", "bad");
        api.sync(&mut host);
        api.sync(&mut host);
        assert_eq!(api.sink().error_count(), 1);
    }

    #[test]
    fn add_errors_uses_entity_key() {
        let api = ApiValidation::new();
        api.add_errors(["Passwords must match.", "User name is taken."]);
        assert!(!api.is_valid());
        assert_eq!(api.sink().errors_for("").len(), 2);
    }

    #[test]
    fn format_key_groups_by_four() {
        assert_eq!(format_key("ABCDEFGH"), "abcd efgh");
        assert_eq!(format_key("ABCDEFGHI"), "abcd efgh i");
        assert_eq!(format_key("ABCD"), "abcd");
        assert_eq!(format_key("AB"), "ab");
        assert_eq!(format_key(""), "");
    }

    #[test]
    fn redirect_stays_local() {
        assert_eq!(local_redirect(Some("/notes/1"), "/"), "/notes/1");
        assert_eq!(local_redirect(Some("~/home"), "/"), "~/home");
        assert_eq!(local_redirect(Some("//evil.example"), "/"), "/");
        assert_eq!(local_redirect(Some("/\\evil.example"), "/"), "/");
        assert_eq!(local_redirect(Some("https://evil.example"), "/"), "/");
        assert_eq!(local_redirect(None, "/home"), "/home");
    }
}

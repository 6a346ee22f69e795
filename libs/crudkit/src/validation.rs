use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use serde::ser::Serializer;

/// Key used for errors that do not belong to a single field.
pub const ENTITY_KEY: &str = "";

/// Ordered snapshot of validation errors, keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    entries: Vec<(String, Vec<String>)>,
}

impl ValidationErrors {
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&[String]> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, messages)| messages.as_slice())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(k, messages)| (k.as_str(), messages.as_slice()))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.iter().all(|(_, messages)| messages.is_empty())
    }

    /// Total number of messages across all keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.iter().map(|(_, messages)| messages.len()).sum()
    }

    fn push(&mut self, key: &str, message: String) {
        if let Some((_, messages)) = self.entries.iter_mut().find(|(k, _)| k == key) {
            messages.push(message);
        } else {
            self.entries.push((key.to_owned(), vec![message]));
        }
    }

    fn absorb(&mut self, other: &ValidationErrors) {
        for (key, messages) in &other.entries {
            for message in messages {
                let present = self
                    .get(key)
                    .is_some_and(|existing| existing.contains(message));
                if !present {
                    self.push(key, message.clone());
                }
            }
        }
    }
}

impl Serialize for ValidationErrors {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.entries.iter().map(|(k, v)| (k, v)))
    }
}

/// Error collector shared by every layer that takes part in one logical
/// operation.
///
/// Clones share state: an error added through any clone is visible through
/// all of them. [`rebind`](Self::rebind) points a handle at another sink's
/// state so two layers end up observing the same errors.
#[derive(Clone, Default)]
pub struct ValidationSink {
    state: Arc<Mutex<ValidationErrors>>,
}

impl ValidationSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_error(&self, key: impl AsRef<str>, message: impl Into<String>) {
        self.state.lock().push(key.as_ref(), message.into());
    }

    /// True iff no key holds a message.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.state.lock().is_empty()
    }

    #[must_use]
    pub fn errors_for(&self, key: &str) -> Vec<String> {
        self.state
            .lock()
            .get(key)
            .map(<[String]>::to_vec)
            .unwrap_or_default()
    }

    #[must_use]
    pub fn error_count(&self) -> usize {
        self.state.lock().len()
    }

    #[must_use]
    pub fn snapshot(&self) -> ValidationErrors {
        self.state.lock().clone()
    }

    pub fn clear(&self) {
        *self.state.lock() = ValidationErrors::default();
    }

    /// Copies `other`'s errors into this sink. Messages already present
    /// under the same key are not duplicated; existing order is kept.
    pub fn merge(&self, other: &ValidationSink) {
        if self.shares_state_with(other) {
            return;
        }
        let incoming = other.snapshot();
        self.state.lock().absorb(&incoming);
    }

    /// Makes this handle observe `target`'s state from now on.
    pub fn rebind(&mut self, target: &ValidationSink) {
        self.state = Arc::clone(&target.state);
    }

    #[must_use]
    pub fn shares_state_with(&self, other: &ValidationSink) -> bool {
        Arc::ptr_eq(&self.state, &other.state)
    }
}

impl fmt::Debug for ValidationSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidationSink")
            .field("state", &*self.state.lock())
            .finish()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn clones_share_errors() {
        let sink = ValidationSink::new();
        let view = sink.clone();
        assert!(view.is_valid());

        sink.add_error("Name", "required");

        assert!(!view.is_valid());
        assert_eq!(view.errors_for("Name"), vec!["required".to_owned()]);
        assert!(view.errors_for("Email").is_empty());
    }

    #[test]
    fn merge_is_a_union_keeping_order() {
        let service = ValidationSink::new();
        service.add_error("Name", "required");
        let request = ValidationSink::new();
        request.add_error("Email", "invalid");
        request.add_error("Name", "required");
        request.add_error("Name", "too long");

        service.merge(&request);

        let snapshot = service.snapshot();
        assert_eq!(snapshot.keys().collect::<Vec<_>>(), vec!["Name", "Email"]);
        assert_eq!(
            snapshot.get("Name"),
            Some(["required".to_owned(), "too long".to_owned()].as_slice())
        );
        assert_eq!(snapshot.len(), 3);
    }

    #[test]
    fn merging_shared_state_is_a_no_op() {
        let sink = ValidationSink::new();
        sink.add_error("", "boom");
        let alias = sink.clone();

        sink.merge(&alias);

        assert_eq!(sink.error_count(), 1);
    }

    #[test]
    fn rebind_switches_observed_state() {
        let request = ValidationSink::new();
        let mut service = ValidationSink::new();
        service.add_error("Title", "required");

        request.merge(&service);
        service.rebind(&request);
        service.add_error("Body", "too short");

        assert!(service.shares_state_with(&request));
        assert_eq!(request.errors_for("Title"), vec!["required".to_owned()]);
        assert_eq!(request.errors_for("Body"), vec!["too short".to_owned()]);
    }

    #[test]
    fn snapshot_serializes_as_ordered_map() {
        let sink = ValidationSink::new();
        sink.add_error("b", "second");
        sink.add_error("a", "first");

        let json = serde_json::to_string(&sink.snapshot()).unwrap();
        assert_eq!(json, r#"{"b":["second"],"a":["first"]}"#);
    }

    #[test]
    fn clear_resets_every_handle() {
        let sink = ValidationSink::new();
        let view = sink.clone();
        sink.add_error("x", "y");
        view.clear();
        assert!(sink.is_valid());
    }
}

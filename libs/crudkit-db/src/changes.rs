use crate::entity::Entity;
use crate::schema::HiddenValues;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
    Unchanged,
    Added,
    Modified,
    Deleted,
}

/// A tracked entity plus the hidden column values staged for it.
#[derive(Debug, Clone)]
pub struct TrackedEntry<E> {
    entity: E,
    state: EntryState,
    hidden: HiddenValues,
}

impl<E> TrackedEntry<E> {
    #[must_use]
    pub fn new(entity: E, state: EntryState) -> Self {
        Self {
            entity,
            state,
            hidden: HiddenValues::new(),
        }
    }

    #[must_use]
    pub fn entity(&self) -> &E {
        &self.entity
    }

    #[must_use]
    pub fn state(&self) -> EntryState {
        self.state
    }

    pub fn set_state(&mut self, state: EntryState) {
        self.state = state;
    }

    #[must_use]
    pub fn hidden(&self) -> &HiddenValues {
        &self.hidden
    }

    pub fn hidden_mut(&mut self) -> &mut HiddenValues {
        &mut self.hidden
    }

    #[must_use]
    pub fn into_parts(self) -> (E, EntryState, HiddenValues) {
        (self.entity, self.state, self.hidden)
    }
}

/// Changes staged in a session since the last accepted commit.
#[derive(Debug)]
pub struct ChangeTracker<E> {
    entries: Vec<TrackedEntry<E>>,
}

impl<E> Default for ChangeTracker<E> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<E: Entity> ChangeTracker<E> {
    /// Stages `entity`. Inserts are always appended; any other state
    /// replaces an earlier non-insert entry for the same key.
    pub fn track(&mut self, entity: E, state: EntryState) {
        if state != EntryState::Added {
            let id = entity.id();
            if let Some(existing) = self
                .entries
                .iter_mut()
                .find(|e| e.state != EntryState::Added && e.entity.id() == id)
            {
                *existing = TrackedEntry::new(entity, state);
                return;
            }
        }
        self.entries.push(TrackedEntry::new(entity, state));
    }

    #[must_use]
    pub fn entries(&self) -> &[TrackedEntry<E>] {
        &self.entries
    }

    pub fn in_state(&self, state: EntryState) -> impl Iterator<Item = &TrackedEntry<E>> {
        self.entries.iter().filter(move |e| e.state == state)
    }

    pub fn in_state_mut(
        &mut self,
        state: EntryState,
    ) -> impl Iterator<Item = &mut TrackedEntry<E>> {
        self.entries.iter_mut().filter(move |e| e.state == state)
    }

    #[must_use]
    pub fn has_changes(&self) -> bool {
        self.entries.iter().any(|e| e.state != EntryState::Unchanged)
    }

    /// Snapshot of everything that has to reach storage.
    #[must_use]
    pub fn pending(&self) -> Vec<TrackedEntry<E>> {
        self.entries
            .iter()
            .filter(|e| e.state != EntryState::Unchanged)
            .cloned()
            .collect()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

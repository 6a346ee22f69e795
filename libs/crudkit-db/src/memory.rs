use std::collections::BTreeSet;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;

use crate::changes::{EntryState, TrackedEntry};
use crate::engine::{StorageEngine, StoredRow};
use crate::entity::{Entity, EntityKey, KeyStrategy};
use crate::error::{ConfigError, StorageError};
use crate::predicate::RowFilter;
use crate::query::Query;
use crate::schema::{EntitySchema, HiddenColumn, SchemaMode};

struct MemoryState<E> {
    rows: Vec<StoredRow<E>>,
    sequence: u64,
}

impl<E: Clone> Clone for MemoryState<E> {
    fn clone(&self) -> Self {
        Self {
            rows: self.rows.clone(),
            sequence: self.sequence,
        }
    }
}

/// Process-local [`StorageEngine`].
///
/// Writes are applied to a copy of the table and swapped in at the end, so a
/// failed or cancelled batch leaves no trace.
pub struct InMemoryEngine<E: Entity> {
    state: RwLock<MemoryState<E>>,
    /// `None`: the table accepts any hidden column.
    columns: RwLock<Option<BTreeSet<HiddenColumn>>>,
    fail_next: Mutex<Option<String>>,
}

impl<E: Entity> Default for InMemoryEngine<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Entity> InMemoryEngine<E> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: RwLock::new(MemoryState {
                rows: Vec::new(),
                sequence: 0,
            }),
            columns: RwLock::new(None),
            fail_next: Mutex::new(None),
        }
    }

    /// Engine over a pre-existing table that only has the given hidden
    /// columns.
    #[must_use]
    pub fn with_columns(columns: impl IntoIterator<Item = HiddenColumn>) -> Self {
        let engine = Self::new();
        *engine.columns.write() = Some(columns.into_iter().collect());
        engine
    }

    /// Makes the next [`apply`](StorageEngine::apply) fail with `message`.
    pub fn fail_next_apply(&self, message: impl Into<String>) {
        *self.fail_next.lock() = Some(message.into());
    }

    #[must_use]
    pub fn row_count(&self) -> usize {
        self.state.read().rows.len()
    }

    fn matching(&self, query: &Query<E>) -> Vec<E> {
        self.state
            .read()
            .rows
            .iter()
            .filter(|row| query.row_filter().matches(&row.hidden) && query.matches_entity(&row.entity))
            .map(|row| row.entity.clone())
            .collect()
    }

    fn next_key(state: &mut MemoryState<E>) -> Result<E::Key, StorageError> {
        match <E::Key as EntityKey>::STRATEGY {
            KeyStrategy::Sequence => {
                state.sequence += 1;
                E::Key::from_sequence(state.sequence)
                    .ok_or(StorageError::KeyExhausted { entity: E::NAME })
            }
            KeyStrategy::Generated => Ok(E::Key::generate()),
        }
    }

    fn position(state: &MemoryState<E>, id: &E::Key, filter: &RowFilter) -> Result<usize, StorageError> {
        state
            .rows
            .iter()
            .position(|row| row.entity.id() == *id && filter.matches(&row.hidden))
            .ok_or_else(|| StorageError::row_not_found(E::NAME, id))
    }
}

#[async_trait]
impl<E: Entity> StorageEngine<E> for InMemoryEngine<E> {
    async fn provision(&self, schema: &EntitySchema, mode: SchemaMode) -> Result<(), ConfigError> {
        let mut columns = self.columns.write();
        let Some(existing) = columns.as_mut() else {
            return Ok(());
        };

        for column in schema.hidden_columns() {
            if existing.contains(column) {
                continue;
            }
            match mode {
                SchemaMode::Verify => {
                    return Err(ConfigError::MissingHiddenColumn {
                        entity: schema.entity(),
                        column: column.name(),
                    });
                }
                SchemaMode::Migrate => {
                    existing.insert(*column);
                }
            }
        }
        Ok(())
    }

    async fn fetch(&self, query: &Query<E>, cancel: &CancellationToken) -> Result<Vec<E>, StorageError> {
        if cancel.is_cancelled() {
            return Err(StorageError::Cancelled);
        }
        Ok(query.paginate(self.matching(query)))
    }

    async fn count(&self, query: &Query<E>, cancel: &CancellationToken) -> Result<u64, StorageError> {
        if cancel.is_cancelled() {
            return Err(StorageError::Cancelled);
        }
        let n = self.matching(query).len();
        u64::try_from(n).map_err(|e| StorageError::engine(e.to_string()))
    }

    async fn apply(
        &self,
        schema: &EntitySchema,
        filter: &RowFilter,
        entries: Vec<TrackedEntry<E>>,
        cancel: &CancellationToken,
    ) -> Result<u64, StorageError> {
        if let Some(message) = self.fail_next.lock().take() {
            return Err(StorageError::Engine(message));
        }

        let mut guard = self.state.write();
        let mut next = guard.clone();
        let mut affected = 0u64;

        for entry in entries {
            let (mut entity, state, hidden) = entry.into_parts();
            match state {
                EntryState::Added => {
                    let key = Self::next_key(&mut next)?;
                    entity.set_id(key);
                    let mut row_hidden = schema.defaults();
                    row_hidden.merge(&hidden);
                    next.rows.push(StoredRow {
                        entity,
                        hidden: row_hidden,
                    });
                }
                EntryState::Modified => {
                    let idx = Self::position(&next, &entity.id(), filter)?;
                    let row = &mut next.rows[idx];
                    row.entity = entity;
                    row.hidden.merge(&hidden);
                }
                EntryState::Deleted => {
                    let idx = Self::position(&next, &entity.id(), filter)?;
                    next.rows.remove(idx);
                }
                EntryState::Unchanged => continue,
            }
            affected += 1;
        }

        if cancel.is_cancelled() {
            return Err(StorageError::Cancelled);
        }
        *guard = next;
        Ok(affected)
    }

    async fn fetch_unfiltered(
        &self,
        _schema: &EntitySchema,
        cancel: &CancellationToken,
    ) -> Result<Vec<StoredRow<E>>, StorageError> {
        if cancel.is_cancelled() {
            return Err(StorageError::Cancelled);
        }
        Ok(self.state.read().rows.clone())
    }
}

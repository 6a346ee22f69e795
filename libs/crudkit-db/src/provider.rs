use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use crudkit_security::SecurityContext;
use tokio_util::sync::CancellationToken;

use crate::changes::ChangeTracker;
use crate::entity::Entity;
use crate::error::{ConfigError, StorageError};
use crate::query::Query;
use crate::schema::EntitySchema;

/// Handle proving that `E` is registered; obtained from
/// [`StorageProvider::entity_set`] and required to build queries.
pub struct EntitySet<E> {
    schema: Arc<EntitySchema>,
    _entity: PhantomData<fn() -> E>,
}

impl<E> EntitySet<E> {
    pub(crate) fn new(schema: Arc<EntitySchema>) -> Self {
        Self {
            schema,
            _entity: PhantomData,
        }
    }

    #[must_use]
    pub fn schema(&self) -> &EntitySchema {
        &self.schema
    }
}

impl<E> Clone for EntitySet<E> {
    fn clone(&self) -> Self {
        Self::new(Arc::clone(&self.schema))
    }
}

impl<E> fmt::Debug for EntitySet<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntitySet")
            .field("entity", &self.schema.entity())
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommitOptions {
    /// Clear the accepted changes from the tracker after a successful commit.
    pub accept_all_changes_on_success: bool,
}

impl Default for CommitOptions {
    fn default() -> Self {
        Self {
            accept_all_changes_on_success: true,
        }
    }
}

/// Storage as seen by a service: row-filtered reads plus a unit of work.
///
/// Every [`Query`] handed out by [`query`](Self::query) already carries the
/// row filter for the provider's caller.
#[async_trait]
pub trait StorageProvider<E: Entity>: Send + Sync {
    /// Caller whose row filter this provider applies.
    fn security_context(&self) -> &SecurityContext;

    /// Binds to the collection of `E`.
    ///
    /// # Errors
    /// [`ConfigError`] when `E` is not registered.
    fn entity_set(&self) -> Result<EntitySet<E>, ConfigError>;

    fn query(&self, set: &EntitySet<E>) -> Query<E>;

    async fn fetch(&self, query: &Query<E>, cancel: &CancellationToken) -> Result<Vec<E>, StorageError>;

    async fn count(&self, query: &Query<E>, cancel: &CancellationToken) -> Result<u64, StorageError>;

    async fn find_by_id(
        &self,
        set: &EntitySet<E>,
        id: &E::Key,
        cancel: &CancellationToken,
    ) -> Result<Option<E>, StorageError> {
        let query = self.query(set).with_id(id.clone()).take(1);
        Ok(self.fetch(&query, cancel).await?.into_iter().next())
    }

    /// Stages an insert.
    fn add(&mut self, entity: E);
    /// Tracks an entity as unchanged.
    fn attach(&mut self, entity: E);
    /// Stages a full update of an existing row.
    fn update(&mut self, entity: E);
    /// Stages a deletion; interceptors may turn it into an update.
    fn remove(&mut self, entity: E);

    fn pending(&self) -> &ChangeTracker<E>;

    fn discard_changes(&mut self);

    /// Commits with default [`CommitOptions`].
    async fn commit(&mut self, cancel: &CancellationToken) -> Result<u64, StorageError> {
        self.commit_with(CommitOptions::default(), cancel).await
    }

    /// Runs save interceptors, then writes all pending changes atomically.
    /// Returns the affected row count.
    async fn commit_with(
        &mut self,
        options: CommitOptions,
        cancel: &CancellationToken,
    ) -> Result<u64, StorageError>;
}

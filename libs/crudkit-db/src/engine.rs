use std::future::Future;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::changes::TrackedEntry;
use crate::entity::Entity;
use crate::error::{ConfigError, StorageError};
use crate::predicate::RowFilter;
use crate::query::Query;
use crate::schema::{EntitySchema, HiddenValues, SchemaMode};

/// A row as stored, including hidden column values. Only returned by the
/// administrative, unfiltered read path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRow<E> {
    pub entity: E,
    pub hidden: HiddenValues,
}

/// Persistence engine behind a [`DbSession`](crate::DbSession).
///
/// Engines never decide visibility on their own: reads get the row filter
/// through the [`Query`], writes get it as an explicit argument.
#[async_trait]
pub trait StorageEngine<E: Entity>: Send + Sync {
    /// Makes sure the hidden columns and indexes of `schema` exist.
    async fn provision(&self, schema: &EntitySchema, mode: SchemaMode) -> Result<(), ConfigError>;

    async fn fetch(&self, query: &Query<E>, cancel: &CancellationToken) -> Result<Vec<E>, StorageError>;

    /// Number of rows `query` matches, ignoring its offset and limit.
    async fn count(&self, query: &Query<E>, cancel: &CancellationToken) -> Result<u64, StorageError>;

    /// Applies `entries` atomically and returns the affected row count.
    ///
    /// Updates and deletes only touch rows matching both the id and
    /// `filter`; a miss fails the whole batch with
    /// [`StorageError::RowNotFound`]. Nothing is applied if `cancel` fires
    /// before the batch is committed.
    async fn apply(
        &self,
        schema: &EntitySchema,
        filter: &RowFilter,
        entries: Vec<TrackedEntry<E>>,
        cancel: &CancellationToken,
    ) -> Result<u64, StorageError>;

    /// Every row, deleted or foreign-tenant ones included.
    async fn fetch_unfiltered(
        &self,
        schema: &EntitySchema,
        cancel: &CancellationToken,
    ) -> Result<Vec<StoredRow<E>>, StorageError>;
}

/// Races `fut` against `cancel`.
pub(crate) async fn cancellable<T, F>(cancel: &CancellationToken, fut: F) -> Result<T, StorageError>
where
    F: Future<Output = Result<T, StorageError>>,
{
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(StorageError::Cancelled),
        res = fut => res,
    }
}

use std::marker::PhantomData;

use crudkit_db::{ConfigError, Entity, EntitySet, Query, StorageProvider};
use tokio_util::sync::CancellationToken;

use crate::error::AccessDenied;
use crate::hooks::{Operation, ServiceHooks};
use crate::pagination::PaginatedList;
use crate::validation::ValidationSink;

/// Log messages for failed writes.
pub(crate) mod messages {
    pub const CREATE_FAILED: &str = "unable to create new instance";
    pub const UPDATE_FAILED: &str = "unable to modify existing instance";
    pub const DELETE_FAILED: &str = "unable to delete instance";
    pub const BIND_FAILED: &str = "unable to set active collection for service";
}

// ============================================================================
// Service Implementation
// ============================================================================

/// Create/read/update/delete over one entity type.
///
/// All reads go through the provider's row-filtered queries, so soft-deleted
/// rows and rows of other tenants are invisible here. Storage and mapping
/// failures never escape: reads degrade to empty results, writes return
/// `false`, and the cause is logged. Validation problems are reported through
/// the [`ValidationSink`]; only [`AccessDenied`] is returned as an error.
pub struct CrudService<E: Entity, D, P: StorageProvider<E>> {
    storage: P,
    active: Option<EntitySet<E>>,
    validation: ValidationSink,
    hooks: ServiceHooks<E, D>,
    cancel: CancellationToken,
    _dto: PhantomData<fn(D)>,
}

impl<E: Entity, D, P: StorageProvider<E>> CrudService<E, D, P> {
    /// Builds the service and binds it to `E`'s collection. A binding failure
    /// is logged; the service then treats reads as empty and writes as
    /// failed until [`set_active_collection`](Self::set_active_collection)
    /// succeeds.
    pub fn new(storage: P, validation: ValidationSink, hooks: ServiceHooks<E, D>) -> Self {
        let mut service = Self {
            storage,
            active: None,
            validation,
            hooks,
            cancel: CancellationToken::new(),
            _dto: PhantomData,
        };
        if let Err(e) = service.bind() {
            tracing::error!(entity = E::NAME, error = %e, "{}", messages::BIND_FAILED);
        }
        service
    }

    /// Storage calls made by this service observe `cancel`.
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    #[must_use]
    pub fn validation(&self) -> &ValidationSink {
        &self.validation
    }

    #[must_use]
    pub fn storage(&self) -> &P {
        &self.storage
    }

    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.active.is_some()
    }

    /// Re-binds to `E`'s collection. Returns whether a collection is bound.
    pub fn set_active_collection(&mut self) -> bool {
        match self.bind() {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(entity = E::NAME, error = %e, "{}", messages::BIND_FAILED);
                false
            }
        }
    }

    fn bind(&mut self) -> Result<(), ConfigError> {
        match self.storage.entity_set() {
            Ok(set) => {
                self.active = Some(set);
                Ok(())
            }
            Err(e) => {
                self.active = None;
                Err(e)
            }
        }
    }

    // ------------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------------

    /// Every visible row, shaped by the query hook.
    ///
    /// # Errors
    /// [`AccessDenied`] if the caller may not list.
    #[tracing::instrument(skip_all, fields(entity = E::NAME))]
    pub async fn list_all(&self) -> Result<Vec<E>, AccessDenied> {
        self.authorize(Operation::List)?;
        let Some(query) = self.read_query() else {
            return Ok(Vec::new());
        };
        match self.storage.fetch(&query, &self.cancel).await {
            Ok(rows) => Ok(rows),
            Err(e) => {
                tracing::warn!(entity = E::NAME, error = %e, "unable to list instances");
                Ok(Vec::new())
            }
        }
    }

    /// [`list_all`](Self::list_all) mapped through `projection`.
    ///
    /// # Errors
    /// [`AccessDenied`] if the caller may not list.
    pub async fn list_all_projected<R, F>(&self, projection: F) -> Result<Vec<R>, AccessDenied>
    where
        F: FnMut(E) -> R,
    {
        Ok(self.list_all().await?.into_iter().map(projection).collect())
    }

    /// One page of the visible rows. `page` and `page_size` are clamped to at
    /// least 1.
    ///
    /// # Errors
    /// [`AccessDenied`] if the caller may not list.
    #[tracing::instrument(skip(self), fields(entity = E::NAME))]
    pub async fn list_page(&self, page: u64, page_size: u64) -> Result<PaginatedList<E>, AccessDenied> {
        self.authorize(Operation::List)?;
        let Some(query) = self.read_query() else {
            return Ok(PaginatedList::empty(page, page_size));
        };
        let row_count = match self.storage.count(&query, &self.cancel).await {
            Ok(count) => count,
            Err(e) => {
                tracing::warn!(entity = E::NAME, error = %e, "unable to count instances");
                return Ok(PaginatedList::empty(page, page_size));
            }
        };
        let paged = query
            .skip(PaginatedList::<E>::offset_of(page, page_size))
            .take(page_size.max(1));
        match self.storage.fetch(&paged, &self.cancel).await {
            Ok(items) => Ok(PaginatedList::new(items, row_count, page, page_size)),
            Err(e) => {
                tracing::warn!(entity = E::NAME, error = %e, "unable to list instances");
                Ok(PaginatedList::empty(page, page_size))
            }
        }
    }

    /// The visible row with key `id`, if any.
    ///
    /// # Errors
    /// [`AccessDenied`] if the caller may not read.
    #[tracing::instrument(skip_all, fields(entity = E::NAME))]
    pub async fn read(&self, id: &E::Key) -> Result<Option<E>, AccessDenied> {
        self.authorize(Operation::Read)?;
        Ok(self.find(id).await)
    }

    /// [`read`](Self::read) mapped through `projection`.
    ///
    /// # Errors
    /// [`AccessDenied`] if the caller may not read.
    pub async fn read_projected<R, F>(&self, id: &E::Key, projection: F) -> Result<Option<R>, AccessDenied>
    where
        F: FnOnce(E) -> R,
    {
        Ok(self.read(id).await?.map(projection))
    }

    // ------------------------------------------------------------------------
    // Writes
    // ------------------------------------------------------------------------

    /// Inserts a new row from `dto`. Any key carried by the DTO is discarded;
    /// storage assigns a fresh one.
    ///
    /// Returns `false` without touching storage when mapping or validation
    /// fails, and `false` after discarding pending changes when the commit
    /// fails.
    ///
    /// # Errors
    /// [`AccessDenied`] if the caller may not create.
    #[tracing::instrument(skip_all, fields(entity = E::NAME))]
    pub async fn create(&mut self, dto: D) -> Result<bool, AccessDenied> {
        self.authorize(Operation::Create)?;
        let Some(entity) = self.prepare(dto, Operation::Create) else {
            return Ok(false);
        };
        if !self.ensure_bound() {
            return Ok(false);
        }
        self.storage.add(entity);
        Ok(self.persist(messages::CREATE_FAILED).await)
    }

    /// Replaces the row whose key the mapped `dto` carries.
    ///
    /// # Errors
    /// [`AccessDenied`] if the caller may not update.
    #[tracing::instrument(skip_all, fields(entity = E::NAME))]
    pub async fn update(&mut self, dto: D) -> Result<bool, AccessDenied> {
        self.authorize(Operation::Update)?;
        let Some(entity) = self.prepare(dto, Operation::Update) else {
            return Ok(false);
        };
        if !self.ensure_bound() {
            return Ok(false);
        }
        self.storage.update(entity);
        Ok(self.persist(messages::UPDATE_FAILED).await)
    }

    /// Deletes the visible row with key `id`. Soft-deletable rows are only
    /// flagged. Returns `false` when no such row is visible.
    ///
    /// # Errors
    /// [`AccessDenied`] if the caller may not delete.
    #[tracing::instrument(skip_all, fields(entity = E::NAME))]
    pub async fn delete(&mut self, id: &E::Key) -> Result<bool, AccessDenied> {
        self.authorize(Operation::Delete)?;
        let Some(entity) = self.find(id).await else {
            return Ok(false);
        };
        self.storage.remove(entity);
        Ok(self.persist(messages::DELETE_FAILED).await)
    }

    // ------------------------------------------------------------------------
    // Pipeline
    // ------------------------------------------------------------------------

    fn authorize(&self, operation: Operation) -> Result<(), AccessDenied> {
        self.hooks
            .authorize(self.storage.security_context(), operation)
            .inspect_err(|e| {
                tracing::debug!(entity = E::NAME, %operation, reason = e.reason(), "operation denied");
            })
    }

    fn ensure_bound(&self) -> bool {
        if self.active.is_none() {
            tracing::error!(entity = E::NAME, "service has no active collection");
            return false;
        }
        true
    }

    fn read_query(&self) -> Option<Query<E>> {
        if !self.ensure_bound() {
            return None;
        }
        self.active
            .as_ref()
            .map(|set| self.hooks.shape_query(self.storage.query(set)))
    }

    async fn find(&self, id: &E::Key) -> Option<E> {
        let query = self.read_query()?.with_id(id.clone()).take(1);
        match self.storage.fetch(&query, &self.cancel).await {
            Ok(rows) => rows.into_iter().next(),
            Err(e) => {
                tracing::warn!(entity = E::NAME, error = %e, "unable to read instance");
                None
            }
        }
    }

    /// Map, normalize and validate. `None` means the input was rejected and
    /// the reason is in the validation sink.
    fn prepare(&self, dto: D, operation: Operation) -> Option<E> {
        let mut entity = match self.hooks.parse(dto) {
            Ok(entity) => entity,
            Err(e) => {
                self.validation.add_error(e.key(), e.message());
                tracing::warn!(entity = E::NAME, error = %e, %operation, "unable to map input");
                return None;
            }
        };
        if operation == Operation::Create {
            entity.reset_id();
        }
        let entity = self.hooks.normalize(entity);
        self.hooks.run_validation(&entity, &self.validation);
        self.validation.is_valid().then_some(entity)
    }

    async fn persist(&mut self, failure: &'static str) -> bool {
        match self.storage.commit(&self.cancel).await {
            Ok(_) => true,
            Err(e) => {
                self.storage.discard_changes();
                tracing::warn!(entity = E::NAME, error = %e, "{failure}");
                false
            }
        }
    }
}

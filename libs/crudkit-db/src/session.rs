use std::sync::Arc;

use async_trait::async_trait;
use crudkit_security::SecurityContext;
use tokio_util::sync::CancellationToken;

use crate::changes::{ChangeTracker, EntryState};
use crate::engine::{StorageEngine, StoredRow};
use crate::entity::Entity;
use crate::error::{ConfigError, StorageError};
use crate::interceptor::{SaveInterceptor, SoftDeleteInterceptor, TenantStampInterceptor};
use crate::policy::RowFilterPolicy;
use crate::provider::{CommitOptions, EntitySet, StorageProvider};
use crate::query::Query;

/// Unit of work for one caller over one entity type.
///
/// Sessions are cheap: create one per request from the shared engine and
/// policy.
pub struct DbSession<E: Entity> {
    engine: Arc<dyn StorageEngine<E>>,
    policy: Arc<RowFilterPolicy>,
    ctx: SecurityContext,
    tracker: ChangeTracker<E>,
    interceptors: Vec<Arc<dyn SaveInterceptor<E>>>,
}

impl<E: Entity> DbSession<E> {
    /// Session with the standard interceptors: tenant stamping, then soft
    /// delete.
    #[must_use]
    pub fn new(
        engine: Arc<dyn StorageEngine<E>>,
        policy: Arc<RowFilterPolicy>,
        ctx: SecurityContext,
    ) -> Self {
        Self {
            engine,
            policy,
            ctx,
            tracker: ChangeTracker::default(),
            interceptors: vec![
                Arc::new(TenantStampInterceptor),
                Arc::new(SoftDeleteInterceptor),
            ],
        }
    }

    #[must_use]
    pub fn with_interceptor(mut self, interceptor: Arc<dyn SaveInterceptor<E>>) -> Self {
        self.interceptors.push(interceptor);
        self
    }

    /// Administrative read that bypasses the row filter and exposes hidden
    /// column values.
    ///
    /// # Errors
    /// Fails if `E` is not registered or the engine fails.
    pub async fn fetch_unfiltered(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Vec<StoredRow<E>>, StorageError> {
        let schema = self.policy.schema::<E>()?;
        self.engine.fetch_unfiltered(&schema, cancel).await
    }

    /// The single save path behind every commit entry point.
    async fn save_changes(
        &mut self,
        options: CommitOptions,
        cancel: &CancellationToken,
    ) -> Result<u64, StorageError> {
        let schema = self.policy.schema::<E>()?;

        for interceptor in &self.interceptors {
            interceptor.before_save(&schema, &self.ctx, &mut self.tracker)?;
        }
        if !self.tracker.has_changes() {
            return Ok(0);
        }
        if cancel.is_cancelled() {
            return Err(StorageError::Cancelled);
        }

        let filter = schema.row_filter(&self.ctx);
        let affected = self
            .engine
            .apply(&schema, &filter, self.tracker.pending(), cancel)
            .await?;

        if options.accept_all_changes_on_success {
            self.tracker.clear();
        }
        tracing::debug!(entity = E::NAME, affected, "changes committed");
        Ok(affected)
    }
}

#[async_trait]
impl<E: Entity> StorageProvider<E> for DbSession<E> {
    fn security_context(&self) -> &SecurityContext {
        &self.ctx
    }

    fn entity_set(&self) -> Result<EntitySet<E>, ConfigError> {
        Ok(EntitySet::new(self.policy.schema::<E>()?))
    }

    fn query(&self, set: &EntitySet<E>) -> Query<E> {
        Query::new(set.schema().row_filter(&self.ctx))
    }

    async fn fetch(&self, query: &Query<E>, cancel: &CancellationToken) -> Result<Vec<E>, StorageError> {
        self.engine.fetch(query, cancel).await
    }

    async fn count(&self, query: &Query<E>, cancel: &CancellationToken) -> Result<u64, StorageError> {
        self.engine.count(query, cancel).await
    }

    fn add(&mut self, entity: E) {
        self.tracker.track(entity, EntryState::Added);
    }

    fn attach(&mut self, entity: E) {
        self.tracker.track(entity, EntryState::Unchanged);
    }

    fn update(&mut self, entity: E) {
        self.tracker.track(entity, EntryState::Modified);
    }

    fn remove(&mut self, entity: E) {
        self.tracker.track(entity, EntryState::Deleted);
    }

    fn pending(&self) -> &ChangeTracker<E> {
        &self.tracker
    }

    fn discard_changes(&mut self) {
        self.tracker.clear();
    }

    #[tracing::instrument(skip_all, fields(entity = E::NAME))]
    async fn commit_with(
        &mut self,
        options: CommitOptions,
        cancel: &CancellationToken,
    ) -> Result<u64, StorageError> {
        self.save_changes(options, cancel).await
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::memory::InMemoryEngine;
    use crate::schema::EntitySchema;
    use crate::test_support::{Memo, Plain, Tag, ctx_for_tenant, memo, tag};

    struct Counting(Arc<AtomicUsize>);

    impl<E: Entity> SaveInterceptor<E> for Counting {
        fn before_save(
            &self,
            _schema: &EntitySchema,
            _ctx: &SecurityContext,
            _tracker: &mut ChangeTracker<E>,
        ) -> Result<(), StorageError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    async fn setup<E: Entity>() -> (Arc<InMemoryEngine<E>>, Arc<RowFilterPolicy>) {
        let engine = Arc::new(InMemoryEngine::<E>::new());
        let mut builder = RowFilterPolicy::builder();
        builder.register::<E>(engine.as_ref()).await.unwrap();
        (engine, Arc::new(builder.build()))
    }

    fn session<E: Entity>(
        engine: &Arc<InMemoryEngine<E>>,
        policy: &Arc<RowFilterPolicy>,
        ctx: SecurityContext,
    ) -> DbSession<E> {
        DbSession::new(engine.clone(), policy.clone(), ctx)
    }

    #[tokio::test]
    async fn interceptors_run_once_per_commit_variant() {
        let (engine, policy) = setup::<Tag>().await;
        let calls = Arc::new(AtomicUsize::new(0));
        let mut s = session(&engine, &policy, ctx_for_tenant(1))
            .with_interceptor(Arc::new(Counting(calls.clone())));
        let cancel = CancellationToken::new();

        s.add(tag(0, "a"));
        s.commit(&cancel).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        s.add(tag(0, "b"));
        s.commit_with(
            CommitOptions {
                accept_all_changes_on_success: false,
            },
            &cancel,
        )
        .await
        .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(s.pending().len(), 1);

        s.discard_changes();
        s.commit(&cancel).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(engine.row_count(), 2);
    }

    #[tokio::test]
    async fn removing_soft_deletable_keeps_row_hidden() {
        let (engine, policy) = setup::<Tag>().await;
        let cancel = CancellationToken::new();
        let mut s = session(&engine, &policy, ctx_for_tenant(1));
        s.add(tag(0, "a"));
        s.commit(&cancel).await.unwrap();

        let set = s.entity_set().unwrap();
        let found = s.find_by_id(&set, &1, &cancel).await.unwrap().unwrap();
        s.remove(found);
        assert_eq!(s.commit(&cancel).await.unwrap(), 1);

        assert!(s.find_by_id(&set, &1, &cancel).await.unwrap().is_none());
        let rows = s.fetch_unfiltered(&cancel).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert!(rows[0].hidden.is_deleted());
    }

    #[tokio::test]
    async fn removing_plain_entity_deletes_row() {
        let (engine, policy) = setup::<Plain>().await;
        let cancel = CancellationToken::new();
        let mut s = session(&engine, &policy, ctx_for_tenant(1));
        s.add(Plain {
            id: 0,
            label: "x".to_owned(),
        });
        s.commit(&cancel).await.unwrap();

        let set = s.entity_set().unwrap();
        let found = s.find_by_id(&set, &1, &cancel).await.unwrap().unwrap();
        s.remove(found);
        s.commit(&cancel).await.unwrap();

        assert_eq!(engine.row_count(), 0);
    }

    #[tokio::test]
    async fn tenants_only_see_their_rows() {
        let (engine, policy) = setup::<Memo>().await;
        let cancel = CancellationToken::new();

        let mut first = session(&engine, &policy, ctx_for_tenant(1));
        first.add(memo(0, "one"));
        first.commit(&cancel).await.unwrap();

        let mut second = session(&engine, &policy, ctx_for_tenant(2));
        second.add(memo(0, "two"));
        second.commit(&cancel).await.unwrap();

        let set = first.entity_set().unwrap();
        let visible = first.fetch(&first.query(&set), &cancel).await.unwrap();
        assert_eq!(visible, vec![memo(1, "one")]);

        // A foreign tenant's row cannot be updated either.
        second.update(memo(1, "hijacked"));
        let err = second.commit(&cancel).await.unwrap_err();
        assert!(matches!(err, StorageError::RowNotFound { .. }));
    }

    #[tokio::test]
    async fn unregistered_entity_cannot_bind() {
        let (engine, _) = setup::<Tag>().await;
        let empty = Arc::new(RowFilterPolicy::builder().build());
        let s = session(&engine, &empty, ctx_for_tenant(1));
        assert!(matches!(
            s.entity_set(),
            Err(ConfigError::Unregistered { entity: "tag" })
        ));
    }

    #[tokio::test]
    async fn cancelled_commit_writes_nothing() {
        let (engine, policy) = setup::<Tag>().await;
        let mut s = session(&engine, &policy, ctx_for_tenant(1));
        let cancel = CancellationToken::new();
        cancel.cancel();

        s.add(tag(0, "a"));
        let err = s.commit(&cancel).await.unwrap_err();
        assert!(matches!(err, StorageError::Cancelled));
        assert_eq!(engine.row_count(), 0);
    }
}

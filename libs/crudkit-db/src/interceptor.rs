use crudkit_security::SecurityContext;

use crate::capability::Capability;
use crate::changes::{ChangeTracker, EntryState};
use crate::entity::Entity;
use crate::error::StorageError;
use crate::schema::{EntitySchema, HiddenColumn, HiddenValue};

/// Hook run by [`DbSession`](crate::DbSession) right before pending changes
/// are handed to the engine, exactly once per commit call.
pub trait SaveInterceptor<E: Entity>: Send + Sync {
    /// Rewrites the pending changes in place.
    ///
    /// # Errors
    /// An error aborts the commit before anything reaches storage.
    fn before_save(
        &self,
        schema: &EntitySchema,
        ctx: &SecurityContext,
        tracker: &mut ChangeTracker<E>,
    ) -> Result<(), StorageError>;
}

/// Turns deletions of soft-deletable entities into updates that set
/// `IsDeleted = true`. Other deletions stay physical.
#[derive(Debug, Clone, Copy, Default)]
pub struct SoftDeleteInterceptor;

impl<E: Entity> SaveInterceptor<E> for SoftDeleteInterceptor {
    fn before_save(
        &self,
        schema: &EntitySchema,
        _ctx: &SecurityContext,
        tracker: &mut ChangeTracker<E>,
    ) -> Result<(), StorageError> {
        if !schema.capabilities().contains(Capability::SoftDeletable) {
            return Ok(());
        }

        for entry in tracker.in_state_mut(EntryState::Deleted) {
            entry
                .hidden_mut()
                .set(HiddenColumn::IsDeleted, HiddenValue::Bool(true));
            entry.set_state(EntryState::Modified);
            tracing::debug!(
                entity = schema.entity(),
                id = ?entry.entity().id(),
                "deletion rewritten to soft delete"
            );
        }
        Ok(())
    }
}

/// Stamps the caller's tenant onto inserts of tenant-scoped entities, so a
/// created row is visible through the same tenant filter that reads use.
#[derive(Debug, Clone, Copy, Default)]
pub struct TenantStampInterceptor;

impl<E: Entity> SaveInterceptor<E> for TenantStampInterceptor {
    fn before_save(
        &self,
        schema: &EntitySchema,
        ctx: &SecurityContext,
        tracker: &mut ChangeTracker<E>,
    ) -> Result<(), StorageError> {
        if !schema.capabilities().contains(Capability::TenantScoped) {
            return Ok(());
        }
        if tracker.in_state(EntryState::Added).next().is_none() {
            return Ok(());
        }

        let tenant = ctx.tenant_id().ok_or(StorageError::MissingTenant {
            entity: schema.entity(),
        })?;
        for entry in tracker.in_state_mut(EntryState::Added) {
            entry
                .hidden_mut()
                .set(HiddenColumn::CommunityId, HiddenValue::Int(tenant.get()));
        }
        Ok(())
    }
}

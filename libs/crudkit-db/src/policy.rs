use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;

use crudkit_security::SecurityContext;

use crate::engine::StorageEngine;
use crate::entity::Entity;
use crate::error::ConfigError;
use crate::predicate::RowFilter;
use crate::schema::{EntitySchema, SchemaMode};

/// Startup registry of entity schemas.
///
/// Registration is async because it provisions (or verifies) the hidden
/// columns in storage; once every type is registered, [`build`](Self::build)
/// freezes the registry into a [`RowFilterPolicy`].
#[derive(Default)]
pub struct RowFilterPolicyBuilder {
    mode: SchemaMode,
    schemas: HashMap<TypeId, Arc<EntitySchema>>,
}

impl RowFilterPolicyBuilder {
    #[must_use]
    pub fn mode(mut self, mode: SchemaMode) -> Self {
        self.mode = mode;
        self
    }

    /// Registers `E` and prepares its hidden columns in `engine`.
    ///
    /// Registering a type twice is a no-op.
    ///
    /// # Errors
    /// Returns [`ConfigError`] when storage lacks a hidden column it cannot
    /// (or, in [`SchemaMode::Verify`], may not) add.
    pub async fn register<E: Entity>(
        &mut self,
        engine: &dyn StorageEngine<E>,
    ) -> Result<(), ConfigError> {
        let type_id = TypeId::of::<E>();
        if self.schemas.contains_key(&type_id) {
            return Ok(());
        }

        let schema = EntitySchema::describe::<E>();
        engine.provision(&schema, self.mode).await?;

        tracing::debug!(
            entity = E::NAME,
            columns = ?schema.hidden_columns(),
            mode = ?self.mode,
            "registered entity schema"
        );
        self.schemas.insert(type_id, Arc::new(schema));
        Ok(())
    }

    #[must_use]
    pub fn build(self) -> RowFilterPolicy {
        RowFilterPolicy {
            schemas: self.schemas,
        }
    }
}

/// Read-only map from entity type to its [`EntitySchema`].
///
/// Share it behind an `Arc`; lookups take no locks.
#[derive(Debug, Default)]
pub struct RowFilterPolicy {
    schemas: HashMap<TypeId, Arc<EntitySchema>>,
}

impl RowFilterPolicy {
    #[must_use]
    pub fn builder() -> RowFilterPolicyBuilder {
        RowFilterPolicyBuilder::default()
    }

    /// # Errors
    /// [`ConfigError::Unregistered`] if `E` was never registered.
    pub fn schema<E: Entity>(&self) -> Result<Arc<EntitySchema>, ConfigError> {
        self.schemas
            .get(&TypeId::of::<E>())
            .cloned()
            .ok_or(ConfigError::Unregistered { entity: E::NAME })
    }

    /// Row filter for `E` as seen by `ctx`.
    ///
    /// # Errors
    /// [`ConfigError::Unregistered`] if `E` was never registered.
    pub fn row_filter<E: Entity>(&self, ctx: &SecurityContext) -> Result<RowFilter, ConfigError> {
        Ok(self.schema::<E>()?.row_filter(ctx))
    }

    #[must_use]
    pub fn is_registered<E: Entity>(&self) -> bool {
        self.schemas.contains_key(&TypeId::of::<E>())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

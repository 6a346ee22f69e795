#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Storage layer for crudkit services.
//!
//! Entity types declare [`Capabilities`]; [`RowFilterPolicy`] turns them into
//! hidden columns and row predicates once at startup. A [`DbSession`] binds a
//! [`StorageEngine`] to the caller's [`SecurityContext`](crudkit_security::SecurityContext)
//! so every query it hands out already carries the row filter, and every
//! commit runs the registered [`SaveInterceptor`]s first.

pub mod capability;
pub mod changes;
pub mod engine;
pub mod entity;
pub mod error;
pub mod interceptor;
pub mod memory;
pub mod policy;
pub mod predicate;
pub mod provider;
pub mod query;
pub mod schema;
pub mod sea;
pub mod session;

pub use capability::{Capabilities, Capability};
pub use changes::{ChangeTracker, EntryState, TrackedEntry};
pub use engine::{StorageEngine, StoredRow};
pub use entity::{Entity, EntityKey, KeyStrategy};
pub use error::{ConfigError, StorageError};
pub use interceptor::{SaveInterceptor, SoftDeleteInterceptor, TenantStampInterceptor};
pub use memory::InMemoryEngine;
pub use policy::{RowFilterPolicy, RowFilterPolicyBuilder};
pub use predicate::{RowFilter, RowPredicate};
pub use provider::{CommitOptions, EntitySet, StorageProvider};
pub use query::{EntityPredicate, Query};
pub use schema::{EntitySchema, HiddenColumn, HiddenValue, HiddenValues, IndexDef, SchemaMode};
pub use sea::{SeaEntity, SeaOrmEngine};
pub use session::DbSession;

#[cfg(test)]
pub(crate) mod test_support;

use std::fmt;
use std::sync::Arc;

use crudkit_db::{Entity, Query};
use crudkit_security::SecurityContext;

use crate::error::{AccessDenied, MappingError};
use crate::validation::ValidationSink;

/// Service operation, as seen by the permission hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    List,
    Read,
    Create,
    Update,
    Delete,
}

impl Operation {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::List => "list",
            Self::Read => "read",
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }

    #[must_use]
    pub const fn is_write(self) -> bool {
        matches!(self, Self::Create | Self::Update | Self::Delete)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub type ParseDtoFn<E, D> = Arc<dyn Fn(D) -> Result<E, MappingError> + Send + Sync>;
pub type StandardizeFn<E> = Arc<dyn Fn(E) -> E + Send + Sync>;
pub type ValidateFn<E> = Arc<dyn Fn(&E, &ValidationSink) + Send + Sync>;
pub type QueryExtrasFn<E> = Arc<dyn Fn(Query<E>) -> Query<E> + Send + Sync>;
pub type PermissionFn =
    Arc<dyn Fn(&SecurityContext, Operation) -> Result<(), AccessDenied> + Send + Sync>;

/// Per-entity extension points of [`CrudService`](crate::CrudService).
///
/// Only DTO parsing is mandatory. The rest default to pass-through: no
/// normalization, no validation rules, no extra query shaping, every
/// operation permitted.
pub struct ServiceHooks<E: Entity, D> {
    parse_dto: ParseDtoFn<E, D>,
    standardize: StandardizeFn<E>,
    validate: ValidateFn<E>,
    query_extras: QueryExtrasFn<E>,
    check_permission: PermissionFn,
}

impl<E: Entity, D> ServiceHooks<E, D> {
    pub fn new<F>(parse_dto: F) -> Self
    where
        F: Fn(D) -> Result<E, MappingError> + Send + Sync + 'static,
    {
        Self {
            parse_dto: Arc::new(parse_dto),
            standardize: Arc::new(|entity: E| entity),
            validate: Arc::new(|_: &E, _: &ValidationSink| {}),
            query_extras: Arc::new(|query: Query<E>| query),
            check_permission: Arc::new(|_: &SecurityContext, _: Operation| Ok(())),
        }
    }

    #[must_use]
    pub fn standardize<F>(mut self, f: F) -> Self
    where
        F: Fn(E) -> E + Send + Sync + 'static,
    {
        self.standardize = Arc::new(f);
        self
    }

    #[must_use]
    pub fn validate<F>(mut self, f: F) -> Self
    where
        F: Fn(&E, &ValidationSink) + Send + Sync + 'static,
    {
        self.validate = Arc::new(f);
        self
    }

    /// Shapes the read query, e.g. to restrict or order what reads return.
    #[must_use]
    pub fn query_extras<F>(mut self, f: F) -> Self
    where
        F: Fn(Query<E>) -> Query<E> + Send + Sync + 'static,
    {
        self.query_extras = Arc::new(f);
        self
    }

    #[must_use]
    pub fn check_permission<F>(mut self, f: F) -> Self
    where
        F: Fn(&SecurityContext, Operation) -> Result<(), AccessDenied> + Send + Sync + 'static,
    {
        self.check_permission = Arc::new(f);
        self
    }

    /// # Errors
    /// Whatever the parse hook reports.
    pub fn parse(&self, dto: D) -> Result<E, MappingError> {
        (self.parse_dto)(dto)
    }

    #[must_use]
    pub fn normalize(&self, entity: E) -> E {
        (self.standardize)(entity)
    }

    pub fn run_validation(&self, entity: &E, sink: &ValidationSink) {
        (self.validate)(entity, sink);
    }

    #[must_use]
    pub fn shape_query(&self, query: Query<E>) -> Query<E> {
        (self.query_extras)(query)
    }

    /// # Errors
    /// [`AccessDenied`] when the caller may not perform `operation`.
    pub fn authorize(&self, ctx: &SecurityContext, operation: Operation) -> Result<(), AccessDenied> {
        (self.check_permission)(ctx, operation)
    }
}

impl<E: Entity> ServiceHooks<E, E> {
    /// Hooks for services whose DTO is the entity itself.
    #[must_use]
    pub fn identity() -> Self {
        Self::new(Ok)
    }
}

impl<E: Entity, D> Clone for ServiceHooks<E, D> {
    fn clone(&self) -> Self {
        Self {
            parse_dto: Arc::clone(&self.parse_dto),
            standardize: Arc::clone(&self.standardize),
            validate: Arc::clone(&self.validate),
            query_extras: Arc::clone(&self.query_extras),
            check_permission: Arc::clone(&self.check_permission),
        }
    }
}

impl<E: Entity, D> fmt::Debug for ServiceHooks<E, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceHooks")
            .field("entity", &E::NAME)
            .finish_non_exhaustive()
    }
}

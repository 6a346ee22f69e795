//! sea-orm backed [`StorageEngine`](crate::StorageEngine).
//!
//! Entity structs are sea-orm models; the hidden columns live in the same
//! table but are not part of the model, so they are read and written with
//! `sea_query` statements next to the model columns.

mod cond;
mod engine;

pub use cond::{build_row_condition, hidden_value};
pub use engine::SeaOrmEngine;

use sea_orm::{EntityTrait, FromQueryResult, ModelTrait};

use crate::entity::Entity;

/// A sea-orm model usable as a crudkit [`Entity`].
pub trait SeaEntity: Entity + ModelTrait + FromQueryResult {
    /// Column holding [`Entity::id`].
    fn id_column() -> <TableOf<Self> as EntityTrait>::Column;
}

/// The sea-orm entity (table) a model belongs to.
pub type TableOf<M> = <M as ModelTrait>::Entity;

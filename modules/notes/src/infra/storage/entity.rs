use crudkit_db::{Capabilities, Capability, Entity as CrudEntity, SeaEntity};
use sea_orm::entity::prelude::*;
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "notes")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub title: String,
    pub body: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl CrudEntity for Model {
    type Key = i64;
    const NAME: &'static str = "note";
    const CAPABILITIES: Capabilities =
        Capabilities::of(&[Capability::SoftDeletable, Capability::TenantScoped]);

    fn id(&self) -> i64 {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = id;
    }
}

impl SeaEntity for Model {
    fn id_column() -> Column {
        Column::Id
    }
}

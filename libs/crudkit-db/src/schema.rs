use std::collections::BTreeMap;

use crudkit_security::{SecurityContext, TenantId};
use serde::Deserialize;

use crate::capability::{Capabilities, Capability};
use crate::entity::Entity;
use crate::predicate::{self, PredicateBuilder, RowFilter};

/// Columns added to the storage schema of capability-marked types.
/// They are invisible to the entity struct itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HiddenColumn {
    IsDeleted,
    CommunityId,
}

impl HiddenColumn {
    #[must_use]
    pub const fn for_capability(cap: Capability) -> Self {
        match cap {
            Capability::SoftDeletable => HiddenColumn::IsDeleted,
            Capability::TenantScoped => HiddenColumn::CommunityId,
        }
    }

    /// Physical column name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            HiddenColumn::IsDeleted => "IsDeleted",
            HiddenColumn::CommunityId => "CommunityID",
        }
    }

    #[must_use]
    pub const fn default_value(self) -> HiddenValue {
        match self {
            HiddenColumn::IsDeleted => HiddenValue::Bool(false),
            HiddenColumn::CommunityId => HiddenValue::Int(0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HiddenValue {
    Bool(bool),
    Int(i64),
}

/// Values of the hidden columns of one row (or the overrides staged for it).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HiddenValues(BTreeMap<HiddenColumn, HiddenValue>);

impl HiddenValues {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, column: HiddenColumn) -> Option<HiddenValue> {
        self.0.get(&column).copied()
    }

    pub fn set(&mut self, column: HiddenColumn, value: HiddenValue) {
        self.0.insert(column, value);
    }

    /// Overwrites the columns present in `other`.
    pub fn merge(&mut self, other: &HiddenValues) {
        for (column, value) in other.iter() {
            self.set(column, value);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (HiddenColumn, HiddenValue)> + '_ {
        self.0.iter().map(|(c, v)| (*c, *v))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn is_deleted(&self) -> bool {
        matches!(
            self.get(HiddenColumn::IsDeleted),
            Some(HiddenValue::Bool(true))
        )
    }

    #[must_use]
    pub fn tenant(&self) -> Option<TenantId> {
        match self.get(HiddenColumn::CommunityId) {
            Some(HiddenValue::Int(id)) => Some(TenantId::new(id)),
            _ => None,
        }
    }
}

/// Secondary index over one hidden column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexDef {
    name: String,
    column: HiddenColumn,
}

impl IndexDef {
    fn for_column(column: HiddenColumn) -> Self {
        Self {
            name: format!("IX_{}", column.name()),
            column,
        }
    }

    /// Logical name, `IX_<column>`.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn column(&self) -> HiddenColumn {
        self.column
    }

    /// Name qualified by table, for stores whose index names are
    /// schema-global (SQLite, Postgres).
    #[must_use]
    pub fn physical_name(&self, table: &str) -> String {
        format!("IX_{table}_{}", self.column.name())
    }
}

/// Whether registration may alter storage to add missing hidden columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaMode {
    /// Add missing hidden columns and indexes.
    #[default]
    Migrate,
    /// Only check that hidden columns exist; fail otherwise.
    Verify,
}

/// Registration record for one entity type.
#[derive(Debug, Clone)]
pub struct EntitySchema {
    entity: &'static str,
    capabilities: Capabilities,
    hidden_columns: Vec<HiddenColumn>,
    indexes: Vec<IndexDef>,
    predicates: Vec<(Capability, PredicateBuilder)>,
}

impl EntitySchema {
    /// Derives hidden columns, indexes and predicate builders from
    /// `E::CAPABILITIES`.
    #[must_use]
    pub fn describe<E: Entity>() -> Self {
        let capabilities = E::CAPABILITIES;
        let hidden_columns: Vec<HiddenColumn> =
            capabilities.iter().map(HiddenColumn::for_capability).collect();
        let indexes = hidden_columns
            .iter()
            .copied()
            .map(IndexDef::for_column)
            .collect();
        let predicates = capabilities
            .iter()
            .map(|cap| (cap, predicate::builder_for(cap)))
            .collect();

        Self {
            entity: E::NAME,
            capabilities,
            hidden_columns,
            indexes,
            predicates,
        }
    }

    #[must_use]
    pub fn entity(&self) -> &'static str {
        self.entity
    }

    #[must_use]
    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    #[must_use]
    pub fn hidden_columns(&self) -> &[HiddenColumn] {
        &self.hidden_columns
    }

    #[must_use]
    pub fn indexes(&self) -> &[IndexDef] {
        &self.indexes
    }

    /// Hidden column values of a freshly inserted row.
    #[must_use]
    pub fn defaults(&self) -> HiddenValues {
        let mut values = HiddenValues::new();
        for column in &self.hidden_columns {
            values.set(*column, column.default_value());
        }
        values
    }

    /// Conjunction of every capability predicate, bound to `ctx`.
    #[must_use]
    pub fn row_filter(&self, ctx: &SecurityContext) -> RowFilter {
        RowFilter::all_of(self.predicates.iter().map(|(_, build)| build(ctx)))
    }
}

use crudkit_security::SecurityContext;

use crate::capability::Capability;
use crate::schema::{HiddenColumn, HiddenValue, HiddenValues};

/// One implicit condition on hidden columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowPredicate {
    Equals {
        column: HiddenColumn,
        value: HiddenValue,
    },
    /// Matches no row. Used when the caller lacks the context a predicate
    /// needs (e.g. a tenant).
    DenyAll,
}

impl RowPredicate {
    /// A row missing the column is treated as holding the column default.
    #[must_use]
    pub fn matches(&self, row: &HiddenValues) -> bool {
        match self {
            RowPredicate::Equals { column, value } => {
                row.get(*column).unwrap_or_else(|| column.default_value()) == *value
            }
            RowPredicate::DenyAll => false,
        }
    }
}

/// Builds the predicate for one capability from the caller context.
pub type PredicateBuilder = fn(&SecurityContext) -> RowPredicate;

#[must_use]
pub fn builder_for(cap: Capability) -> PredicateBuilder {
    match cap {
        Capability::SoftDeletable => not_deleted,
        Capability::TenantScoped => same_tenant,
    }
}

fn not_deleted(_ctx: &SecurityContext) -> RowPredicate {
    RowPredicate::Equals {
        column: HiddenColumn::IsDeleted,
        value: HiddenValue::Bool(false),
    }
}

fn same_tenant(ctx: &SecurityContext) -> RowPredicate {
    match ctx.tenant_id() {
        Some(tenant) => RowPredicate::Equals {
            column: HiddenColumn::CommunityId,
            value: HiddenValue::Int(tenant.get()),
        },
        None => RowPredicate::DenyAll,
    }
}

/// Conjunction of [`RowPredicate`]s. Empty means unrestricted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowFilter {
    predicates: Vec<RowPredicate>,
}

impl RowFilter {
    #[must_use]
    pub fn allow_all() -> Self {
        Self::default()
    }

    pub fn all_of(predicates: impl IntoIterator<Item = RowPredicate>) -> Self {
        Self {
            predicates: predicates.into_iter().collect(),
        }
    }

    #[must_use]
    pub fn predicates(&self) -> &[RowPredicate] {
        &self.predicates
    }

    #[must_use]
    pub fn is_unrestricted(&self) -> bool {
        self.predicates.is_empty()
    }

    #[must_use]
    pub fn is_deny_all(&self) -> bool {
        self.predicates.contains(&RowPredicate::DenyAll)
    }

    #[must_use]
    pub fn matches(&self, row: &HiddenValues) -> bool {
        self.predicates.iter().all(|p| p.matches(row))
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    fn row(deleted: bool, tenant: i64) -> HiddenValues {
        let mut values = HiddenValues::new();
        values.set(HiddenColumn::IsDeleted, HiddenValue::Bool(deleted));
        values.set(HiddenColumn::CommunityId, HiddenValue::Int(tenant));
        values
    }

    #[test]
    fn tenant_predicate_uses_caller_tenant() {
        let ctx = SecurityContext::builder().tenant_id(5).build();
        let predicate = builder_for(Capability::TenantScoped)(&ctx);

        assert!(predicate.matches(&row(false, 5)));
        assert!(!predicate.matches(&row(false, 6)));
    }

    #[test]
    fn tenant_predicate_without_tenant_denies_everything() {
        let predicate = builder_for(Capability::TenantScoped)(&SecurityContext::anonymous());
        assert_eq!(predicate, RowPredicate::DenyAll);
        assert!(!predicate.matches(&row(false, 0)));
    }

    #[test]
    fn filter_is_a_conjunction() {
        let ctx = SecurityContext::builder().tenant_id(1).build();
        let filter = RowFilter::all_of(
            Capability::ALL.into_iter().map(|cap| builder_for(cap)(&ctx)),
        );

        assert!(filter.matches(&row(false, 1)));
        assert!(!filter.matches(&row(true, 1)));
        assert!(!filter.matches(&row(false, 2)));
    }

    #[test]
    fn missing_column_reads_as_default() {
        let filter = RowFilter::all_of([builder_for(Capability::SoftDeletable)(
            &SecurityContext::anonymous(),
        )]);
        assert!(filter.matches(&HiddenValues::new()));
    }

    #[test]
    fn empty_filter_allows_all() {
        let filter = RowFilter::allow_all();
        assert!(filter.is_unrestricted());
        assert!(!filter.is_deny_all());
        assert!(filter.matches(&row(true, 42)));
    }
}

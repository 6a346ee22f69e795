use sea_orm::sea_query::{Alias, Expr, SimpleExpr};
use sea_orm::{Condition, EntityTrait};

use crate::predicate::{RowFilter, RowPredicate};
use crate::schema::HiddenValue;

#[must_use]
pub fn hidden_value(value: HiddenValue) -> sea_orm::Value {
    match value {
        HiddenValue::Bool(b) => sea_orm::Value::from(b),
        HiddenValue::Int(n) => sea_orm::Value::from(n),
    }
}

fn hidden_value_expr(value: HiddenValue) -> SimpleExpr {
    match value {
        HiddenValue::Bool(b) => Expr::value(b),
        HiddenValue::Int(n) => Expr::value(n),
    }
}

/// Build a deny-all condition (`WHERE false`).
fn deny_all() -> Condition {
    Condition::all().add(Expr::value(false))
}

/// Compiles a [`RowFilter`] into a condition on table `T`.
///
/// | Filter | SQL |
/// |--------|-----|
/// | empty | no restriction |
/// | contains deny-all | `WHERE false` |
/// | otherwise | AND of `"<hidden column>" = <value>` |
pub fn build_row_condition<T: EntityTrait>(filter: &RowFilter) -> Condition {
    let mut cond = Condition::all();
    for predicate in filter.predicates() {
        match predicate {
            RowPredicate::Equals { column, value } => {
                cond = cond.add(
                    Expr::col((T::default(), Alias::new(column.name()))).eq(hidden_value_expr(*value)),
                );
            }
            RowPredicate::DenyAll => return deny_all(),
        }
    }
    cond
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use sea_orm::entity::prelude::*;
    use sea_orm::{DbBackend, QueryTrait};

    use super::*;
    use crate::schema::HiddenColumn;

    mod item {
        use sea_orm::entity::prelude::*;

        #[derive(Debug, Clone, PartialEq, Eq, DeriveEntityModel)]
        #[sea_orm(table_name = "items")]
        pub struct Model {
            #[sea_orm(primary_key)]
            pub id: i64,
            pub name: String,
        }

        #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
        pub enum Relation {}

        impl ActiveModelBehavior for ActiveModel {}
    }

    fn sql(filter: &RowFilter) -> String {
        item::Entity::find()
            .filter(build_row_condition::<item::Entity>(filter))
            .build(DbBackend::Sqlite)
            .to_string()
    }

    #[test]
    fn empty_filter_adds_no_where_clause() {
        assert!(!sql(&RowFilter::allow_all()).contains("WHERE"));
    }

    #[test]
    fn predicates_reference_qualified_hidden_columns() {
        let filter = RowFilter::all_of([
            RowPredicate::Equals {
                column: HiddenColumn::IsDeleted,
                value: HiddenValue::Bool(false),
            },
            RowPredicate::Equals {
                column: HiddenColumn::CommunityId,
                value: HiddenValue::Int(3),
            },
        ]);
        let sql = sql(&filter);

        assert!(sql.contains(r#""items"."IsDeleted""#), "{sql}");
        assert!(sql.contains(r#""items"."CommunityID" = 3"#), "{sql}");
        assert!(sql.contains(" AND "), "{sql}");
    }

    #[test]
    fn deny_all_short_circuits() {
        let filter = RowFilter::all_of([
            RowPredicate::Equals {
                column: HiddenColumn::IsDeleted,
                value: HiddenValue::Bool(false),
            },
            RowPredicate::DenyAll,
        ]);
        let sql = sql(&filter);

        assert!(sql.contains("WHERE FALSE") || sql.contains("WHERE 0"), "{sql}");
        assert!(!sql.contains("IsDeleted"), "{sql}");
    }
}

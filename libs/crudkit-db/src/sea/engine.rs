use std::marker::PhantomData;

use async_trait::async_trait;
use sea_orm::sea_query::{
    Alias, DynIden, Expr, IntoIden, Query as SqlQuery, SimpleExpr,
};
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction, DbErr, EntityName,
    EntityTrait, FromQueryResult, IdenStatic, Iterable, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, QueryTrait, Select, TransactionTrait,
};
use sea_orm_migration::prelude as mig;
use tokio_util::sync::CancellationToken;

use crate::changes::{EntryState, TrackedEntry};
use crate::engine::{StorageEngine, StoredRow, cancellable};
use crate::entity::{Entity, EntityKey, KeyStrategy};
use crate::error::{ConfigError, StorageError};
use crate::predicate::RowFilter;
use crate::query::Query;
use crate::schema::{EntitySchema, HiddenColumn, HiddenValue, HiddenValues, SchemaMode};

use super::cond::{build_row_condition, hidden_value};
use super::{SeaEntity, TableOf};

/// [`StorageEngine`] over a sea-orm connection.
///
/// Sequence keys rely on the table's auto-increment primary key; generated
/// keys are written explicitly.
pub struct SeaOrmEngine<E> {
    conn: DatabaseConnection,
    _entity: PhantomData<fn() -> E>,
}

impl<E> SeaOrmEngine<E> {
    #[must_use]
    pub fn new(conn: DatabaseConnection) -> Self {
        Self {
            conn,
            _entity: PhantomData,
        }
    }

    #[must_use]
    pub fn conn(&self) -> &DatabaseConnection {
        &self.conn
    }
}

fn table<E: SeaEntity>() -> TableOf<E> {
    TableOf::<E>::default()
}

fn is_id_column<E: SeaEntity>(column: <TableOf<E> as EntityTrait>::Column) -> bool {
    column.as_str() == E::id_column().as_str()
}

fn hidden_column_def(column: HiddenColumn) -> mig::ColumnDef {
    let mut def = mig::ColumnDef::new(Alias::new(column.name()));
    match column.default_value() {
        HiddenValue::Bool(b) => def.boolean().not_null().default(Expr::value(b)),
        HiddenValue::Int(n) => def.big_integer().not_null().default(Expr::value(n)),
    };
    def
}

/// SQLite: "no such column", MySQL: "Unknown column", Postgres:
/// "column ... does not exist".
fn is_unknown_column(err: &DbErr) -> bool {
    let message = err.to_string().to_ascii_lowercase();
    message.contains("no such column")
        || message.contains("unknown column")
        || (message.contains("column") && message.contains("does not exist"))
}

fn read_hidden(
    row: &sea_orm::QueryResult,
    columns: &[HiddenColumn],
) -> Result<HiddenValues, StorageError> {
    let mut values = HiddenValues::new();
    for column in columns {
        let value = match column.default_value() {
            HiddenValue::Bool(_) => HiddenValue::Bool(row.try_get::<bool>("", column.name())?),
            HiddenValue::Int(_) => HiddenValue::Int(row.try_get::<i64>("", column.name())?),
        };
        values.set(*column, value);
    }
    Ok(values)
}

impl<E> SeaOrmEngine<E>
where
    E: SeaEntity,
    TableOf<E>: EntityTrait<Model = E>,
    <E as Entity>::Key: Into<sea_orm::Value>,
{
    fn select(query: &Query<E>) -> Select<TableOf<E>> {
        let mut select = TableOf::<E>::find()
            .filter(build_row_condition::<TableOf<E>>(query.row_filter()))
            .order_by_asc(E::id_column());
        if let Some(id) = query.id() {
            select = select.filter(E::id_column().eq(id.clone()));
        }
        select
    }

    fn id_matches(id: &E::Key) -> SimpleExpr {
        Expr::col((table::<E>(), E::id_column())).eq(SimpleExpr::Value(id.clone().into()))
    }

    /// Looks for a column with a zero-row select. Only an unknown-column
    /// failure means "absent"; anything else is reported.
    async fn has_column(&self, column: HiddenColumn) -> Result<bool, ConfigError> {
        let mut lookup = SqlQuery::select();
        lookup
            .column(Alias::new(column.name()))
            .from(table::<E>())
            .limit(0);
        let stmt = self.conn.get_database_backend().build(&lookup);
        match self.conn.query_all(stmt).await {
            Ok(_) => Ok(true),
            Err(e) if is_unknown_column(&e) => Ok(false),
            Err(e) => Err(ConfigError::provisioning(E::NAME, e.to_string())),
        }
    }

    async fn insert(
        txn: &DatabaseTransaction,
        schema: &EntitySchema,
        mut entity: E,
        hidden: &HiddenValues,
    ) -> Result<u64, StorageError> {
        let generated = <E::Key as EntityKey>::STRATEGY == KeyStrategy::Generated;
        if generated {
            entity.set_id(E::Key::generate());
        }

        let mut columns: Vec<DynIden> = Vec::new();
        let mut values: Vec<SimpleExpr> = Vec::new();
        for column in <TableOf<E> as EntityTrait>::Column::iter() {
            if !generated && is_id_column::<E>(column) {
                continue;
            }
            columns.push(column.into_iden());
            values.push(SimpleExpr::Value(entity.get(column)));
        }

        let mut row_hidden = schema.defaults();
        row_hidden.merge(hidden);
        for (column, value) in row_hidden.iter() {
            columns.push(Alias::new(column.name()).into_iden());
            values.push(SimpleExpr::Value(hidden_value(value)));
        }

        let mut stmt = SqlQuery::insert();
        stmt.into_table(table::<E>())
            .columns(columns)
            .values(values)
            .map_err(|e| StorageError::engine(e.to_string()))?;

        let res = txn.execute(txn.get_database_backend().build(&stmt)).await?;
        Ok(res.rows_affected())
    }

    async fn update(
        txn: &DatabaseTransaction,
        filter: &RowFilter,
        entity: &E,
        hidden: &HiddenValues,
    ) -> Result<u64, StorageError> {
        let mut values: Vec<(DynIden, SimpleExpr)> = Vec::new();
        for column in <TableOf<E> as EntityTrait>::Column::iter() {
            if is_id_column::<E>(column) {
                continue;
            }
            values.push((column.into_iden(), SimpleExpr::Value(entity.get(column))));
        }
        for (column, value) in hidden.iter() {
            values.push((
                Alias::new(column.name()).into_iden(),
                SimpleExpr::Value(hidden_value(value)),
            ));
        }

        let mut stmt = SqlQuery::update();
        stmt.table(table::<E>())
            .values(values)
            .cond_where(build_row_condition::<TableOf<E>>(filter))
            .and_where(Self::id_matches(&entity.id()));

        let res = txn.execute(txn.get_database_backend().build(&stmt)).await?;
        if res.rows_affected() == 0 {
            return Err(StorageError::row_not_found(E::NAME, &entity.id()));
        }
        Ok(res.rows_affected())
    }

    async fn delete(txn: &DatabaseTransaction, filter: &RowFilter, entity: &E) -> Result<u64, StorageError> {
        let mut stmt = SqlQuery::delete();
        stmt.from_table(table::<E>())
            .cond_where(build_row_condition::<TableOf<E>>(filter))
            .and_where(Self::id_matches(&entity.id()));

        let res = txn.execute(txn.get_database_backend().build(&stmt)).await?;
        if res.rows_affected() == 0 {
            return Err(StorageError::row_not_found(E::NAME, &entity.id()));
        }
        Ok(res.rows_affected())
    }
}

#[async_trait]
impl<E> StorageEngine<E> for SeaOrmEngine<E>
where
    E: SeaEntity,
    TableOf<E>: EntityTrait<Model = E>,
    <E as Entity>::Key: Into<sea_orm::Value>,
{
    #[tracing::instrument(skip_all, fields(entity = E::NAME, mode = ?mode))]
    async fn provision(&self, schema: &EntitySchema, mode: SchemaMode) -> Result<(), ConfigError> {
        let manager = mig::SchemaManager::new(&self.conn);
        let table_name = table::<E>().table_name().to_owned();

        for column in schema.hidden_columns() {
            if self.has_column(*column).await? {
                continue;
            }
            if mode == SchemaMode::Verify {
                return Err(ConfigError::MissingHiddenColumn {
                    entity: E::NAME,
                    column: column.name(),
                });
            }
            manager
                .alter_table(
                    mig::Table::alter()
                        .table(table::<E>())
                        .add_column(&mut hidden_column_def(*column))
                        .to_owned(),
                )
                .await
                .map_err(|e| ConfigError::provisioning(E::NAME, e.to_string()))?;
            tracing::info!(table = %table_name, column = column.name(), "added hidden column");
        }

        if mode == SchemaMode::Migrate {
            for index in schema.indexes() {
                manager
                    .create_index(
                        mig::Index::create()
                            .if_not_exists()
                            .name(index.physical_name(&table_name))
                            .table(table::<E>())
                            .col(Alias::new(index.column().name()))
                            .to_owned(),
                    )
                    .await
                    .map_err(|e| ConfigError::provisioning(E::NAME, e.to_string()))?;
            }
        }
        Ok(())
    }

    async fn fetch(&self, query: &Query<E>, cancel: &CancellationToken) -> Result<Vec<E>, StorageError> {
        let select = Self::select(query);
        cancellable(cancel, async {
            if query.has_entity_predicates() {
                let rows = select.all(&self.conn).await?;
                let matching: Vec<E> = rows.into_iter().filter(|e| query.matches_entity(e)).collect();
                return Ok(query.paginate(matching));
            }
            let rows = select
                .offset(query.offset())
                .limit(query.limit())
                .all(&self.conn)
                .await?;
            Ok::<_, StorageError>(rows)
        })
        .await
    }

    async fn count(&self, query: &Query<E>, cancel: &CancellationToken) -> Result<u64, StorageError> {
        if query.has_entity_predicates() {
            let rows = self.fetch(&query.unpaged(), cancel).await?;
            return u64::try_from(rows.len()).map_err(|e| StorageError::engine(e.to_string()));
        }
        let select = Self::select(query);
        cancellable(cancel, async { Ok::<_, StorageError>(select.count(&self.conn).await?) }).await
    }

    #[tracing::instrument(skip_all, fields(entity = E::NAME, entries = entries.len()))]
    async fn apply(
        &self,
        schema: &EntitySchema,
        filter: &RowFilter,
        entries: Vec<TrackedEntry<E>>,
        cancel: &CancellationToken,
    ) -> Result<u64, StorageError> {
        if cancel.is_cancelled() {
            return Err(StorageError::Cancelled);
        }

        let txn = self.conn.begin().await?;
        let mut affected = 0;
        for entry in entries {
            if cancel.is_cancelled() {
                txn.rollback().await?;
                return Err(StorageError::Cancelled);
            }
            let (entity, state, hidden) = entry.into_parts();
            affected += match state {
                EntryState::Added => Self::insert(&txn, schema, entity, &hidden).await?,
                EntryState::Modified => Self::update(&txn, filter, &entity, &hidden).await?,
                EntryState::Deleted => Self::delete(&txn, filter, &entity).await?,
                EntryState::Unchanged => 0,
            };
        }

        if cancel.is_cancelled() {
            txn.rollback().await?;
            return Err(StorageError::Cancelled);
        }
        txn.commit().await?;
        Ok(affected)
    }

    async fn fetch_unfiltered(
        &self,
        schema: &EntitySchema,
        cancel: &CancellationToken,
    ) -> Result<Vec<StoredRow<E>>, StorageError> {
        cancellable(cancel, async {
            let mut stmt = TableOf::<E>::find().order_by_asc(E::id_column()).into_query();
            for column in schema.hidden_columns() {
                stmt.expr_as(
                    Expr::col((table::<E>(), Alias::new(column.name()))),
                    Alias::new(column.name()),
                );
            }
            let backend = self.conn.get_database_backend();
            let mut rows = Vec::new();
            for row in self.conn.query_all(backend.build(&stmt)).await? {
                let entity = <E as FromQueryResult>::from_query_result(&row, "")?;
                let hidden = read_hidden(&row, schema.hidden_columns())?;
                rows.push(StoredRow { entity, hidden });
            }
            Ok::<_, StorageError>(rows)
        })
        .await
    }
}

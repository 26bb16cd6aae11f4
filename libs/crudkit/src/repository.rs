//! Generic CRUD repository over sea-orm entities

use crate::entity::{
    column_by_name, is_null_or_empty, primary_key_column, primary_key_name, soft_delete_column,
    stamp, table_name, UPDATED_AT_COLUMN,
};
use crate::error::RepoError;
use crate::query::{Filterable, Operand, QueryBuilder, RawSql};
use crate::query::raw::quote_ident;
use crate::session::{guarded, Session};
use crate::update::UpdateMap;
use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveModelBehavior, ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection,
    EntityTrait, IdenStatic, IntoActiveModel, ModelTrait, PrimaryKeyTrait, QueryFilter, Related,
    Value,
};
use std::marker::PhantomData;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Primary key value type of an entity.
pub type PrimaryKeyOf<E> = <<E as EntityTrait>::PrimaryKey as PrimaryKeyTrait>::ValueType;

#[derive(Debug, Clone, Default)]
struct RepositoryState {
    select_fields: Vec<String>,
    unscoped: bool,
    cancel: Option<CancellationToken>,
}

/// CRUD surface for one entity type.
///
/// Handles are cheap to clone. `select`, `unscoped`, `with_cancellation`
/// and `with_session` return new handles; the receiver is never modified.
///
/// Entities with a `deleted_at` column are soft-deleted: reads skip rows
/// with a deletion timestamp and deletes set it, unless the handle is
/// [`unscoped`](Self::unscoped) or a hard delete is requested.
pub struct Repository<E: EntityTrait, S: Session = Arc<DatabaseConnection>> {
    session: S,
    state: RepositoryState,
    table: String,
    primary_key: String,
    soft_delete: Option<String>,
    _entity: PhantomData<fn() -> E>,
}

impl<E: EntityTrait, S: Session> Clone for Repository<E, S> {
    fn clone(&self) -> Self {
        Self {
            session: self.session.clone(),
            state: self.state.clone(),
            table: self.table.clone(),
            primary_key: self.primary_key.clone(),
            soft_delete: self.soft_delete.clone(),
            _entity: PhantomData,
        }
    }
}

impl<E: EntityTrait, S: Session> std::fmt::Debug for Repository<E, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("table", &self.table)
            .field("state", &self.state)
            .finish()
    }
}

impl<E, S> Repository<E, S>
where
    E: EntityTrait,
    S: Session,
    PrimaryKeyOf<E>: Into<Value> + Clone,
{
    pub fn new(session: S) -> Self {
        Self {
            session,
            state: RepositoryState::default(),
            table: table_name::<E>(),
            primary_key: primary_key_name::<E>(),
            soft_delete: soft_delete_column::<E>().map(|c| c.as_str().to_string()),
            _entity: PhantomData,
        }
    }

    pub fn table_name(&self) -> &str {
        &self.table
    }

    pub fn session(&self) -> &S {
        &self.session
    }

    // ===== Derived handles =====

    /// Handle whose [`query`](Self::query) builders select only `fields`.
    pub fn select<I, C>(&self, fields: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<String>,
    {
        let mut repo = self.clone();
        repo.state.select_fields = fields.into_iter().map(Into::into).collect();
        repo
    }

    /// Handle that sees soft-deleted rows and deletes physically.
    pub fn unscoped(&self) -> Self {
        let mut repo = self.clone();
        repo.state.unscoped = true;
        repo
    }

    /// Handle whose calls fail with `Cancelled` once `token` fires.
    pub fn with_cancellation(&self, token: CancellationToken) -> Self {
        let mut repo = self.clone();
        repo.state.cancel = Some(token);
        repo
    }

    /// Same handle state bound to another session, typically a transaction.
    pub fn with_session<T: Session>(&self, session: T) -> Repository<E, T> {
        Repository {
            session,
            state: self.state.clone(),
            table: self.table.clone(),
            primary_key: self.primary_key.clone(),
            soft_delete: self.soft_delete.clone(),
            _entity: PhantomData,
        }
    }

    // ===== Reads =====

    /// Fresh builder on this table carrying the handle's selection, scope
    /// and cancellation.
    pub fn query(&self) -> QueryBuilder<E, S> {
        let builder = self.base_query();
        if self.state.select_fields.is_empty() {
            builder
        } else {
            builder.select(self.state.select_fields.iter())
        }
    }

    fn base_query(&self) -> QueryBuilder<E, S> {
        let mut builder = QueryBuilder::<E, S>::new(self.session.clone());
        if self.state.unscoped {
            builder = builder.unscoped();
        }
        if let Some(token) = &self.state.cancel {
            builder = builder.with_cancellation(token.clone());
        }
        builder
    }

    fn qualified(&self, column: &str) -> String {
        if column.contains('.') {
            column.to_string()
        } else {
            format!("{}.{}", self.table, column)
        }
    }

    pub async fn find_all(&self) -> Result<Vec<E::Model>, RepoError> {
        self.base_query().all().await
    }

    pub async fn find_by_id(&self, id: PrimaryKeyOf<E>) -> Result<E::Model, RepoError> {
        let key: Value = id.into();
        self.base_query()
            .where_eq(&self.qualified(&self.primary_key), key.clone())
            .first()
            .await
            .map_err(|e| self.rename_not_found(e, || format!("find `{}` by id {key:?}", self.table)))
    }

    /// Rows for the ids that exist; missing ids are skipped.
    pub async fn find_by_ids<I>(&self, ids: I) -> Result<Vec<E::Model>, RepoError>
    where
        I: IntoIterator<Item = PrimaryKeyOf<E>>,
    {
        let ids: Vec<Value> = ids.into_iter().map(Into::into).collect();
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.base_query()
            .where_in(&self.qualified(&self.primary_key), ids)
            .all()
            .await
    }

    /// Rows matching every `column = value` pair.
    pub async fn find_where<I, K, V>(&self, filters: I) -> Result<Vec<E::Model>, RepoError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Operand>,
    {
        let mut builder = self.base_query();
        for (column, value) in filters {
            builder = builder.where_eq(&self.qualified(column.as_ref()), value);
        }
        builder.all().await
    }

    pub async fn find_where_expr(&self, expr: RawSql) -> Result<Vec<E::Model>, RepoError> {
        self.base_query().where_raw(expr).all().await
    }

    pub async fn find_by(&self, column: &str, value: impl Into<Operand>) -> Result<Vec<E::Model>, RepoError> {
        self.base_query()
            .where_eq(&self.qualified(column), value)
            .all()
            .await
    }

    pub async fn find_first_by(&self, column: &str, value: impl Into<Operand>) -> Result<E::Model, RepoError> {
        self.base_query()
            .where_eq(&self.qualified(column), value)
            .first()
            .await
            .map_err(|e| self.rename_not_found(e, || format!("find first `{}` by {column}", self.table)))
    }

    /// Load one row by `key_column = key_value` together with its related
    /// `R` rows.
    pub async fn preload<R>(
        &self,
        key_column: &str,
        key_value: impl Into<Operand>,
    ) -> Result<(E::Model, Vec<R::Model>), RepoError>
    where
        R: EntityTrait,
        E: Related<R>,
    {
        let parent = self
            .base_query()
            .where_eq(&self.qualified(key_column), key_value)
            .first()
            .await
            .map_err(|e| self.rename_not_found(e, || format!("preload `{}` by {key_column}", self.table)))?;

        let mut select = parent.find_related(R::default());
        if !self.state.unscoped {
            if let Some(column) = soft_delete_column::<R>() {
                select = select.filter(column.is_null());
            }
        }
        let context = format!("preload `{}` for `{}`", table_name::<R>(), self.table);
        let related = guarded(self.state.cancel.as_ref(), context, select.all(self.session.conn())).await?;
        Ok((parent, related))
    }

    pub async fn count(&self) -> Result<u64, RepoError> {
        self.base_query().count().await
    }

    pub async fn exists(&self, expr: RawSql) -> Result<bool, RepoError> {
        self.base_query().where_raw(expr).exists().await
    }

    pub async fn exist_by_id(&self, id: PrimaryKeyOf<E>) -> Result<bool, RepoError> {
        let key: Value = id.into();
        self.base_query()
            .where_eq(&self.qualified(&self.primary_key), key)
            .exists()
            .await
    }

    fn rename_not_found(&self, err: RepoError, context: impl FnOnce() -> String) -> RepoError {
        if err.is_not_found() {
            RepoError::not_found(context())
        } else {
            err
        }
    }

    // ===== Writes =====

    /// Insert when the primary key is empty (assigning a new id), otherwise
    /// update every set column of the row, inserting if no row was updated.
    pub async fn save<A>(&self, model: A) -> Result<E::Model, RepoError>
    where
        A: ActiveModelTrait<Entity = E> + ActiveModelBehavior + Send,
        E::Model: IntoActiveModel<A>,
    {
        let context = format!("save into `{}`", self.table);
        let key_column = self.key_column(&context)?;
        let key = model.get(key_column).into_value();

        if let Some(key) = key.filter(|k| !is_null_or_empty(k)) {
            let model = stamp(model, false);
            let mut assignments = Vec::new();
            for column in <E::Column as sea_orm::Iterable>::iter() {
                if column.as_str() == self.primary_key {
                    continue;
                }
                if let Some(value) = model.get(column).into_value() {
                    assignments.push((column.as_str().to_string(), value));
                }
            }
            let updated = if assignments.is_empty() {
                0
            } else {
                let filter = self.key_filter(key.clone());
                self.execute(self.update_sql(assignments, filter), context.clone())
                    .await?
            };
            if updated > 0 {
                return self.reload(key, &context).await;
            }
            return self.insert(model, context).await;
        }

        self.insert(stamp(model, true), context).await
    }

    /// Save each model in order.
    pub async fn save_all<A>(&self, models: Vec<A>) -> Result<Vec<E::Model>, RepoError>
    where
        A: ActiveModelTrait<Entity = E> + ActiveModelBehavior + Send,
        E::Model: IntoActiveModel<A>,
    {
        let mut saved = Vec::with_capacity(models.len());
        for model in models {
            saved.push(self.save(model).await?);
        }
        Ok(saved)
    }

    async fn insert<A>(&self, model: A, context: String) -> Result<E::Model, RepoError>
    where
        A: ActiveModelTrait<Entity = E> + ActiveModelBehavior + Send,
        E::Model: IntoActiveModel<A>,
    {
        tracing::debug!(table = %self.table, "inserting row");
        guarded(self.state.cancel.as_ref(), context, model.insert(self.session.conn())).await
    }

    /// Insert, or on a unique conflict over `conflict_columns` update only
    /// `update_columns` (plus `updated_at` when present).
    pub async fn upsert_only_columns<A>(
        &self,
        model: A,
        conflict_columns: &[&str],
        update_columns: &[&str],
    ) -> Result<E::Model, RepoError>
    where
        A: ActiveModelTrait<Entity = E> + ActiveModelBehavior + Send,
        E::Model: IntoActiveModel<A>,
    {
        let context = format!(
            "failed to upsert entity with specified columns into `{}`",
            self.table
        );
        if conflict_columns.is_empty() {
            return Err(RepoError::invalid_input(context, "no conflict columns given"));
        }
        let model = stamp(model, true);
        let conflict = self.columns(conflict_columns, &context)?;
        let mut update = self.columns(update_columns, &context)?;
        if let Some(updated_at) = column_by_name::<E>(UPDATED_AT_COLUMN) {
            if !update_columns.contains(&UPDATED_AT_COLUMN) {
                update.push(updated_at);
            }
        }

        let mut on_conflict = OnConflict::columns(conflict.iter().copied());
        if update_columns.is_empty() {
            on_conflict.do_nothing();
        } else {
            on_conflict.update_columns(update.iter().copied());
        }

        let mut lookup = self.base_query().unscoped();
        for column in &conflict {
            let value = model.get(*column).into_value().ok_or_else(|| {
                RepoError::invalid_input(
                    context.clone(),
                    format!("conflict column `{}` is not set", column.as_str()),
                )
            })?;
            lookup = lookup.where_eq(&self.qualified(column.as_str()), value);
        }

        let insert = E::insert(model).on_conflict(on_conflict);
        guarded(
            self.state.cancel.as_ref(),
            context.clone(),
            insert.exec_without_returning(self.session.conn()),
        )
        .await?;

        lookup.first().await
    }

    /// Partial update of one row.
    pub async fn updates(&self, model: &E::Model, changes: &UpdateMap) -> Result<(), RepoError> {
        let context = format!("update columns in `{}`", self.table);
        if changes.is_empty() {
            return Err(RepoError::invalid_input(context, "update map is empty"));
        }
        let mut assignments = changes.resolve::<E>(&context)?;
        self.touch(&mut assignments, changes);

        let key = self.model_key(model, &context)?;
        let filter = self.key_filter(key);
        let updated = self.execute(self.update_sql(assignments, filter), context.clone()).await?;
        if updated == 0 {
            return Err(RepoError::not_found(context));
        }
        Ok(())
    }

    pub async fn soft_delete(&self, model: &E::Model) -> Result<(), RepoError> {
        self.soft_delete_with_update(model, &UpdateMap::new()).await
    }

    /// Apply `changes` and set the deletion timestamp in one statement.
    pub async fn soft_delete_with_update(&self, model: &E::Model, changes: &UpdateMap) -> Result<(), RepoError> {
        let context = format!("soft delete in `{}`", self.table);
        let Some(deleted_at) = self.soft_delete.clone() else {
            return Err(RepoError::invalid_input(context, "entity has no soft-delete column"));
        };

        let mut assignments = if changes.is_empty() {
            Vec::new()
        } else {
            changes.resolve::<E>(&context)?
        };
        assignments.retain(|(column, _)| *column != deleted_at);
        self.touch(&mut assignments, changes);
        assignments.push((deleted_at.clone(), Value::from(Utc::now())));

        let key = self.model_key(model, &context)?;
        let mut filter = self.key_filter(key);
        filter.push_str(&format!(" AND {} IS NULL", quote_ident(&self.qualified(&deleted_at))));

        let updated = self.execute(self.update_sql(assignments, filter), context.clone()).await?;
        if updated == 0 {
            return Err(RepoError::not_found(context));
        }
        Ok(())
    }

    pub async fn delete(&self, model: &E::Model, hard: bool) -> Result<u64, RepoError> {
        let context = format!("delete from `{}`", self.table);
        let key = self.model_key(model, &context)?;
        self.remove(self.key_filter(key), hard, context).await
    }

    pub async fn delete_by_id(&self, id: PrimaryKeyOf<E>, hard: bool) -> Result<u64, RepoError> {
        let context = format!("delete from `{}` by id", self.table);
        self.remove(self.key_filter(id.into()), hard, context).await
    }

    pub async fn delete_where(&self, expr: RawSql) -> Result<u64, RepoError> {
        let context = format!("delete from `{}` where", self.table);
        self.remove(expr, false, context).await
    }

    pub async fn delete_all(&self) -> Result<u64, RepoError> {
        let context = format!("delete all from `{}`", self.table);
        self.remove(RawSql::new("1 = 1"), false, context).await
    }

    pub async fn delete_many(&self, models: &[E::Model]) -> Result<u64, RepoError> {
        let context = format!("delete many from `{}`", self.table);
        let mut keys = Vec::with_capacity(models.len());
        for model in models {
            keys.push(self.model_key(model, &context)?);
        }
        self.remove_keys(keys, context).await
    }

    pub async fn delete_many_by_ids<I>(&self, ids: I) -> Result<u64, RepoError>
    where
        I: IntoIterator<Item = PrimaryKeyOf<E>>,
    {
        let context = format!("delete many from `{}` by id", self.table);
        self.remove_keys(ids.into_iter().map(Into::into).collect(), context)
            .await
    }

    async fn remove_keys(&self, keys: Vec<Value>, context: String) -> Result<u64, RepoError> {
        if keys.is_empty() {
            return Ok(0);
        }
        let filter = RawSql::new(format!(
            "{} IN ?",
            quote_ident(&self.qualified(&self.primary_key))
        ))
        .bind_list(keys);
        self.remove(filter, false, context).await
    }

    /// Soft delete unless `hard`, the handle is unscoped, or the entity has
    /// no soft-delete column.
    async fn remove(&self, filter: RawSql, hard: bool, context: String) -> Result<u64, RepoError> {
        let soft = match (&self.soft_delete, hard || self.state.unscoped) {
            (Some(column), false) => Some(column.clone()),
            _ => None,
        };

        let sql = match soft {
            Some(column) => {
                let mut predicate = filter.parenthesized();
                predicate.push_str(&format!(" AND {} IS NULL", quote_ident(&self.qualified(&column))));
                let mut assignments = vec![(column, Value::from(Utc::now()))];
                if let Some(updated_at) = column_by_name::<E>(UPDATED_AT_COLUMN) {
                    assignments.push((updated_at.as_str().to_string(), Value::from(Utc::now())));
                }
                self.update_sql(assignments, predicate)
            }
            None => {
                let mut sql = RawSql::new(format!("DELETE FROM {} WHERE ", quote_ident(&self.table)));
                sql.append(filter);
                sql
            }
        };
        self.execute(sql, context).await
    }

    // ===== Statement helpers =====

    fn key_column(&self, context: &str) -> Result<E::Column, RepoError> {
        primary_key_column::<E>()
            .ok_or_else(|| RepoError::invalid_input(context, "entity has no primary key"))
    }

    fn model_key(&self, model: &E::Model, context: &str) -> Result<Value, RepoError> {
        let column = self.key_column(context)?;
        let key = model.get(column);
        if is_null_or_empty(&key) {
            return Err(RepoError::invalid_input(context, "model has no primary key value"));
        }
        Ok(key)
    }

    fn key_filter(&self, key: Value) -> RawSql {
        RawSql::new(format!(
            "{} = ?",
            quote_ident(&self.qualified(&self.primary_key))
        ))
        .bind(key)
    }

    /// Refresh `updated_at` unless the caller set it explicitly.
    fn touch(&self, assignments: &mut Vec<(String, Value)>, changes: &UpdateMap) {
        if let Some(column) = column_by_name::<E>(UPDATED_AT_COLUMN) {
            if !changes.contains(UPDATED_AT_COLUMN) {
                assignments.push((column.as_str().to_string(), Value::from(Utc::now())));
            }
        }
    }

    fn columns(&self, names: &[&str], context: &str) -> Result<Vec<E::Column>, RepoError> {
        names
            .iter()
            .map(|name| {
                column_by_name::<E>(name).ok_or_else(|| {
                    RepoError::invalid_input(context, format!("unknown column `{name}`"))
                })
            })
            .collect()
    }

    fn update_sql(&self, assignments: Vec<(String, Value)>, filter: RawSql) -> RawSql {
        let sets = assignments
            .into_iter()
            .map(|(column, value)| RawSql::new(format!("{} = ?", quote_ident(&column))).bind(value));
        let mut sql = RawSql::new(format!("UPDATE {} SET ", quote_ident(&self.table)));
        sql.append(RawSql::join(sets, ", "));
        sql.push_str(" WHERE ");
        sql.append(filter);
        sql
    }

    async fn reload(&self, key: Value, context: &str) -> Result<E::Model, RepoError> {
        self.base_query()
            .unscoped()
            .where_eq(&self.qualified(&self.primary_key), key)
            .first()
            .await
            .map_err(|e| self.rename_not_found(e, || context.to_string()))
    }

    async fn execute(&self, sql: RawSql, context: String) -> Result<u64, RepoError> {
        let stmt = sql.to_statement(self.session.backend());
        tracing::debug!(table = %self.table, sql = %stmt.sql, "executing statement");
        let result = guarded(self.state.cancel.as_ref(), context, self.session.conn().execute(stmt)).await?;
        Ok(result.rows_affected())
    }
}

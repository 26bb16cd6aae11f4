//! Query execution

use super::builder::QueryBuilder;
use super::raw::RawSql;
use crate::error::RepoError;
use crate::pagination::{page_offset, Paginated};
use crate::session::{guarded, Session};
use sea_orm::{EntityTrait, FromQueryResult};
use serde_json::Value as JsonValue;

#[derive(Debug, FromQueryResult)]
struct CountRow {
    count: i64,
}

impl<E: EntityTrait, S: Session> QueryBuilder<E, S> {
    pub async fn all(self) -> Result<Vec<E::Model>, RepoError> {
        self.all_as::<E::Model>().await
    }

    /// Decode rows into any `FromQueryResult` type, e.g. a struct carrying
    /// aggregate aliases.
    pub async fn all_as<M: FromQueryResult>(self) -> Result<Vec<M>, RepoError> {
        let sql = self.rows_sql(None);
        self.fetch_rows(sql, "fetch rows").await
    }

    pub async fn all_json(self) -> Result<Vec<JsonValue>, RepoError> {
        self.all_as::<JsonValue>().await
    }

    /// First row, ordered by primary key unless an order was given.
    pub async fn first(self) -> Result<E::Model, RepoError> {
        self.first_as::<E::Model>().await
    }

    pub async fn first_as<M: FromQueryResult>(self) -> Result<M, RepoError> {
        let sql = self.first_sql();
        self.fetch_rows::<M>(sql, "fetch first row")
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| RepoError::not_found(format!("fetch first row in `{}`", self.base_table)))
    }

    pub async fn first_json(self) -> Result<JsonValue, RepoError> {
        self.first_as::<JsonValue>().await
    }

    pub async fn count(self) -> Result<u64, RepoError> {
        self.run_count().await
    }

    pub async fn exists(self) -> Result<bool, RepoError> {
        Ok(self.run_count().await? > 0)
    }

    /// Count the matching rows, then fetch the requested page.
    pub async fn paginate(self) -> Result<Paginated<E::Model>, RepoError> {
        self.paginate_as::<E::Model>().await
    }

    pub async fn paginate_as<M: FromQueryResult>(self) -> Result<Paginated<M>, RepoError> {
        let (page, limit) = self.page_window();
        let total = self.run_count().await?;
        let sql = self.rows_sql(Some((limit, page_offset(page, limit))));
        let items = self.fetch_rows::<M>(sql, "fetch page").await?;
        Ok(Paginated::new(items, total, page, limit))
    }

    pub async fn paginate_json(self) -> Result<Paginated<JsonValue>, RepoError> {
        self.paginate_as::<JsonValue>().await
    }

    async fn run_count(&self) -> Result<u64, RepoError> {
        let sql = self.count_sql();
        let row = self
            .fetch_rows::<CountRow>(sql, "count rows")
            .await?
            .into_iter()
            .next();
        Ok(row.map_or(0, |r| u64::try_from(r.count).unwrap_or(0)))
    }

    async fn fetch_rows<M: FromQueryResult>(
        &self,
        sql: RawSql,
        operation: &str,
    ) -> Result<Vec<M>, RepoError> {
        let stmt = sql.to_statement(self.session.backend());
        tracing::debug!(table = %self.base_table, sql = %stmt.sql, "{}", operation);
        let context = format!("{operation} in `{}`", self.base_table);
        guarded(
            self.cancel.as_ref(),
            context,
            M::find_by_statement(stmt).all(self.session.conn()),
        )
        .await
    }
}

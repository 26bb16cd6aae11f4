//! Fluent SELECT builder bound to one entity's table

use super::conditions::{Conditions, Connector, Filterable, Operand, Operator};
use super::joins::{JoinClause, JoinCondition, JoinType};
use super::raw::{quote_ident, RawSql, Term};
use crate::entity::{primary_key_name, soft_delete_column, table_name};
use crate::pagination::{
    page_offset, PageDefaults, PageParams, PageRequest, SortOrder, DEFAULT_PAGE_LIMIT,
};
use crate::session::Session;
use sea_orm::{DbBackend, EntityTrait, IdenStatic, Statement, Value};
use std::collections::HashSet;
use std::marker::PhantomData;
use tokio_util::sync::CancellationToken;

/// Builds and runs one SELECT against `E`'s table.
///
/// Each call consumes the builder and hands it back; executing it consumes
/// it for good, so a builder serves exactly one query.
///
/// ```ignore
/// let teams = team_repo
///     .query()
///     .join("team_members")
///     .on("id", "team_id")
///     .where_eq("team_members.user_id", user_id)
///     .select(["teams.*"])
///     .select_as(Sql::count("team_members.user_id"), "member_count")
///     .group_by(["teams.id"])
///     .with_page_params(&params)
///     .paginate_as::<TeamRow>()
///     .await?;
/// ```
pub struct QueryBuilder<E: EntityTrait, S: Session> {
    pub(crate) session: S,
    pub(crate) base_table: String,
    pub(crate) primary_key: String,
    pub(crate) soft_delete: Option<String>,
    pub(crate) scoped: bool,
    pub(crate) cancel: Option<CancellationToken>,
    select: Vec<RawSql>,
    distinct: bool,
    wheres: Conditions,
    joins: Vec<JoinClause>,
    group_by: Vec<String>,
    having: Conditions,
    order_by: Vec<String>,
    known_aliases: HashSet<String>,
    limit: Option<u64>,
    offset: Option<u64>,
    pub(crate) paging: Option<(u64, u64)>,
    _entity: PhantomData<fn() -> E>,
}

impl<E: EntityTrait, S: Session> Clone for QueryBuilder<E, S> {
    fn clone(&self) -> Self {
        Self {
            session: self.session.clone(),
            base_table: self.base_table.clone(),
            primary_key: self.primary_key.clone(),
            soft_delete: self.soft_delete.clone(),
            scoped: self.scoped,
            cancel: self.cancel.clone(),
            select: self.select.clone(),
            distinct: self.distinct,
            wheres: self.wheres.clone(),
            joins: self.joins.clone(),
            group_by: self.group_by.clone(),
            having: self.having.clone(),
            order_by: self.order_by.clone(),
            known_aliases: self.known_aliases.clone(),
            limit: self.limit,
            offset: self.offset,
            paging: self.paging,
            _entity: PhantomData,
        }
    }
}

impl<E: EntityTrait, S: Session> Filterable for QueryBuilder<E, S> {
    fn conditions_mut(&mut self) -> &mut Conditions {
        &mut self.wheres
    }
}

impl<E: EntityTrait, S: Session> QueryBuilder<E, S> {
    pub fn new(session: S) -> Self {
        Self {
            session,
            base_table: table_name::<E>(),
            primary_key: primary_key_name::<E>(),
            soft_delete: soft_delete_column::<E>().map(|c| c.as_str().to_string()),
            scoped: true,
            cancel: None,
            select: Vec::new(),
            distinct: false,
            wheres: Conditions::new(),
            joins: Vec::new(),
            group_by: Vec::new(),
            having: Conditions::new(),
            order_by: Vec::new(),
            known_aliases: HashSet::new(),
            limit: None,
            offset: None,
            paging: None,
            _entity: PhantomData,
        }
    }

    pub fn table_name(&self) -> &str {
        &self.base_table
    }

    /// Include soft-deleted rows.
    pub fn unscoped(mut self) -> Self {
        self.scoped = false;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    // ===== Selection =====

    pub fn select<I, C>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: AsRef<str>,
    {
        for column in columns {
            self.select.push(RawSql::new(quote_ident(column.as_ref())));
        }
        self
    }

    /// Select an expression under an alias; the alias becomes usable
    /// unqualified in ORDER BY and HAVING.
    pub fn select_as(mut self, expr: impl Into<Term>, alias: &str) -> Self {
        let mut sql = expr.into().into_sql();
        sql.push_str(&format!(" AS {}", quote_ident(alias)));
        self.select.push(sql);
        self.known_aliases.insert(alias.to_string());
        self
    }

    pub fn select_raw(mut self, expr: RawSql) -> Self {
        self.select.push(expr);
        self
    }

    pub fn distinct<I, C>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: AsRef<str>,
    {
        self.distinct = true;
        self.select(columns)
    }

    // ===== Joins =====

    pub fn join(self, table: &str) -> Self {
        self.add_join(JoinType::Inner, table, None)
    }

    pub fn join_as(self, table: &str, alias: &str) -> Self {
        self.add_join(JoinType::Inner, table, Some(alias))
    }

    pub fn left_join(self, table: &str) -> Self {
        self.add_join(JoinType::Left, table, None)
    }

    pub fn left_join_as(self, table: &str, alias: &str) -> Self {
        self.add_join(JoinType::Left, table, Some(alias))
    }

    pub fn right_join(self, table: &str) -> Self {
        self.add_join(JoinType::Right, table, None)
    }

    pub fn right_join_as(self, table: &str, alias: &str) -> Self {
        self.add_join(JoinType::Right, table, Some(alias))
    }

    pub fn cross_join(self, table: &str) -> Self {
        self.add_join(JoinType::Cross, table, None)
    }

    pub fn cross_join_as(self, table: &str, alias: &str) -> Self {
        self.add_join(JoinType::Cross, table, Some(alias))
    }

    fn add_join(mut self, join_type: JoinType, table: &str, alias: Option<&str>) -> Self {
        let clause = JoinClause::new(join_type, &self.base_table, table, alias);
        if let Some(alias) = alias {
            self.known_aliases.insert(alias.to_string());
        }
        self.joins.push(clause);
        self
    }

    /// Equality condition on the most recent join.
    ///
    /// # Panics
    ///
    /// Panics if no join has been registered; that is a caller bug.
    pub fn on(self, left: impl Into<Term>, right: impl Into<Term>) -> Self {
        let (left, right) = (left.into(), right.into());
        self.on_group(move |condition| {
            condition.on(left, Operator::Eq, right);
        })
    }

    /// Build the most recent join's condition in a closure.
    ///
    /// # Panics
    ///
    /// Panics if no join has been registered; that is a caller bug.
    pub fn on_group(mut self, build: impl FnOnce(&mut JoinCondition)) -> Self {
        let Some(clause) = self.joins.last_mut() else {
            panic!("no join to apply condition to on `{}`", self.base_table);
        };
        build(&mut clause.condition);
        self
    }

    // ===== Grouping =====

    pub fn group_by<I, C>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: AsRef<str>,
    {
        self.group_by
            .extend(columns.into_iter().map(|c| quote_ident(c.as_ref())));
        self
    }

    pub fn having(mut self, column: &str, op: Operator, operand: impl Into<Operand>) -> Self {
        self.having.add(Connector::And, column, op, operand.into());
        self
    }

    pub fn or_having(mut self, column: &str, op: Operator, operand: impl Into<Operand>) -> Self {
        self.having.add(Connector::Or, column, op, operand.into());
        self
    }

    pub fn having_eq(self, column: &str, value: impl Into<Operand>) -> Self {
        self.having(column, Operator::Eq, value)
    }

    pub fn having_not_eq(self, column: &str, value: impl Into<Operand>) -> Self {
        self.having(column, Operator::NotEq, value)
    }

    pub fn having_gt(self, column: &str, value: impl Into<Operand>) -> Self {
        self.having(column, Operator::Gt, value)
    }

    pub fn having_gte(self, column: &str, value: impl Into<Operand>) -> Self {
        self.having(column, Operator::Gte, value)
    }

    pub fn having_lt(self, column: &str, value: impl Into<Operand>) -> Self {
        self.having(column, Operator::Lt, value)
    }

    pub fn having_lte(self, column: &str, value: impl Into<Operand>) -> Self {
        self.having(column, Operator::Lte, value)
    }

    pub fn having_in<I, V>(self, column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.having(column, Operator::In, Operand::list(values))
    }

    pub fn having_between(self, column: &str, low: impl Into<Value>, high: impl Into<Value>) -> Self {
        self.having(column, Operator::Between, Operand::List(vec![low.into(), high.into()]))
    }

    pub fn having_raw(mut self, expr: RawSql) -> Self {
        self.having.push(Connector::And, expr);
        self
    }

    pub fn having_group(mut self, build: impl FnOnce(Conditions) -> Conditions) -> Self {
        self.having.add_group(Connector::And, build(Conditions::new()));
        self
    }

    pub fn or_having_group(mut self, build: impl FnOnce(Conditions) -> Conditions) -> Self {
        self.having.add_group(Connector::Or, build(Conditions::new()));
        self
    }

    // ===== Ordering and windows =====

    pub fn order_asc(mut self, column: &str) -> Self {
        let column = self.resolve_sort_column(column);
        self.order_by.push(format!("{column} ASC"));
        self
    }

    pub fn order_desc(mut self, column: &str) -> Self {
        let column = self.resolve_sort_column(column);
        self.order_by.push(format!("{column} DESC"));
        self
    }

    pub fn order_raw(mut self, expr: &str) -> Self {
        self.order_by.push(expr.to_string());
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Page window for [`paginate`](Self::paginate). `page < 1` becomes 1 and
    /// `limit <= 0` becomes the default limit.
    pub fn page(mut self, page: i64, limit: i64) -> Self {
        let req = PageParams::new(page, limit).resolve(&PageDefaults::default());
        self.paging = Some((req.page, req.limit));
        self
    }

    pub fn with_page_params(self, params: &PageParams) -> Self {
        let req = params.resolve(&PageDefaults::default());
        self.with_page_request(req)
    }

    /// Apply a normalized page request, replacing any previous ordering.
    pub fn with_page_request(mut self, req: PageRequest) -> Self {
        self.order_by.clear();
        for (field, order) in req.sort_fields() {
            let column = self.resolve_sort_column(&field);
            self.order_by.push(format!("{column} {}", order.as_sql()));
        }
        self.paging = Some((req.page, req.limit));
        self
    }

    /// Qualify a bare sort field with the base table unless it names an
    /// alias introduced by this query.
    fn resolve_sort_column(&self, field: &str) -> String {
        let field = field.trim();
        if field.contains('.') || field.contains('(') || self.known_aliases.contains(field) {
            quote_ident(field)
        } else {
            quote_ident(&format!("{}.{}", self.base_table, field))
        }
    }

    // ===== SQL generation =====

    pub(crate) fn scope_sql(&self) -> Option<RawSql> {
        match (&self.soft_delete, self.scoped) {
            (Some(column), true) => Some(RawSql::new(format!(
                "{} IS NULL",
                quote_ident(&format!("{}.{}", self.base_table, column))
            ))),
            _ => None,
        }
    }

    /// The WHERE body: soft-delete scope ANDed with the caller's predicate.
    pub(crate) fn where_sql(&self) -> Option<RawSql> {
        let user = self.wheres.to_sql().map(|sql| {
            if self.wheres.len() > 1 {
                sql.parenthesized()
            } else {
                sql
            }
        });
        match (self.scope_sql(), user) {
            (Some(scope), Some(user)) => Some(RawSql::join([scope, user], " AND ")),
            (scope, user) => scope.or(user),
        }
    }

    /// SELECT ... HAVING, without ORDER BY or LIMIT.
    fn select_sql(&self) -> RawSql {
        let mut sql = RawSql::new(if self.distinct {
            "SELECT DISTINCT "
        } else {
            "SELECT "
        });

        if self.select.is_empty() {
            sql.push_str(&quote_ident(&format!("{}.*", self.base_table)));
        } else {
            sql.append(RawSql::join(self.select.iter().cloned(), ", "));
        }

        sql.push_str(&format!(" FROM {}", quote_ident(&self.base_table)));
        for join in &self.joins {
            sql.append(join.to_sql());
        }
        if let Some(predicate) = self.where_sql() {
            sql.push_str(" WHERE ");
            sql.append(predicate);
        }
        if !self.group_by.is_empty() {
            sql.push_str(&format!(" GROUP BY {}", self.group_by.join(", ")));
        }
        if let Some(having) = self.having.to_sql() {
            sql.push_str(" HAVING ");
            sql.append(having);
        }
        sql
    }

    /// Row query with ordering and an optional `(limit, offset)` window.
    pub(crate) fn rows_sql(&self, window: Option<(u64, u64)>) -> RawSql {
        let mut sql = self.select_sql();
        if !self.order_by.is_empty() {
            sql.push_str(&format!(" ORDER BY {}", self.order_by.join(", ")));
        }
        let (limit, offset) = match window {
            Some((limit, offset)) => (Some(limit), Some(offset)),
            None => (self.limit, self.offset),
        };
        match (limit, offset) {
            (Some(limit), Some(offset)) => sql.push_str(&format!(" LIMIT {limit} OFFSET {offset}")),
            (Some(limit), None) => sql.push_str(&format!(" LIMIT {limit}")),
            // SQLite only accepts OFFSET after a LIMIT.
            (None, Some(offset)) => match self.session.backend() {
                DbBackend::Sqlite => sql.push_str(&format!(" LIMIT -1 OFFSET {offset}")),
                _ => sql.push_str(&format!(" OFFSET {offset}")),
            },
            (None, None) => {}
        }
        sql
    }

    /// Count of the rows (or groups) the query would return, ignoring order.
    pub(crate) fn count_sql(&self) -> RawSql {
        let mut sql = RawSql::new("SELECT COUNT(*) AS \"count\" FROM (");
        sql.append(self.select_sql());
        sql.push_str(") AS \"counted\"");
        sql
    }

    pub(crate) fn first_sql(&self) -> RawSql {
        if self.order_by.is_empty() {
            let key = quote_ident(&format!("{}.{}", self.base_table, self.primary_key));
            let mut ordered = self.clone();
            ordered.order_by.push(format!("{key} {}", SortOrder::Asc.as_sql()));
            return ordered.rows_sql(Some((1, self.offset.unwrap_or(0))));
        }
        self.rows_sql(Some((1, self.offset.unwrap_or(0))))
    }

    /// Page number and limit that [`paginate`](Self::paginate) will use.
    pub(crate) fn page_window(&self) -> (u64, u64) {
        self.paging.unwrap_or((1, DEFAULT_PAGE_LIMIT))
    }

    /// The row statement as it would be executed.
    pub fn to_statement(&self) -> Statement {
        let sql = match self.paging {
            Some((page, limit)) => self.rows_sql(Some((limit, page_offset(page, limit)))),
            None => self.rows_sql(None),
        };
        sql.to_statement(self.session.backend())
    }

    /// Rendered SQL with values inlined, for logging and debugging.
    pub fn to_sql(&self) -> String {
        self.to_statement().to_string()
    }
}

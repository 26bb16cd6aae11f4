//! JOIN clauses and their ON-condition trees

use super::conditions::{Connector, Operator};
use super::raw::{quote_ident, Arg, RawSql, Term};
use sea_orm::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    Inner,
    Left,
    Right,
    Cross,
}

impl JoinType {
    pub fn as_sql(&self) -> &'static str {
        match self {
            JoinType::Inner => "INNER JOIN",
            JoinType::Left => "LEFT JOIN",
            JoinType::Right => "RIGHT JOIN",
            JoinType::Cross => "CROSS JOIN",
        }
    }
}

/// ON-condition for one join.
///
/// Unqualified column names on the left side resolve against the base
/// table, on the right side against the joined table (or its alias).
/// Dotted names are used as written. Use [`JoinCondition::bind`] to compare
/// against a bound value instead of a column.
#[derive(Debug, Clone)]
pub struct JoinCondition {
    base: String,
    joined: String,
    parts: Vec<(Connector, RawSql)>,
}

impl JoinCondition {
    pub(crate) fn new(base: impl Into<String>, joined: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            joined: joined.into(),
            parts: Vec::new(),
        }
    }

    /// A bound parameter usable as either operand.
    pub fn bind(value: impl Into<Value>) -> RawSql {
        RawSql::with_args("?", [Arg::value(value)])
    }

    /// A bound list parameter, for `IN` comparisons.
    pub fn bind_list<I, V>(values: I) -> RawSql
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        RawSql::with_args("?", [Arg::list(values)])
    }

    pub fn on(&mut self, left: impl Into<Term>, op: Operator, right: impl Into<Term>) -> &mut Self {
        self.and(left, op, right)
    }

    pub fn and(&mut self, left: impl Into<Term>, op: Operator, right: impl Into<Term>) -> &mut Self {
        self.compare(Connector::And, left.into(), op, right.into());
        self
    }

    pub fn or(&mut self, left: impl Into<Term>, op: Operator, right: impl Into<Term>) -> &mut Self {
        self.compare(Connector::Or, left.into(), op, right.into());
        self
    }

    pub fn and_null(&mut self, column: &str) -> &mut Self {
        let column = self.side(Term::from(column), &self.joined.clone());
        self.push(Connector::And, RawSql::new(format!("{} IS NULL", column.sql())));
        self
    }

    pub fn and_not_null(&mut self, column: &str) -> &mut Self {
        let column = self.side(Term::from(column), &self.joined.clone());
        self.push(Connector::And, RawSql::new(format!("{} IS NOT NULL", column.sql())));
        self
    }

    pub fn raw(&mut self, expr: RawSql) -> &mut Self {
        self.push(Connector::And, expr.parenthesized());
        self
    }

    /// AND a parenthesized sub-condition.
    pub fn group(&mut self, build: impl FnOnce(&mut JoinCondition)) -> &mut Self {
        let mut group = JoinCondition::new(self.base.clone(), self.joined.clone());
        build(&mut group);
        if let Some(sql) = group.to_sql() {
            self.push(Connector::And, sql.parenthesized());
        }
        self
    }

    fn compare(&mut self, connector: Connector, left: Term, op: Operator, right: Term) {
        let base = self.base.clone();
        let joined = self.joined.clone();
        let mut fragment = self.side(left, &base);

        match op {
            Operator::IsNull | Operator::IsNotNull => {
                fragment.push_str(&format!(" {}", op.as_sql()));
            }
            Operator::Between => {
                tracing::error!("BETWEEN is not supported in join conditions; condition ignored");
                return;
            }
            _ => {
                fragment.push_str(&format!(" {} ", op.as_sql()));
                fragment.append(self.side(right, &joined));
            }
        }
        self.push(connector, fragment);
    }

    fn side(&self, term: Term, default_table: &str) -> RawSql {
        match term {
            Term::Column(name) if name.contains('.') => RawSql::new(quote_ident(&name)),
            Term::Column(name) => RawSql::new(quote_ident(&format!("{default_table}.{name}"))),
            Term::Raw(raw) => raw,
        }
    }

    fn push(&mut self, connector: Connector, fragment: RawSql) {
        self.parts.push((connector, fragment));
    }

    pub(crate) fn to_sql(&self) -> Option<RawSql> {
        let mut parts = self.parts.iter();
        let (_, first) = parts.next()?;
        let mut out = first.clone();
        for (connector, fragment) in parts {
            out.push_str(match connector {
                Connector::And => " AND ",
                Connector::Or => " OR ",
            });
            out.append(fragment.clone());
        }
        Some(out)
    }
}

/// A registered join: type, table, optional alias and condition.
#[derive(Debug, Clone)]
pub struct JoinClause {
    pub join_type: JoinType,
    pub table: String,
    pub alias: Option<String>,
    pub condition: JoinCondition,
}

impl JoinClause {
    pub(crate) fn new(join_type: JoinType, base: &str, table: &str, alias: Option<&str>) -> Self {
        let target = alias.unwrap_or(table);
        Self {
            join_type,
            table: table.to_string(),
            alias: alias.map(str::to_string),
            condition: JoinCondition::new(base, target),
        }
    }

    /// Name other clauses use to refer to this join.
    pub fn reference(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.table)
    }

    pub(crate) fn to_sql(&self) -> RawSql {
        let mut out = RawSql::new(format!(" {} {}", self.join_type.as_sql(), quote_ident(&self.table)));
        if let Some(alias) = &self.alias {
            out.push_str(&format!(" AS {}", quote_ident(alias)));
        }
        if let Some(condition) = self.condition.to_sql() {
            out.push_str(" ON ");
            out.append(condition);
        }
        out
    }
}

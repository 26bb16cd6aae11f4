//! WHERE / HAVING predicate construction

use super::raw::{quote_ident, Arg, RawSql};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use sea_orm::Value;

/// Comparison operators accepted by the builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    NotEq,
    Lt,
    Lte,
    Gt,
    Gte,
    In,
    NotIn,
    Between,
    IsNull,
    IsNotNull,
    Like,
}

impl Operator {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::NotEq => "<>",
            Operator::Lt => "<",
            Operator::Lte => "<=",
            Operator::Gt => ">",
            Operator::Gte => ">=",
            Operator::In => "IN",
            Operator::NotIn => "NOT IN",
            Operator::Between => "BETWEEN",
            Operator::IsNull => "IS NULL",
            Operator::IsNotNull => "IS NOT NULL",
            Operator::Like => "LIKE",
        }
    }
}

/// Right-hand side of a comparison.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// Bound as a single parameter.
    Value(Value),
    /// Bound as a list parameter (IN / BETWEEN).
    List(Vec<Value>),
    /// Spliced as SQL text with its own parameters.
    Raw(RawSql),
}

impl Operand {
    pub fn list<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self::List(values.into_iter().map(Into::into).collect())
    }
}

impl From<RawSql> for Operand {
    fn from(raw: RawSql) -> Self {
        Self::Raw(raw)
    }
}

impl From<Value> for Operand {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl From<Vec<Value>> for Operand {
    fn from(values: Vec<Value>) -> Self {
        Self::List(values)
    }
}

macro_rules! operand_from_scalar {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Operand {
                fn from(value: $ty) -> Self {
                    Self::Value(value.into())
                }
            }
        )*
    };
}

operand_from_scalar!(
    bool,
    i8,
    i16,
    i32,
    i64,
    u8,
    u16,
    u32,
    u64,
    f32,
    f64,
    String,
    &str,
    DateTime<Utc>,
    NaiveDate,
    NaiveDateTime,
    serde_json::Value,
);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Connector {
    And,
    Or,
}

impl Connector {
    fn as_sql(&self) -> &'static str {
        match self {
            Connector::And => " AND ",
            Connector::Or => " OR ",
        }
    }
}

/// An ordered list of predicates joined by AND/OR.
///
/// Also the isolated sub-builder handed to group closures: a group starts
/// from an empty `Conditions` and is spliced back as one parenthesized unit.
#[derive(Debug, Clone, Default)]
pub struct Conditions {
    parts: Vec<(Connector, RawSql)>,
}

impl Conditions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub(crate) fn push(&mut self, connector: Connector, fragment: RawSql) {
        if !fragment.is_empty() {
            self.parts.push((connector, fragment));
        }
    }

    pub(crate) fn add(&mut self, connector: Connector, column: &str, op: Operator, operand: Operand) {
        if let Some(fragment) = comparison(column, op, operand) {
            self.push(connector, fragment);
        }
    }

    pub(crate) fn add_group(&mut self, connector: Connector, group: Conditions) {
        if let Some(fragment) = group.to_sql() {
            self.push(connector, fragment.parenthesized());
        }
    }

    /// Render as `a AND b OR c`, or `None` when empty.
    pub fn to_sql(&self) -> Option<RawSql> {
        let mut parts = self.parts.iter();
        let (_, first) = parts.next()?;
        let mut out = first.clone();
        for (connector, fragment) in parts {
            out.push_str(connector.as_sql());
            out.append(fragment.clone());
        }
        Some(out)
    }
}

/// Build a single comparison, or `None` when the operand cannot satisfy
/// the operator (logged).
pub(crate) fn comparison(column: &str, op: Operator, operand: Operand) -> Option<RawSql> {
    let column = quote_ident(column);

    match op {
        Operator::IsNull | Operator::IsNotNull => {
            return Some(RawSql::new(format!("{column} {}", op.as_sql())));
        }
        Operator::Between => {
            return match operand {
                Operand::List(values) if values.len() == 2 => Some(RawSql::with_args(
                    format!("{column} BETWEEN ? AND ?"),
                    values.into_iter().map(Arg::Value),
                )),
                other => {
                    tracing::error!(
                        column = %column,
                        operand = ?other,
                        "BETWEEN requires exactly two values; condition ignored"
                    );
                    None
                }
            };
        }
        _ => {}
    }

    match operand {
        Operand::Raw(raw) => {
            let (sql, args) = (raw.sql().to_string(), raw.args().to_vec());
            Some(RawSql::with_args(format!("{column} {} {sql}", op.as_sql()), args))
        }
        // Nothing is in an empty list, everything is outside it.
        Operand::List(values) if values.is_empty() && op == Operator::In => {
            Some(RawSql::new("1 = 0"))
        }
        Operand::List(values) if values.is_empty() && op == Operator::NotIn => {
            Some(RawSql::new("1 = 1"))
        }
        Operand::List(values) if matches!(op, Operator::In | Operator::NotIn) => Some(
            RawSql::with_args(format!("{column} {} ?", op.as_sql()), [Arg::List(values)]),
        ),
        Operand::Value(value) if matches!(op, Operator::In | Operator::NotIn) => Some(
            RawSql::with_args(format!("{column} {} ?", op.as_sql()), [Arg::List(vec![value])]),
        ),
        Operand::Value(value) => Some(RawSql::with_args(
            format!("{column} {} ?", op.as_sql()),
            [Arg::Value(value)],
        )),
        Operand::List(values) => {
            tracing::error!(
                column = %column,
                operator = op.as_sql(),
                count = values.len(),
                "list operand given to a scalar operator; condition ignored"
            );
            None
        }
    }
}

/// Fluent predicate methods shared by the query builder and condition groups.
///
/// Every method consumes and returns the receiver.
pub trait Filterable: Sized {
    fn conditions_mut(&mut self) -> &mut Conditions;

    fn where_op(mut self, column: &str, op: Operator, operand: impl Into<Operand>) -> Self {
        self.conditions_mut()
            .add(Connector::And, column, op, operand.into());
        self
    }

    fn or_where_op(mut self, column: &str, op: Operator, operand: impl Into<Operand>) -> Self {
        self.conditions_mut()
            .add(Connector::Or, column, op, operand.into());
        self
    }

    fn where_eq(self, column: &str, value: impl Into<Operand>) -> Self {
        self.where_op(column, Operator::Eq, value)
    }

    fn where_not_eq(self, column: &str, value: impl Into<Operand>) -> Self {
        self.where_op(column, Operator::NotEq, value)
    }

    fn where_lt(self, column: &str, value: impl Into<Operand>) -> Self {
        self.where_op(column, Operator::Lt, value)
    }

    fn where_lte(self, column: &str, value: impl Into<Operand>) -> Self {
        self.where_op(column, Operator::Lte, value)
    }

    fn where_gt(self, column: &str, value: impl Into<Operand>) -> Self {
        self.where_op(column, Operator::Gt, value)
    }

    fn where_gte(self, column: &str, value: impl Into<Operand>) -> Self {
        self.where_op(column, Operator::Gte, value)
    }

    fn where_like(self, column: &str, pattern: impl Into<Operand>) -> Self {
        self.where_op(column, Operator::Like, pattern)
    }

    fn where_in<I, V>(self, column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.where_op(column, Operator::In, Operand::list(values))
    }

    fn where_not_in<I, V>(self, column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.where_op(column, Operator::NotIn, Operand::list(values))
    }

    fn where_between(self, column: &str, low: impl Into<Value>, high: impl Into<Value>) -> Self {
        self.where_op(column, Operator::Between, Operand::List(vec![low.into(), high.into()]))
    }

    fn where_null(self, column: &str) -> Self {
        self.where_op(column, Operator::IsNull, Operand::List(Vec::new()))
    }

    fn where_not_null(self, column: &str) -> Self {
        self.where_op(column, Operator::IsNotNull, Operand::List(Vec::new()))
    }

    /// AND a raw fragment. It is parenthesized so its own `OR`s stay local.
    fn where_raw(mut self, expr: RawSql) -> Self {
        self.conditions_mut().push(Connector::And, expr.parenthesized());
        self
    }

    /// AND a parenthesized group built from an empty sub-builder.
    fn where_group(mut self, build: impl FnOnce(Conditions) -> Conditions) -> Self {
        let group = build(Conditions::new());
        self.conditions_mut().add_group(Connector::And, group);
        self
    }

    fn or_where_eq(self, column: &str, value: impl Into<Operand>) -> Self {
        self.or_where_op(column, Operator::Eq, value)
    }

    fn or_where_not_eq(self, column: &str, value: impl Into<Operand>) -> Self {
        self.or_where_op(column, Operator::NotEq, value)
    }

    fn or_where_lt(self, column: &str, value: impl Into<Operand>) -> Self {
        self.or_where_op(column, Operator::Lt, value)
    }

    fn or_where_lte(self, column: &str, value: impl Into<Operand>) -> Self {
        self.or_where_op(column, Operator::Lte, value)
    }

    fn or_where_gt(self, column: &str, value: impl Into<Operand>) -> Self {
        self.or_where_op(column, Operator::Gt, value)
    }

    fn or_where_gte(self, column: &str, value: impl Into<Operand>) -> Self {
        self.or_where_op(column, Operator::Gte, value)
    }

    fn or_where_like(self, column: &str, pattern: impl Into<Operand>) -> Self {
        self.or_where_op(column, Operator::Like, pattern)
    }

    fn or_where_in<I, V>(self, column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.or_where_op(column, Operator::In, Operand::list(values))
    }

    fn or_where_not_in<I, V>(self, column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.or_where_op(column, Operator::NotIn, Operand::list(values))
    }

    fn or_where_between(self, column: &str, low: impl Into<Value>, high: impl Into<Value>) -> Self {
        self.or_where_op(column, Operator::Between, Operand::List(vec![low.into(), high.into()]))
    }

    fn or_where_null(self, column: &str) -> Self {
        self.or_where_op(column, Operator::IsNull, Operand::List(Vec::new()))
    }

    fn or_where_not_null(self, column: &str) -> Self {
        self.or_where_op(column, Operator::IsNotNull, Operand::List(Vec::new()))
    }

    fn or_where_raw(mut self, expr: RawSql) -> Self {
        self.conditions_mut().push(Connector::Or, expr.parenthesized());
        self
    }

    fn or_where_group(mut self, build: impl FnOnce(Conditions) -> Conditions) -> Self {
        let group = build(Conditions::new());
        self.conditions_mut().add_group(Connector::Or, group);
        self
    }
}

impl Filterable for Conditions {
    fn conditions_mut(&mut self) -> &mut Conditions {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sql(c: &Conditions) -> String {
        c.to_sql().map(|r| r.sql().to_string()).unwrap_or_default()
    }

    #[test]
    fn scalar_comparisons_bind_one_parameter() {
        let c = Conditions::new().where_eq("teams.slug", "acme").where_gt("score", 3);
        assert_eq!(sql(&c), r#""teams"."slug" = ? AND "score" > ?"#);
        assert_eq!(c.to_sql().map(|r| r.args().len()), Some(2));
    }

    #[test]
    fn null_checks_bind_nothing() {
        let c = Conditions::new().where_null("deleted_at").or_where_not_null("owner_id");
        assert_eq!(sql(&c), r#""deleted_at" IS NULL OR "owner_id" IS NOT NULL"#);
        assert_eq!(c.to_sql().map(|r| r.args().len()), Some(0));
    }

    #[test]
    fn in_wraps_a_single_list_parameter() {
        let c = Conditions::new().where_in("role", ["owner", "admin"]);
        let raw = c.to_sql().unwrap();
        assert_eq!(raw.sql(), r#""role" IN ?"#);
        assert!(matches!(raw.args(), [Arg::List(v)] if v.len() == 2));
    }

    #[test]
    fn empty_lists_become_constant_predicates() {
        let c = Conditions::new().where_in("role", Vec::<String>::new());
        assert_eq!(sql(&c), "1 = 0");
        let c = Conditions::new()
            .where_eq("team_id", "t1")
            .where_not_in("user_id", Vec::<String>::new());
        assert_eq!(sql(&c), r#""team_id" = ? AND 1 = 1"#);
    }

    #[test]
    fn malformed_between_is_a_no_op() {
        let c = Conditions::new()
            .where_op("score", Operator::Between, Operand::list([1]))
            .where_eq("name", "x");
        assert_eq!(sql(&c), r#""name" = ?"#);

        let c = Conditions::new().where_between("score", 1, 5);
        assert_eq!(sql(&c), r#""score" BETWEEN ? AND ?"#);
    }

    #[test]
    fn raw_operand_is_spliced() {
        let c = Conditions::new().where_op(
            "expires_at",
            Operator::Gt,
            RawSql::new("CURRENT_TIMESTAMP"),
        );
        assert_eq!(sql(&c), r#""expires_at" > CURRENT_TIMESTAMP"#);
    }

    #[test]
    fn groups_are_parenthesized() {
        let c = Conditions::new()
            .where_group(|g| g.where_eq("a", 1).where_eq("b", 2))
            .or_where_eq("c", 3);
        assert_eq!(sql(&c), r#"("a" = ? AND "b" = ?) OR "c" = ?"#);
    }

    #[test]
    fn raw_fragments_keep_their_ors_local() {
        let c = Conditions::new()
            .where_raw(RawSql::new("a = ? OR b = ?").bind(1).bind(2))
            .where_eq("c", 3);
        assert_eq!(sql(&c), r#"(a = ? OR b = ?) AND "c" = ?"#);
    }

    #[test]
    fn empty_group_adds_nothing() {
        let c = Conditions::new().where_group(|g| g).where_eq("a", 1);
        assert_eq!(sql(&c), r#""a" = ?"#);
    }
}

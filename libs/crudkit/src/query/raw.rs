//! Raw SQL fragments, identifier quoting and placeholder rendering
//!
//! Fragments are written with `?` placeholders regardless of backend and
//! rendered to the backend's syntax only when a statement is built.

use sea_orm::{DbBackend, Statement, Value};

/// A positional argument of a raw fragment.
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    Value(Value),
    /// Expands to `v1, v2, ...` (parenthesized unless already inside parens).
    List(Vec<Value>),
}

impl Arg {
    pub fn value(value: impl Into<Value>) -> Self {
        Self::Value(value.into())
    }

    pub fn list<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self::List(values.into_iter().map(Into::into).collect())
    }
}

/// SQL text paired with its positional arguments.
///
/// Used both for trusted expressions the builder splices verbatim and for
/// fragments assembled internally. Arguments beyond the number of `?`
/// placeholders are dropped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawSql {
    sql: String,
    args: Vec<Arg>,
}

impl RawSql {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            args: Vec::new(),
        }
    }

    pub fn with_args(sql: impl Into<String>, args: impl IntoIterator<Item = Arg>) -> Self {
        let sql = sql.into();
        let limit = placeholder_count(&sql);
        let args = args.into_iter().take(limit).collect();
        Self { sql, args }
    }

    /// Bind the next placeholder to `value`.
    pub fn bind(self, value: impl Into<Value>) -> Self {
        self.push_arg(Arg::value(value))
    }

    /// Bind the next placeholder to a list of values.
    pub fn bind_list<I, V>(self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.push_arg(Arg::list(values))
    }

    fn push_arg(mut self, arg: Arg) -> Self {
        if self.args.len() < placeholder_count(&self.sql) {
            self.args.push(arg);
        } else {
            tracing::debug!(sql = %self.sql, "ignoring argument beyond placeholder count");
        }
        self
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn args(&self) -> &[Arg] {
        &self.args
    }

    pub fn is_empty(&self) -> bool {
        self.sql.trim().is_empty()
    }

    pub(crate) fn push_str(&mut self, sql: &str) {
        self.sql.push_str(sql);
    }

    pub(crate) fn append(&mut self, other: RawSql) {
        self.sql.push_str(&other.sql);
        self.args.extend(other.args);
    }

    pub(crate) fn parenthesized(self) -> Self {
        if self.is_empty() {
            return self;
        }
        Self {
            sql: format!("({})", self.sql),
            args: self.args,
        }
    }

    /// Join fragments with `separator`, keeping argument order.
    pub(crate) fn join(parts: impl IntoIterator<Item = RawSql>, separator: &str) -> RawSql {
        let mut out = RawSql::default();
        for (i, part) in parts.into_iter().enumerate() {
            if i > 0 {
                out.push_str(separator);
            }
            out.append(part);
        }
        out
    }

    /// Render into a backend statement.
    pub fn to_statement(&self, backend: DbBackend) -> Statement {
        let (sql, values) = render(&self.sql, &self.args, backend);
        Statement::from_sql_and_values(backend, sql, values)
    }
}

/// Either a column reference (quoted when rendered) or a raw expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Term {
    Column(String),
    Raw(RawSql),
}

impl From<&str> for Term {
    fn from(value: &str) -> Self {
        Self::Column(value.to_string())
    }
}

impl From<String> for Term {
    fn from(value: String) -> Self {
        Self::Column(value)
    }
}

impl From<RawSql> for Term {
    fn from(value: RawSql) -> Self {
        Self::Raw(value)
    }
}

impl Term {
    pub(crate) fn into_sql(self) -> RawSql {
        match self {
            Self::Column(name) => RawSql::new(quote_ident(&name)),
            Self::Raw(raw) => raw,
        }
    }
}

/// Quote a possibly dotted identifier.
///
/// `*` and anything that looks like a function call pass through untouched,
/// as do parts that are already quoted.
pub fn quote_ident(name: &str) -> String {
    let name = name.trim();
    if name == "*" || (name.contains('(') && name.contains(')')) {
        return name.to_string();
    }
    name.split('.')
        .map(|part| {
            let part = part.trim();
            if part == "*" || is_quoted(part) {
                part.to_string()
            } else {
                format!("\"{}\"", part.replace('"', "\"\""))
            }
        })
        .collect::<Vec<_>>()
        .join(".")
}

fn is_quoted(part: &str) -> bool {
    part.len() >= 2
        && ((part.starts_with('"') && part.ends_with('"'))
            || (part.starts_with('`') && part.ends_with('`')))
}

/// Count `?` placeholders outside quoted literals and identifiers.
pub(crate) fn placeholder_count(sql: &str) -> usize {
    let mut count = 0;
    scan(sql, |_, is_placeholder| {
        if is_placeholder {
            count += 1;
        }
    });
    count
}

fn scan(sql: &str, mut visit: impl FnMut(char, bool)) {
    let mut quote: Option<char> = None;
    for c in sql.chars() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if c == '\'' || c == '"' => quote = Some(c),
            None => {}
        }
        visit(c, quote.is_none() && c == '?');
    }
}

/// Replace `?` placeholders with backend syntax and flatten list arguments.
pub(crate) fn render(sql: &str, args: &[Arg], backend: DbBackend) -> (String, Vec<Value>) {
    let mut out = String::with_capacity(sql.len() + 8);
    let mut values = Vec::with_capacity(args.len());
    let mut pending = args.iter();

    scan(sql, |c, is_placeholder| {
        if !is_placeholder {
            out.push(c);
            return;
        }
        match pending.next() {
            Some(Arg::Value(value)) => {
                values.push(value.clone());
                out.push_str(&placeholder(backend, values.len()));
            }
            Some(Arg::List(list)) => {
                let wrap = !out.trim_end().ends_with('(');
                if wrap {
                    out.push('(');
                }
                if list.is_empty() {
                    out.push_str("NULL");
                }
                for (i, value) in list.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    values.push(value.clone());
                    out.push_str(&placeholder(backend, values.len()));
                }
                if wrap {
                    out.push(')');
                }
            }
            None => out.push('?'),
        }
    });

    (out, values)
}

fn placeholder(backend: DbBackend, index: usize) -> String {
    match backend {
        DbBackend::Postgres => format!("${index}"),
        _ => "?".to_string(),
    }
}

/// Constructors for common SQL expressions.
pub struct Sql;

impl Sql {
    pub fn raw(sql: impl Into<String>) -> RawSql {
        RawSql::new(sql)
    }

    pub fn now() -> RawSql {
        RawSql::new("CURRENT_TIMESTAMP")
    }

    pub fn count(column: &str) -> RawSql {
        RawSql::new(format!("COUNT({})", quote_ident(column)))
    }

    pub fn count_distinct(column: &str) -> RawSql {
        RawSql::new(format!("COUNT(DISTINCT {})", quote_ident(column)))
    }

    pub fn sum(column: &str) -> RawSql {
        RawSql::new(format!("SUM({})", quote_ident(column)))
    }

    pub fn avg(column: &str) -> RawSql {
        RawSql::new(format!("AVG({})", quote_ident(column)))
    }

    pub fn min(column: &str) -> RawSql {
        RawSql::new(format!("MIN({})", quote_ident(column)))
    }

    pub fn max(column: &str) -> RawSql {
        RawSql::new(format!("MAX({})", quote_ident(column)))
    }

    pub fn lower(column: &str) -> RawSql {
        RawSql::new(format!("LOWER({})", quote_ident(column)))
    }

    pub fn upper(column: &str) -> RawSql {
        RawSql::new(format!("UPPER({})", quote_ident(column)))
    }

    /// `COALESCE(column, ?)` with the fallback bound.
    pub fn coalesce(column: &str, fallback: impl Into<Value>) -> RawSql {
        RawSql::new(format!("COALESCE({}, ?)", quote_ident(column))).bind(fallback)
    }

    pub fn cast(column: &str, sql_type: &str) -> RawSql {
        RawSql::new(format!(
            "CAST({} AS {})",
            quote_ident(column),
            keyword(sql_type)
        ))
    }

    /// String concatenation with the ANSI `||` operator.
    pub fn concat(columns: &[&str]) -> RawSql {
        let parts: Vec<String> = columns.iter().map(|c| quote_ident(c)).collect();
        RawSql::new(parts.join(" || "))
    }

    /// `TO_CHAR(column, ?)` (Postgres).
    pub fn date_format(column: &str, format: &str) -> RawSql {
        RawSql::new(format!("TO_CHAR({}, ?)", quote_ident(column))).bind(format.to_string())
    }

    pub fn interval(amount: i64, unit: &str) -> RawSql {
        RawSql::new(format!("INTERVAL '{} {}'", amount, keyword(unit)))
    }

    pub fn extract(field: &str, column: &str) -> RawSql {
        RawSql::new(format!(
            "EXTRACT({} FROM {})",
            keyword(field).to_uppercase(),
            quote_ident(column)
        ))
    }
}

// Type names and units are spliced as text; keep only characters that can
// appear in them.
fn keyword(input: &str) -> String {
    input
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | ' ' | '(' | ')' | ','))
        .collect()
}

//! Fluent SQL construction: conditions, joins, aggregation, execution

pub mod builder;
pub mod conditions;
mod fetch;
pub mod joins;
pub mod raw;

pub use builder::QueryBuilder;
pub use conditions::{Conditions, Filterable, Operand, Operator};
pub use joins::{JoinClause, JoinCondition, JoinType};
pub use raw::{quote_ident, Arg, RawSql, Sql, Term};

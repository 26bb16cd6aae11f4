//! Data-access toolkit for sea-orm entities.
//!
//! - [`Repository`]: CRUD with soft delete, upsert and partial updates
//! - [`QueryBuilder`]: fluent conditions, joins, grouping and ordering
//!   rendered to raw SQL with positional arguments
//! - [`Paginated`] and [`PageParams`]: pagination envelope and inputs
//! - [`new_id`]: time-ordered 26 character identifiers
//!
//! Entities opt into conventions by column name: `deleted_at` enables soft
//! delete, `created_at`/`updated_at` are filled by [`stamp`].

pub mod entity;
pub mod error;
pub mod ids;
pub mod pagination;
pub mod query;
pub mod repository;
pub mod session;
pub mod update;

pub use entity::stamp;
pub use error::{ErrorKind, RepoError};
pub use ids::new_id;
pub use pagination::{PageDefaults, PageParams, PageRequest, Paginated, SortOrder};
pub use query::{
    Conditions, Filterable, JoinCondition, JoinType, Operand, Operator, QueryBuilder, RawSql, Sql,
};
pub use repository::{PrimaryKeyOf, Repository};
pub use session::{with_transaction, Session};
pub use update::{UpdateMap, UpdateValue};

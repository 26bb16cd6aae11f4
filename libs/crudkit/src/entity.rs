//! Entity introspection and write-time stamping
//!
//! Conventions: the primary key is a single string column filled by
//! [`crate::ids::new_id`] when left empty, soft deletion uses a nullable
//! `deleted_at` column, and `created_at` / `updated_at` are `DateTimeUtc`.

use crate::ids::new_id;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue, ColumnTrait, ColumnType, EntityName, EntityTrait, IdenStatic,
    Iterable, PrimaryKeyToColumn, Value,
};

pub const SOFT_DELETE_COLUMN: &str = "deleted_at";
pub const CREATED_AT_COLUMN: &str = "created_at";
pub const UPDATED_AT_COLUMN: &str = "updated_at";

pub fn table_name<E: EntityTrait>() -> String {
    E::default().table_name().to_string()
}

pub fn column_by_name<E: EntityTrait>(name: &str) -> Option<E::Column> {
    E::Column::iter().find(|column| column.as_str() == name)
}

pub fn soft_delete_column<E: EntityTrait>() -> Option<E::Column> {
    column_by_name::<E>(SOFT_DELETE_COLUMN)
}

pub fn primary_key_column<E: EntityTrait>() -> Option<E::Column> {
    E::PrimaryKey::iter().next().map(|key| key.into_column())
}

pub fn primary_key_name<E: EntityTrait>() -> String {
    primary_key_column::<E>()
        .map(|column| column.as_str().to_string())
        .unwrap_or_else(|| "id".to_string())
}

/// Fill in the identifier and audit timestamps before a write.
///
/// On insert an empty string primary key gets a fresh identifier and unset
/// timestamps are set to now. On update only `updated_at` is refreshed.
/// Intended for use from `ActiveModelBehavior::before_save`.
pub fn stamp<A: ActiveModelTrait>(mut model: A, insert: bool) -> A {
    let now = Utc::now();
    let primary_key = primary_key_column::<A::Entity>();

    for column in <A::Entity as EntityTrait>::Column::iter() {
        let column_type = column.def().get_column_type().clone();
        let is_key = primary_key
            .as_ref()
            .is_some_and(|key| key.as_str() == column.as_str());

        if is_key {
            if insert && is_string_type(&column_type) && is_blank(&model.get(column)) {
                model.set(column, Value::from(new_id()));
            }
            continue;
        }

        if !matches!(column_type, ColumnType::TimestampWithTimeZone) {
            continue;
        }
        match column.as_str() {
            CREATED_AT_COLUMN if insert && is_blank(&model.get(column)) => {
                model.set(column, Value::from(now));
            }
            UPDATED_AT_COLUMN if insert && is_blank(&model.get(column)) => {
                model.set(column, Value::from(now));
            }
            UPDATED_AT_COLUMN if !insert => model.set(column, Value::from(now)),
            _ => {}
        }
    }
    model
}

pub(crate) fn is_blank(value: &ActiveValue<Value>) -> bool {
    match value {
        ActiveValue::NotSet => true,
        ActiveValue::Set(value) | ActiveValue::Unchanged(value) => is_null_or_empty(value),
    }
}

pub(crate) fn is_null_or_empty(value: &Value) -> bool {
    match value {
        Value::String(None) | Value::ChronoDateTimeUtc(None) => true,
        Value::String(Some(s)) => s.is_empty(),
        _ => false,
    }
}

fn is_string_type(column_type: &ColumnType) -> bool {
    matches!(
        column_type,
        ColumnType::String(_) | ColumnType::Char(_) | ColumnType::Text
    )
}

/// A NULL of the column's own type, so drivers with strict typing accept it.
pub(crate) fn typed_null(column_type: &ColumnType) -> Value {
    match column_type {
        ColumnType::TimestampWithTimeZone => Value::ChronoDateTimeUtc(None),
        ColumnType::DateTime | ColumnType::Timestamp => Value::ChronoDateTime(None),
        ColumnType::Date => Value::ChronoDate(None),
        ColumnType::Time => Value::ChronoTime(None),
        ColumnType::Boolean => Value::Bool(None),
        ColumnType::TinyInteger | ColumnType::SmallInteger | ColumnType::Integer => Value::Int(None),
        ColumnType::BigInteger => Value::BigInt(None),
        ColumnType::Float | ColumnType::Double => Value::Double(None),
        ColumnType::Json | ColumnType::JsonBinary => Value::Json(None),
        _ => Value::String(None),
    }
}

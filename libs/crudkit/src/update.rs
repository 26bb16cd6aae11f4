//! Partial-update maps
//!
//! Values are restricted at compile time to scalar, date/time and JSON
//! kinds; keys are checked against the entity's columns when applied.

use crate::entity::{column_by_name, primary_key_name, typed_null};
use crate::error::RepoError;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use sea_orm::{ColumnTrait, EntityTrait, Value};
use std::collections::BTreeMap;

/// A value accepted in an [`UpdateMap`].
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateValue {
    /// NULL typed after the target column.
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Text(String),
    Date(NaiveDate),
    Time(NaiveTime),
    Timestamp(DateTime<Utc>),
    Json(serde_json::Value),
}

impl UpdateValue {
    fn into_value(self, column_type: &sea_orm::ColumnType) -> Value {
        match self {
            UpdateValue::Null => typed_null(column_type),
            UpdateValue::Bool(v) => v.into(),
            UpdateValue::Int(v) => v.into(),
            UpdateValue::UInt(v) => v.into(),
            UpdateValue::Float(v) => v.into(),
            UpdateValue::Text(v) => v.into(),
            UpdateValue::Date(v) => v.into(),
            UpdateValue::Time(v) => v.into(),
            UpdateValue::Timestamp(v) => v.into(),
            UpdateValue::Json(v) => v.into(),
        }
    }
}

macro_rules! update_value_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for UpdateValue {
                fn from(value: $ty) -> Self {
                    UpdateValue::$variant(value.into())
                }
            }
        )*
    };
}

update_value_from!(
    bool => Bool,
    i32 => Int,
    i64 => Int,
    u32 => UInt,
    u64 => UInt,
    f64 => Float,
    String => Text,
    &str => Text,
    NaiveDate => Date,
    NaiveTime => Time,
    DateTime<Utc> => Timestamp,
    serde_json::Value => Json,
);

impl<T: Into<UpdateValue>> From<Option<T>> for UpdateValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(UpdateValue::Null, Into::into)
    }
}

/// Column name to new value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateMap(BTreeMap<String, UpdateValue>);

impl UpdateMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, column: impl Into<String>, value: impl Into<UpdateValue>) -> Self {
        self.0.insert(column.into(), value.into());
        self
    }

    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<UpdateValue>) {
        self.0.insert(column.into(), value.into());
    }

    pub fn contains(&self, column: &str) -> bool {
        self.0.contains_key(column)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &UpdateValue)> {
        self.0.iter()
    }

    /// Check keys against `E`'s columns and convert to bindable values.
    ///
    /// Unknown columns and the primary key are rejected.
    pub fn resolve<E: EntityTrait>(&self, context: &str) -> Result<Vec<(String, Value)>, RepoError> {
        let primary_key = primary_key_name::<E>();
        let mut out = Vec::with_capacity(self.0.len());

        for (key, value) in &self.0 {
            let column = column_by_name::<E>(key).ok_or_else(|| {
                RepoError::invalid_input(context, format!("unknown column `{key}`"))
            })?;
            if *key == primary_key {
                return Err(RepoError::invalid_input(
                    context,
                    format!("primary key `{key}` cannot be updated"),
                ));
            }
            let column_type = column.def().get_column_type().clone();
            out.push((key.clone(), value.clone().into_value(&column_type)));
        }
        Ok(out)
    }
}

impl<K, V> FromIterator<(K, V)> for UpdateMap
where
    K: Into<String>,
    V: Into<UpdateValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn optional_values_become_null() {
        let none: Option<String> = None;
        assert_eq!(UpdateValue::from(none), UpdateValue::Null);
        assert_eq!(UpdateValue::from(Some(3i64)), UpdateValue::Int(3));
    }

    #[test]
    fn builder_overwrites_duplicate_keys() {
        let map = UpdateMap::new().set("role", "admin").set("role", "member");
        assert_eq!(map.len(), 1);
        assert!(map.contains("role"));
    }

    #[test]
    fn null_follows_column_type() {
        let v = UpdateValue::Null.into_value(&sea_orm::ColumnType::TimestampWithTimeZone);
        assert_eq!(v, Value::ChronoDateTimeUtc(None));
    }
}

//! Core value type for SQLite operations and its engine-boundary conversions.

use rusqlite::types::{ToSqlOutput, ValueRef};
use rusqlite::ToSql;
use serde::{Deserialize, Serialize};

/// A single SQLite storage-class value.
///
/// `Boolean` is a convenience variant for callers; it is stored as
/// INTEGER 0/1 and comes back out of the engine as `Integer`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
    Boolean(bool),
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Real(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Blob(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(inner) => inner.into(),
            None => Value::Null,
        }
    }
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Null => ToSqlOutput::Owned(rusqlite::types::Value::Null),
            Value::Integer(i) => ToSqlOutput::Owned(rusqlite::types::Value::Integer(*i)),
            Value::Real(r) => ToSqlOutput::Owned(rusqlite::types::Value::Real(*r)),
            Value::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            Value::Blob(b) => ToSqlOutput::Borrowed(ValueRef::Blob(b)),
            Value::Boolean(b) => ToSqlOutput::Owned(rusqlite::types::Value::Integer(*b as i64)),
        })
    }
}

impl From<ValueRef<'_>> for Value {
    fn from(v: ValueRef<'_>) -> Self {
        match v {
            ValueRef::Null => Value::Null,
            ValueRef::Integer(i) => Value::Integer(i),
            ValueRef::Real(r) => Value::Real(r),
            ValueRef::Text(t) => Value::Text(String::from_utf8_lossy(t).into_owned()),
            ValueRef::Blob(b) => Value::Blob(b.to_vec()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_impls_cover_primitives() {
        assert_eq!(Value::from(7i64), Value::Integer(7));
        assert_eq!(Value::from(7i32), Value::Integer(7));
        assert_eq!(Value::from(1.5f64), Value::Real(1.5));
        assert_eq!(Value::from("abc"), Value::Text("abc".to_string()));
        assert_eq!(Value::from(vec![1u8, 2]), Value::Blob(vec![1, 2]));
        assert_eq!(Value::from(true), Value::Boolean(true));
        assert_eq!(Value::from(Option::<i64>::None), Value::Null);
        assert_eq!(Value::from(Some(9i64)), Value::Integer(9));
    }

    #[test]
    fn boolean_binds_as_integer() {
        let out = Value::Boolean(true).to_sql().unwrap();
        assert!(matches!(
            out,
            ToSqlOutput::Owned(rusqlite::types::Value::Integer(1))
        ));
    }

    #[test]
    fn value_ref_round_trips_storage_classes() {
        assert_eq!(Value::from(ValueRef::Null), Value::Null);
        assert_eq!(Value::from(ValueRef::Integer(3)), Value::Integer(3));
        assert_eq!(Value::from(ValueRef::Real(0.5)), Value::Real(0.5));
        assert_eq!(
            Value::from(ValueRef::Text(b"hi")),
            Value::Text("hi".to_string())
        );
        assert_eq!(
            Value::from(ValueRef::Blob(&[9, 9])),
            Value::Blob(vec![9, 9])
        );
    }
}

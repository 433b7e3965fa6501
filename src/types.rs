//! Value types for arclite
//!
//! This module defines the dynamic column types and the value shapes read
//! from a result row.

use serde::{Deserialize, Serialize};
use std::ffi::c_int;
use std::fmt;
use std::ops::Deref;

use rusqlite::ffi;

use crate::error::{OtherError, Result};

/// Dynamic type of a value at the current row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    Integer,
    Float,
    Text,
    Blob,
    Null,
}

impl DataType {
    pub(crate) fn from_raw(code: c_int) -> Result<Self> {
        match code {
            ffi::SQLITE_INTEGER => Ok(DataType::Integer),
            ffi::SQLITE_FLOAT => Ok(DataType::Float),
            ffi::SQLITE_TEXT => Ok(DataType::Text),
            ffi::SQLITE_BLOB => Ok(DataType::Blob),
            ffi::SQLITE_NULL => Ok(DataType::Null),
            other => Err(OtherError::UnknownColumnType(other).into()),
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Integer => write!(f, "Integer"),
            DataType::Float => write!(f, "Float"),
            DataType::Text => write!(f, "Text"),
            DataType::Blob => write!(f, "Blob"),
            DataType::Null => write!(f, "Null"),
        }
    }
}

/// Borrowed bytes.
///
/// When read from a column the bytes live in the engine's row buffer and the
/// borrow of the statement keeps them valid; use [`Blob::to_vec`] to keep them
/// past the next step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Blob<'a> {
    data: &'a [u8],
}

impl<'a> Blob<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    pub fn data(&self) -> &'a [u8] {
        self.data
    }
}

impl Deref for Blob<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.data
    }
}

impl AsRef<[u8]> for Blob<'_> {
    fn as_ref(&self) -> &[u8] {
        self.data
    }
}

impl<'a> From<&'a [u8]> for Blob<'a> {
    fn from(data: &'a [u8]) -> Self {
        Self { data }
    }
}

/// An owned value copied out of a result row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Value {
    Integer(i64),
    Float(f64),
    Text(String),
    Blob(Vec<u8>),
    Null,
}

// Floats compare bitwise so a value read back equals the one bound.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::Blob(a), Value::Blob(b)) => a == b,
            (Value::Null, Value::Null) => true,
            _ => false,
        }
    }
}

impl Value {
    pub fn data_type(&self) -> DataType {
        match self {
            Value::Integer(_) => DataType::Integer,
            Value::Float(_) => DataType::Float,
            Value::Text(_) => DataType::Text,
            Value::Blob(_) => DataType::Blob,
            Value::Null => DataType::Null,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Integer(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Blob(v) => Some(v),
            Value::Text(v) => Some(v.as_bytes()),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Text(v) => write!(f, "{}", v),
            Value::Blob(v) => write!(f, "<{} bytes>", v.len()),
            Value::Null => write!(f, "NULL"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_data_type_from_raw() {
        assert_eq!(
            DataType::from_raw(ffi::SQLITE_INTEGER),
            Ok(DataType::Integer)
        );
        assert_eq!(DataType::from_raw(ffi::SQLITE_NULL), Ok(DataType::Null));
        assert_eq!(
            DataType::from_raw(42),
            Err(Error::Other(OtherError::UnknownColumnType(42)))
        );
    }

    #[test]
    fn test_data_type_display() {
        assert_eq!(DataType::Float.to_string(), "Float");
        assert_eq!(DataType::Blob.to_string(), "Blob");
    }

    #[test]
    fn test_blob_borrows() {
        let bytes = [0u8, 1, 2, 255];
        let blob = Blob::new(&bytes);
        assert_eq!(blob.len(), 4);
        assert_eq!(blob.data(), &bytes);
        assert_eq!(blob.to_vec(), vec![0, 1, 2, 255]);
        assert!(Blob::default().is_empty());
    }

    #[test]
    fn test_value_float_bitwise_eq() {
        assert_eq!(Value::Float(0.1), Value::Float(0.1));
        assert_ne!(Value::Float(0.0), Value::Float(-0.0));
        assert_ne!(Value::Integer(1), Value::Float(1.0));
        assert_eq!(Value::Integer(3).as_f64(), Some(3.0));
        assert_eq!(Value::Null.data_type(), DataType::Null);
    }
}

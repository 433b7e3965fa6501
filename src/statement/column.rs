//! Column access for the current row
//!
//! A [`Column`] is a cheap view of one column of a [`Statement`]; every read
//! goes through the statement at the view's index.

use super::Statement;
use crate::error::{Error, Result};
use crate::types::{Blob, DataType, Value};

/// A column position: a zero-based `usize` or a result column name
pub trait ColumnIndex {
    fn column_index(&self, statement: &Statement) -> Result<usize>;
}

impl ColumnIndex for usize {
    fn column_index(&self, _statement: &Statement) -> Result<usize> {
        Ok(*self)
    }
}

impl ColumnIndex for &str {
    fn column_index(&self, statement: &Statement) -> Result<usize> {
        statement.column_index(self)
    }
}

mod sealed {
    pub trait Sealed {}

    impl Sealed for i32 {}
    impl Sealed for i64 {}
    impl Sealed for f64 {}
    impl Sealed for String {}
    impl Sealed for crate::types::Blob<'_> {}
}

/// Types a column can be read as: `i32`, `i64`, `f64`, `String` and [`Blob`].
///
/// The trait is sealed; reading any other type is a compile error.
pub trait FromColumn<'s>: Sized + sealed::Sealed {
    fn from_column(statement: &'s Statement, index: usize) -> Result<Self>;
}

impl<'s> FromColumn<'s> for i32 {
    fn from_column(statement: &'s Statement, index: usize) -> Result<Self> {
        statement.get_int(index)
    }
}

impl<'s> FromColumn<'s> for i64 {
    fn from_column(statement: &'s Statement, index: usize) -> Result<Self> {
        statement.get_int64(index)
    }
}

impl<'s> FromColumn<'s> for f64 {
    fn from_column(statement: &'s Statement, index: usize) -> Result<Self> {
        statement.get_double(index)
    }
}

impl<'s> FromColumn<'s> for String {
    fn from_column(statement: &'s Statement, index: usize) -> Result<Self> {
        statement.get_string(index)
    }
}

impl<'s> FromColumn<'s> for Blob<'s> {
    fn from_column(statement: &'s Statement, index: usize) -> Result<Self> {
        statement.get_blob(index)
    }
}

/// Read view of one column
#[derive(Debug, Clone, Copy)]
pub struct Column<'s> {
    statement: &'s Statement,
    index: usize,
}

impl<'s> Column<'s> {
    pub(crate) fn new(statement: &'s Statement, index: usize) -> Self {
        Self { statement, index }
    }

    /// Zero-based column index
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn get_int(&self) -> Result<i32> {
        self.statement.get_int(self.index)
    }

    pub fn get_int64(&self) -> Result<i64> {
        self.statement.get_int64(self.index)
    }

    pub fn get_double(&self) -> Result<f64> {
        self.statement.get_double(self.index)
    }

    pub fn get_string(&self) -> Result<String> {
        self.statement.get_string(self.index)
    }

    pub fn get_blob(&self) -> Result<Blob<'s>> {
        self.statement.get_blob(self.index)
    }

    pub fn get<T: FromColumn<'s>>(&self) -> Result<T> {
        T::from_column(self.statement, self.index)
    }

    pub fn value(&self) -> Result<Value> {
        self.statement.value(self.index)
    }

    pub fn data_type(&self) -> Result<DataType> {
        self.statement.column_type(self.index)
    }

    pub fn decl_type(&self) -> Result<Option<String>> {
        self.statement.column_decl_type(self.index)
    }

    pub fn name(&self) -> Result<String> {
        self.statement.column_name(self.index)
    }

    pub fn origin_name(&self) -> Result<Option<String>> {
        self.statement.column_origin_name(self.index)
    }

    pub fn table_name(&self) -> Result<Option<String>> {
        self.statement.column_table_name(self.index)
    }

    pub fn database_name(&self) -> Result<Option<String>> {
        self.statement.column_database_name(self.index)
    }
}

macro_rules! impl_try_from_column {
    ($($ty:ty),+) => {
        $(
            impl<'s> TryFrom<Column<'s>> for $ty {
                type Error = Error;

                fn try_from(column: Column<'s>) -> Result<Self> {
                    column.get()
                }
            }
        )+
    };
}

impl_try_from_column!(i32, i64, f64, String);

impl<'s> TryFrom<Column<'s>> for Blob<'s> {
    type Error = Error;

    fn try_from(column: Column<'s>) -> Result<Self> {
        column.get_blob()
    }
}

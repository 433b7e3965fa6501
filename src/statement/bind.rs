//! Parameter binding
//!
//! [`Bind`] is implemented for the value types a parameter accepts: `i32`,
//! `i64`, `f64`, text and blobs. Text and blobs are copied by the engine, so
//! the caller's buffer may be dropped right after the call.

use std::ffi::{c_char, c_uchar, c_void};

use rusqlite::ffi;

use super::Statement;
use crate::error::Result;
use crate::types::Blob;

/// A value that can be bound to a statement parameter
pub trait Bind {
    /// Bind `self` to the 1-based parameter `index`
    fn bind_at(&self, statement: &mut Statement, index: usize) -> Result<()>;
}

impl Bind for i32 {
    fn bind_at(&self, statement: &mut Statement, index: usize) -> Result<()> {
        statement.bind_with(index, "failed to bind int", |stmt, i| unsafe {
            ffi::sqlite3_bind_int(stmt, i, *self)
        })
    }
}

impl Bind for i64 {
    fn bind_at(&self, statement: &mut Statement, index: usize) -> Result<()> {
        statement.bind_with(index, "failed to bind int64", |stmt, i| unsafe {
            ffi::sqlite3_bind_int64(stmt, i, *self)
        })
    }
}

impl Bind for f64 {
    fn bind_at(&self, statement: &mut Statement, index: usize) -> Result<()> {
        statement.bind_with(index, "failed to bind double", |stmt, i| unsafe {
            ffi::sqlite3_bind_double(stmt, i, *self)
        })
    }
}

impl Bind for str {
    fn bind_at(&self, statement: &mut Statement, index: usize) -> Result<()> {
        statement.bind_with(index, "failed to bind text", |stmt, i| unsafe {
            ffi::sqlite3_bind_text64(
                stmt,
                i,
                self.as_ptr() as *const c_char,
                self.len() as u64,
                ffi::SQLITE_TRANSIENT(),
                ffi::SQLITE_UTF8 as c_uchar,
            )
        })
    }
}

impl Bind for String {
    fn bind_at(&self, statement: &mut Statement, index: usize) -> Result<()> {
        self.as_str().bind_at(statement, index)
    }
}

impl Bind for [u8] {
    fn bind_at(&self, statement: &mut Statement, index: usize) -> Result<()> {
        statement.bind_with(index, "failed to bind blob", |stmt, i| unsafe {
            ffi::sqlite3_bind_blob64(
                stmt,
                i,
                self.as_ptr() as *const c_void,
                self.len() as u64,
                ffi::SQLITE_TRANSIENT(),
            )
        })
    }
}

impl Bind for Vec<u8> {
    fn bind_at(&self, statement: &mut Statement, index: usize) -> Result<()> {
        self.as_slice().bind_at(statement, index)
    }
}

impl Bind for Blob<'_> {
    fn bind_at(&self, statement: &mut Statement, index: usize) -> Result<()> {
        self.data().bind_at(statement, index)
    }
}

impl<T: Bind + ?Sized> Bind for &T {
    fn bind_at(&self, statement: &mut Statement, index: usize) -> Result<()> {
        (**self).bind_at(statement, index)
    }
}

/// A parameter position: a 1-based `usize` or a placeholder name
pub trait ParamIndex {
    fn param_index(&self, statement: &Statement) -> Result<usize>;
}

impl ParamIndex for usize {
    fn param_index(&self, _statement: &Statement) -> Result<usize> {
        Ok(*self)
    }
}

impl ParamIndex for &str {
    fn param_index(&self, statement: &Statement) -> Result<usize> {
        statement.parameter_index(self)
    }
}

/// A set of values bound to consecutive positions starting at 1
pub trait BindAll {
    fn bind_all(self, statement: &mut Statement) -> Result<()>;
}

impl BindAll for () {
    fn bind_all(self, _statement: &mut Statement) -> Result<()> {
        Ok(())
    }
}

impl<T: Bind, const N: usize> BindAll for [T; N] {
    fn bind_all(self, statement: &mut Statement) -> Result<()> {
        for (i, value) in self.iter().enumerate() {
            value.bind_at(statement, i + 1)?;
        }
        Ok(())
    }
}

macro_rules! impl_bind_all {
    ($($name:ident : $idx:tt),+) => {
        impl<$($name: Bind),+> BindAll for ($($name,)+) {
            fn bind_all(self, statement: &mut Statement) -> Result<()> {
                $( self.$idx.bind_at(statement, $idx + 1)?; )+
                Ok(())
            }
        }
    };
}

impl_bind_all!(A: 0);
impl_bind_all!(A: 0, B: 1);
impl_bind_all!(A: 0, B: 1, C: 2);
impl_bind_all!(A: 0, B: 1, C: 2, D: 3);
impl_bind_all!(A: 0, B: 1, C: 2, D: 3, E: 4);
impl_bind_all!(A: 0, B: 1, C: 2, D: 3, E: 4, F: 5);
impl_bind_all!(A: 0, B: 1, C: 2, D: 3, E: 4, F: 5, G: 6);
impl_bind_all!(A: 0, B: 1, C: 2, D: 3, E: 4, F: 5, G: 6, H: 7);

/// Write view of one statement parameter
#[derive(Debug)]
pub struct Parameter<'s> {
    statement: &'s mut Statement,
    index: usize,
}

impl<'s> Parameter<'s> {
    pub(crate) fn new(statement: &'s mut Statement, index: usize) -> Self {
        Self { statement, index }
    }

    /// 1-based position of the parameter
    pub fn index(&self) -> usize {
        self.index
    }

    /// Bind `value` to this parameter
    pub fn set<V: Bind>(&mut self, value: V) -> Result<()> {
        value.bind_at(self.statement, self.index)
    }

    /// Placeholder name, `None` for nameless `?` parameters
    pub fn name(&self) -> Result<Option<String>> {
        self.statement.parameter_name(self.index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, OtherError};
    use crate::Connection;

    #[test]
    fn test_bind_all_tuple() {
        let conn = Connection::open_in_memory().unwrap();
        let mut stmt = conn.prepare("SELECT ?, ?, ?, ?").unwrap();

        let payload = vec![1u8, 2, 3];
        stmt.bind_all((7, 1_i64 << 40, "text", payload.as_slice()))
            .unwrap();
        drop(payload);
        assert!(stmt.step().unwrap());

        assert_eq!(stmt.get_int(0).unwrap(), 7);
        assert_eq!(stmt.get_int64(1).unwrap(), 1 << 40);
        assert_eq!(stmt.get_string(2).unwrap(), "text");
        assert_eq!(stmt.get_blob(3).unwrap().data(), &[1, 2, 3]);
    }

    #[test]
    fn test_bind_all_array() {
        let conn = Connection::open_in_memory().unwrap();
        let mut stmt = conn.prepare("SELECT ? + ? + ?").unwrap();

        stmt.bind_all([1.5, 2.0, 0.5]).unwrap();
        assert!(stmt.step().unwrap());
        assert_eq!(stmt.get_double(0).unwrap(), 4.0);
    }

    #[test]
    fn test_text_binding_is_copied() {
        let conn = Connection::open_in_memory().unwrap();
        let mut stmt = conn.prepare("SELECT ?").unwrap();

        {
            let owned = String::from("short-lived");
            stmt.bind(1, &owned).unwrap();
        }
        assert!(stmt.step().unwrap());
        assert_eq!(stmt.get_string(0).unwrap(), "short-lived");
    }

    #[test]
    fn test_parameter_view() {
        let conn = Connection::open_in_memory().unwrap();
        let mut stmt = conn.prepare("SELECT :name, ?").unwrap();

        {
            let mut param = stmt.param(":name").unwrap();
            assert_eq!(param.index(), 1);
            assert_eq!(param.name().unwrap().as_deref(), Some(":name"));
            param.set("Alice").unwrap();
        }
        {
            let mut param = stmt.param(2).unwrap();
            assert_eq!(param.name().unwrap(), None);
            param.set(Blob::new(b"\x01\x02")).unwrap();
        }

        assert!(stmt.step().unwrap());
        assert_eq!(stmt.get_string(0).unwrap(), "Alice");
        assert_eq!(stmt.get_blob(1).unwrap().data(), b"\x01\x02");
    }

    #[test]
    fn test_parameter_view_unknown_name() {
        let conn = Connection::open_in_memory().unwrap();
        let mut stmt = conn.prepare("SELECT :name").unwrap();

        assert_eq!(
            stmt.param(":nope").unwrap_err(),
            Error::Other(OtherError::ParameterNotFound(":nope".to_string()))
        );
    }

    #[test]
    fn test_bind_out_of_range() {
        let conn = Connection::open_in_memory().unwrap();
        let mut stmt = conn.prepare("SELECT ?").unwrap();

        let err = stmt.bind(2, 1).unwrap_err();
        assert_eq!(err.code(), Some(ffi::SQLITE_RANGE));
        assert!(err.to_string().starts_with("failed to bind int, "));
    }
}

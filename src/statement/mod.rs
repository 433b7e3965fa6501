//! Prepared statements
//!
//! A [`Statement`] exclusively owns one native prepared-statement handle and
//! caches the column name to index mapping computed when it was prepared.
//! It does not borrow the [`Connection`](crate::Connection) it came from; a
//! connection dropped first stays alive inside the engine until its
//! statements are finalized.

pub mod bind;
pub mod column;

pub use bind::{Bind, BindAll, ParamIndex, Parameter};
pub use column::{Column, ColumnIndex, FromColumn};

use std::ffi::{c_int, c_uint};
use std::ptr::{self, NonNull};
use std::slice;

use indexmap::IndexMap;
use rusqlite::ffi;
use tracing::{debug, trace, warn};

use crate::error::{Error, OtherError, Result};
use crate::raw;
use crate::types::{Blob, DataType, Value};

/// A prepared statement, or an empty one (unprepared or finalized)
#[derive(Debug, Default)]
pub struct Statement {
    stmt: Option<NonNull<ffi::sqlite3_stmt>>,
    /// Column name -> zero-based index, fixed at prepare time
    columns: IndexMap<String, usize>,
}

impl Statement {
    /// Create an unprepared statement
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile `sql` on `db`.
    ///
    /// SQL containing only whitespace or comments compiles to no program; the
    /// result is then an unprepared statement.
    pub(crate) fn prepare(db: NonNull<ffi::sqlite3>, sql: &str, persistent: bool) -> Result<Self> {
        let c_sql = raw::to_cstring(sql)?;
        let flags = if persistent {
            ffi::SQLITE_PREPARE_PERSISTENT as c_uint
        } else {
            0
        };

        let mut stmt = ptr::null_mut();
        let rc = unsafe {
            let tail = ptr::null_mut();
            ffi::sqlite3_prepare_v3(db.as_ptr(), c_sql.as_ptr(), -1, flags, &mut stmt, tail)
        };
        if rc != ffi::SQLITE_OK {
            let context = "failed to prepare statement";
            return Err(unsafe { Error::from_handle(db.as_ptr(), context, Some(sql)) });
        }

        let mut statement = Self {
            stmt: NonNull::new(stmt),
            columns: IndexMap::new(),
        };
        statement.load_column_indices();
        let columns = statement.columns.len();
        debug!(sql, persistent, columns, "prepared statement");
        Ok(statement)
    }

    // Later duplicates of a column name overwrite earlier ones.
    fn load_column_indices(&mut self) {
        let Some(stmt) = self.stmt else {
            return;
        };

        let count = unsafe { ffi::sqlite3_column_count(stmt.as_ptr()) };
        for i in 0..count {
            let name = unsafe { raw::to_string(ffi::sqlite3_column_name(stmt.as_ptr(), i)) };
            if let Some(name) = name {
                self.columns.insert(name, i as usize);
            }
        }
    }

    /// Release the native handle.
    ///
    /// Finalizing an empty statement is a no-op. The handle is released even
    /// when an error is returned; the engine reports the failure of the most
    /// recent evaluation here.
    pub fn finalize(&mut self) -> Result<()> {
        let Some(stmt) = self.stmt.take() else {
            return Ok(());
        };
        self.columns.clear();

        // The connection may be a zombie that this call releases, so the
        // error comes from the return code rather than the handle.
        let rc = unsafe { ffi::sqlite3_finalize(stmt.as_ptr()) };
        if rc != ffi::SQLITE_OK {
            return Err(Error::from_code(rc, "failed to finalize statement"));
        }
        debug!("finalized statement");
        Ok(())
    }

    pub fn is_prepared(&self) -> bool {
        self.stmt.is_some()
    }

    /// The SQL text the statement was prepared from
    pub fn sql(&self) -> Result<Option<String>> {
        let stmt = self.ensure()?;
        Ok(unsafe { raw::to_string(ffi::sqlite3_sql(stmt)) })
    }

    // ========== Parameters ==========

    /// Number of the largest parameter position
    pub fn parameter_count(&self) -> Result<usize> {
        let stmt = self.ensure()?;
        Ok(unsafe { ffi::sqlite3_bind_parameter_count(stmt) } as usize)
    }

    /// Resolve a named placeholder, including its prefix (`:id`, `@id`, `$id`)
    pub fn parameter_index(&self, name: &str) -> Result<usize> {
        let stmt = self.ensure()?;
        let c_name = raw::to_cstring(name)?;
        let index = unsafe { ffi::sqlite3_bind_parameter_index(stmt, c_name.as_ptr()) };
        if index == 0 {
            return Err(OtherError::ParameterNotFound(name.to_string()).into());
        }
        Ok(index as usize)
    }

    /// Name of the parameter at `index`, `None` for nameless `?` parameters
    pub fn parameter_name(&self, index: usize) -> Result<Option<String>> {
        let stmt = self.ensure()?;
        let index = raw::to_c_index(index);
        Ok(unsafe { raw::to_string(ffi::sqlite3_bind_parameter_name(stmt, index)) })
    }

    /// Bind `value` to a 1-based position or a named placeholder
    pub fn bind<I: ParamIndex, V: Bind>(&mut self, index: I, value: V) -> Result<()> {
        let index = index.param_index(self)?;
        value.bind_at(self, index)
    }

    /// Bind each element of `values` to consecutive positions starting at 1
    pub fn bind_all<P: BindAll>(&mut self, values: P) -> Result<()> {
        values.bind_all(self)
    }

    /// View of one parameter; names are resolved immediately
    pub fn param<I: ParamIndex>(&mut self, index: I) -> Result<Parameter<'_>> {
        let index = index.param_index(self)?;
        Ok(Parameter::new(self, index))
    }

    pub(crate) fn bind_with<F>(&mut self, index: usize, context: &str, bind: F) -> Result<()>
    where
        F: FnOnce(*mut ffi::sqlite3_stmt, c_int) -> c_int,
    {
        let stmt = self.ensure()?;
        if bind(stmt, raw::to_c_index(index)) != ffi::SQLITE_OK {
            return Err(self.engine_error(stmt, context));
        }
        Ok(())
    }

    // ========== Execution ==========

    /// Advance to the next row. `Ok(true)` when a row is available,
    /// `Ok(false)` once execution is complete.
    pub fn step(&mut self) -> Result<bool> {
        let stmt = self.ensure()?;
        match unsafe { ffi::sqlite3_step(stmt) } {
            ffi::SQLITE_ROW => {
                trace!("row");
                Ok(true)
            }
            ffi::SQLITE_DONE => {
                trace!("done");
                Ok(false)
            }
            _ => Err(self.engine_error(stmt, "failed to step statement")),
        }
    }

    /// Rewind to the start; bindings are kept
    pub fn reset(&mut self) -> Result<()> {
        let stmt = self.ensure()?;
        if unsafe { ffi::sqlite3_reset(stmt) } != ffi::SQLITE_OK {
            return Err(self.engine_error(stmt, "failed to reset statement"));
        }
        Ok(())
    }

    /// Set every parameter back to NULL
    pub fn clear_bindings(&mut self) -> Result<()> {
        let stmt = self.ensure()?;
        if unsafe { ffi::sqlite3_clear_bindings(stmt) } != ffi::SQLITE_OK {
            return Err(self.engine_error(stmt, "failed to clear bindings"));
        }
        Ok(())
    }

    /// Reset and clear bindings
    pub fn reuse(&mut self) -> Result<()> {
        self.reset()?;
        self.clear_bindings()
    }

    // ========== Columns ==========

    pub fn column_count(&self) -> Result<usize> {
        let stmt = self.ensure()?;
        Ok(unsafe { ffi::sqlite3_column_count(stmt) } as usize)
    }

    /// Index of the column called `name`, from the cache built at prepare time
    pub fn column_index(&self, name: &str) -> Result<usize> {
        self.ensure()?;
        self.columns
            .get(name)
            .copied()
            .ok_or_else(|| OtherError::ColumnNotFound(name.to_string()).into())
    }

    /// Names of all result columns in order
    pub fn column_names(&self) -> Result<Vec<String>> {
        (0..self.column_count()?)
            .map(|i| self.column_name(i))
            .collect()
    }

    /// View of one column of the current row
    pub fn column<I: ColumnIndex>(&self, index: I) -> Result<Column<'_>> {
        let index = index.column_index(self)?;
        Ok(Column::new(self, index))
    }

    /// Dynamic type of the value in the current row
    pub fn column_type<I: ColumnIndex>(&self, index: I) -> Result<DataType> {
        let (stmt, i) = self.column_arg(index)?;
        DataType::from_raw(unsafe { ffi::sqlite3_column_type(stmt, i) })
    }

    /// Type declared in the table schema, `None` for expressions
    pub fn column_decl_type<I: ColumnIndex>(&self, index: I) -> Result<Option<String>> {
        let (stmt, i) = self.column_arg(index)?;
        Ok(unsafe { raw::to_string(ffi::sqlite3_column_decltype(stmt, i)) })
    }

    pub fn column_name<I: ColumnIndex>(&self, index: I) -> Result<String> {
        let (stmt, i) = self.column_arg(index)?;
        Ok(unsafe { raw::to_string(ffi::sqlite3_column_name(stmt, i)) }.unwrap_or_default())
    }

    /// Name of the table column the result column comes from
    #[cfg(feature = "column_metadata")]
    pub fn column_origin_name<I: ColumnIndex>(&self, index: I) -> Result<Option<String>> {
        let (stmt, i) = self.column_arg(index)?;
        Ok(unsafe { raw::to_string(ffi::sqlite3_column_origin_name(stmt, i)) })
    }

    #[cfg(feature = "column_metadata")]
    pub fn column_table_name<I: ColumnIndex>(&self, index: I) -> Result<Option<String>> {
        let (stmt, i) = self.column_arg(index)?;
        Ok(unsafe { raw::to_string(ffi::sqlite3_column_table_name(stmt, i)) })
    }

    #[cfg(feature = "column_metadata")]
    pub fn column_database_name<I: ColumnIndex>(&self, index: I) -> Result<Option<String>> {
        let (stmt, i) = self.column_arg(index)?;
        Ok(unsafe { raw::to_string(ffi::sqlite3_column_database_name(stmt, i)) })
    }

    #[cfg(not(feature = "column_metadata"))]
    pub fn column_origin_name<I: ColumnIndex>(&self, _index: I) -> Result<Option<String>> {
        Err(OtherError::ColumnMetadataDisabled.into())
    }

    #[cfg(not(feature = "column_metadata"))]
    pub fn column_table_name<I: ColumnIndex>(&self, _index: I) -> Result<Option<String>> {
        Err(OtherError::ColumnMetadataDisabled.into())
    }

    #[cfg(not(feature = "column_metadata"))]
    pub fn column_database_name<I: ColumnIndex>(&self, _index: I) -> Result<Option<String>> {
        Err(OtherError::ColumnMetadataDisabled.into())
    }

    // ========== Typed reads ==========
    //
    // Reads follow the engine's coercion rules; NULL reads as 0, 0.0 or empty.

    pub fn get_int<I: ColumnIndex>(&self, index: I) -> Result<i32> {
        let (stmt, i) = self.column_arg(index)?;
        Ok(unsafe { ffi::sqlite3_column_int(stmt, i) })
    }

    pub fn get_int64<I: ColumnIndex>(&self, index: I) -> Result<i64> {
        let (stmt, i) = self.column_arg(index)?;
        Ok(unsafe { ffi::sqlite3_column_int64(stmt, i) })
    }

    pub fn get_double<I: ColumnIndex>(&self, index: I) -> Result<f64> {
        let (stmt, i) = self.column_arg(index)?;
        Ok(unsafe { ffi::sqlite3_column_double(stmt, i) })
    }

    /// Text of the column; invalid UTF-8 is replaced
    pub fn get_string<I: ColumnIndex>(&self, index: I) -> Result<String> {
        let (stmt, i) = self.column_arg(index)?;
        let bytes = unsafe {
            match ffi::sqlite3_column_type(stmt, i) {
                // Reading a BLOB as text would rewrite the buffer a live Blob
                // may point into; copy the raw bytes instead.
                ffi::SQLITE_BLOB => {
                    let data = ffi::sqlite3_column_blob(stmt, i).cast();
                    column_bytes(stmt, i, data)
                }
                _ => column_bytes(stmt, i, ffi::sqlite3_column_text(stmt, i)),
            }
        };
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }

    /// Bytes of the column, borrowed from the current row
    pub fn get_blob<I: ColumnIndex>(&self, index: I) -> Result<Blob<'_>> {
        let (stmt, i) = self.column_arg(index)?;
        let bytes = unsafe {
            // Settle TEXT into its final UTF-8, nul-terminated form first so
            // that a later get_string cannot move the buffer.
            if ffi::sqlite3_column_type(stmt, i) == ffi::SQLITE_TEXT {
                ffi::sqlite3_column_text(stmt, i);
            }
            column_bytes(stmt, i, ffi::sqlite3_column_blob(stmt, i).cast())
        };
        Ok(Blob::new(bytes))
    }

    /// Read the column as any of `i32`, `i64`, `f64`, `String` or [`Blob`]
    pub fn get<'s, T: FromColumn<'s>, I: ColumnIndex>(&'s self, index: I) -> Result<T> {
        let index = index.column_index(self)?;
        T::from_column(self, index)
    }

    /// Copy the column out in its dynamic type
    pub fn value<I: ColumnIndex>(&self, index: I) -> Result<Value> {
        let index = index.column_index(self)?;
        Ok(match self.column_type(index)? {
            DataType::Integer => Value::Integer(self.get_int64(index)?),
            DataType::Float => Value::Float(self.get_double(index)?),
            DataType::Text => Value::Text(self.get_string(index)?),
            DataType::Blob => Value::Blob(self.get_blob(index)?.to_vec()),
            DataType::Null => Value::Null,
        })
    }

    /// Copy every column of the current row
    pub fn values(&self) -> Result<Vec<Value>> {
        (0..self.column_count()?).map(|i| self.value(i)).collect()
    }

    // ========== Helpers ==========

    fn ensure(&self) -> Result<*mut ffi::sqlite3_stmt> {
        self.stmt
            .map(NonNull::as_ptr)
            .ok_or_else(|| OtherError::StatementNotInitialized.into())
    }

    fn column_arg<I: ColumnIndex>(&self, index: I) -> Result<(*mut ffi::sqlite3_stmt, c_int)> {
        let index = index.column_index(self)?;
        Ok((self.ensure()?, raw::to_c_index(index)))
    }

    fn engine_error(&self, stmt: *mut ffi::sqlite3_stmt, context: &str) -> Error {
        unsafe { Error::from_handle(ffi::sqlite3_db_handle(stmt), context, None) }
    }
}

/// Borrow the `sqlite3_column_bytes` bytes at `data`.
///
/// # Safety
///
/// `data` must be the pointer the engine just returned for column `i` of
/// `stmt`; the slice is valid until the row changes.
unsafe fn column_bytes<'a>(stmt: *mut ffi::sqlite3_stmt, i: c_int, data: *const u8) -> &'a [u8] {
    let len = ffi::sqlite3_column_bytes(stmt, i);
    if data.is_null() || len <= 0 {
        return &[];
    }
    slice::from_raw_parts(data, len as usize)
}

impl Drop for Statement {
    fn drop(&mut self) {
        if let Err(err) = self.finalize() {
            warn!(error = %err, "finalizing statement on drop failed");
        }
    }
}

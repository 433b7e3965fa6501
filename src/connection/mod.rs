//! Database connections
//!
//! A [`Connection`] exclusively owns one native database handle. Moving the
//! value moves the handle; [`std::mem::take`] leaves an empty connection
//! behind whose every operation fails with
//! [`OtherError::ConnectionNotInitialized`].

pub mod config;

pub use config::{
    configure_serialized, is_threadsafe, ConnectionConfig, OpenFlags, MEMORY_DATABASE,
};

use std::ptr::{self, NonNull};

use rusqlite::ffi;
use tracing::{debug, warn};

use crate::error::{Error, OtherError, Result};
use crate::raw;
use crate::statement::Statement;

/// An open (or empty) database connection
#[derive(Debug, Default)]
pub struct Connection {
    db: Option<NonNull<ffi::sqlite3>>,
}

// Every handle is opened with the engine's full mutex (see
// `ConnectionConfig::native_flags`), so the connection and statements left on
// another thread may be used concurrently.
unsafe impl Send for Connection {}

impl Connection {
    /// Create an empty connection that owns no handle
    pub fn new() -> Self {
        Self::default()
    }

    /// Open the database `name` with `flags`
    pub fn open(name: &str, flags: OpenFlags) -> Result<Self> {
        Self::open_with(&ConnectionConfig::new(name).flags(flags))
    }

    /// Open a private in-memory database
    pub fn open_in_memory() -> Result<Self> {
        Self::open(MEMORY_DATABASE, OpenFlags::NONE)
    }

    /// Open a database described by `config`
    pub fn open_with(config: &ConnectionConfig) -> Result<Self> {
        let name = raw::to_cstring(&config.name)?;
        let vfs = config.vfs.as_deref().map(raw::to_cstring).transpose()?;
        let vfs_ptr = vfs.as_ref().map_or(ptr::null(), |v| v.as_ptr());

        if config.flags.contains(OpenFlags::NO_MUTEX) {
            debug!(name = %config.name, "NO_MUTEX ignored, connections run serialized");
        }

        let mut db = ptr::null_mut();
        let flags = config.native_flags();
        let rc = unsafe { ffi::sqlite3_open_v2(name.as_ptr(), &mut db, flags, vfs_ptr) };

        if rc != ffi::SQLITE_OK {
            // The engine usually hands back a handle even on failure; it holds
            // the diagnostics and still has to be released.
            let err = if db.is_null() {
                Error::from_code(rc, "failed to open database")
            } else {
                unsafe {
                    let err = Error::from_handle(db, "failed to open database", None);
                    ffi::sqlite3_close(db);
                    err
                }
            };
            debug!(name = %config.name, error = %err, "open failed");
            return Err(err);
        }

        debug!(name = %config.name, flags = ?config.flags, "opened database");
        Ok(Self {
            db: NonNull::new(db),
        })
    }

    /// Close the connection.
    ///
    /// Closing an empty connection is a no-op. If the engine refuses (for
    /// example because statements are still open, reported as
    /// [`Error::Busy`]) the handle is kept and close may be retried.
    pub fn close(&mut self) -> Result<()> {
        let Some(db) = self.db else {
            return Ok(());
        };

        let rc = unsafe { ffi::sqlite3_close(db.as_ptr()) };
        if rc != ffi::SQLITE_OK {
            let context = "failed to close connection";
            return Err(unsafe { Error::from_handle(db.as_ptr(), context, None) });
        }

        self.db = None;
        debug!("closed database");
        Ok(())
    }

    pub fn is_open(&self) -> bool {
        self.db.is_some()
    }

    /// Prepare a statement for a single or a few executions
    pub fn prepare(&self, sql: &str) -> Result<Statement> {
        Statement::prepare(self.ensure()?, sql, false)
    }

    /// Prepare a statement that will be re-executed many times
    pub fn prepare_persistent(&self, sql: &str) -> Result<Statement> {
        Statement::prepare(self.ensure()?, sql, true)
    }

    /// Run one or more SQL statements to completion, discarding any rows.
    ///
    /// Statements run in order and the first failure stops the batch. The
    /// offset of a syntax error is measured from the start of `sql`.
    pub fn exec(&self, sql: &str) -> Result<()> {
        const CONTEXT: &str = "failed to execute SQL query";

        let db = self.ensure()?;
        let c_sql = raw::to_cstring(sql)?;
        let start = c_sql.as_ptr();
        let mut tail = start;

        while unsafe { *tail } != 0 {
            let consumed = tail as usize - start as usize;
            let mut stmt = ptr::null_mut();
            let mut next = ptr::null();

            let rc = unsafe {
                ffi::sqlite3_prepare_v3(db.as_ptr(), tail, -1, 0, &mut stmt, &mut next)
            };
            if rc != ffi::SQLITE_OK {
                let err = unsafe { Error::from_handle_at(db.as_ptr(), CONTEXT, sql, consumed) };
                return Err(err);
            }
            tail = next;

            // Whitespace, comments and stray semicolons compile to nothing.
            let Some(stmt) = NonNull::new(stmt) else {
                continue;
            };

            let rc = loop {
                let rc = unsafe { ffi::sqlite3_step(stmt.as_ptr()) };
                if rc != ffi::SQLITE_ROW {
                    break rc;
                }
            };
            if rc != ffi::SQLITE_DONE {
                let err = unsafe { Error::from_handle_at(db.as_ptr(), CONTEXT, sql, consumed) };
                unsafe { ffi::sqlite3_finalize(stmt.as_ptr()) };
                return Err(err);
            }
            unsafe { ffi::sqlite3_finalize(stmt.as_ptr()) };
        }
        Ok(())
    }

    /// Rows modified by the most recent INSERT, UPDATE or DELETE
    pub fn changes(&self) -> Result<i64> {
        let db = self.ensure()?;
        Ok(unsafe { ffi::sqlite3_changes64(db.as_ptr()) })
    }

    pub fn last_insert_rowid(&self) -> Result<i64> {
        let db = self.ensure()?;
        Ok(unsafe { ffi::sqlite3_last_insert_rowid(db.as_ptr()) })
    }

    /// See [`config::is_threadsafe`]
    pub fn is_threadsafe() -> bool {
        config::is_threadsafe()
    }

    /// See [`config::configure_serialized`]
    ///
    /// # Safety
    ///
    /// Must not run concurrently with any other engine call in the process.
    pub unsafe fn configure_serialized() -> Result<()> {
        config::configure_serialized()
    }

    fn ensure(&self) -> Result<NonNull<ffi::sqlite3>> {
        self.db
            .ok_or_else(|| OtherError::ConnectionNotInitialized.into())
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        let Some(db) = self.db.take() else {
            return;
        };

        // close_v2 defers the release until outstanding statements are
        // finalized, so statements outliving the connection stay valid.
        let rc = unsafe { ffi::sqlite3_close_v2(db.as_ptr()) };
        if rc != ffi::SQLITE_OK {
            let err = Error::from_code(rc, "failed to close connection");
            warn!(error = %err, "closing connection on drop failed");
        }
    }
}

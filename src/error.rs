//! Error types for arclite
//!
//! Every failing engine call is turned into exactly one [`Error`] variant.
//! The engine's diagnostic state is read right after the failing call, before
//! any other engine call can overwrite it, and [`Error::classify`] decides the
//! variant.

use std::ffi::c_int;

use rusqlite::ffi;
use thiserror::Error;

use crate::raw;

/// Diagnostic state reported by the engine for a failed call
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{}SQLite error ({code},{extended_code}): {message}", context_prefix(.context))]
pub struct EngineError {
    /// What the library was doing when the call failed (may be empty)
    pub context: String,
    /// Message reported by the engine
    pub message: String,
    /// Primary result code
    pub code: c_int,
    /// Extended result code
    pub extended_code: c_int,
}

fn context_prefix(context: &str) -> String {
    if context.is_empty() {
        String::new()
    } else {
        format!("{}, ", context)
    }
}

/// Library-level failures the engine never reports
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OtherError {
    #[error("SQLite database connection not initialized")]
    ConnectionNotInitialized,

    #[error("SQLite statement not initialized")]
    StatementNotInitialized,

    #[error("column not found: {0}")]
    ColumnNotFound(String),

    #[error("parameter not found: {0}")]
    ParameterNotFound(String),

    #[error("column metadata not enabled, to enable, build with the `column_metadata` feature")]
    ColumnMetadataDisabled,

    #[error("unknown column type: {0}")]
    UnknownColumnType(c_int),

    #[error("string passed to SQLite contains a nul byte at position {0}")]
    InteriorNul(usize),
}

/// The main error type for arclite
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Engine-reported failure that matched no narrower kind
    #[error("{0}")]
    Sqlite(EngineError),

    /// The engine located a problem in the SQL text at `offset`
    #[error("{error}")]
    Syntax {
        error: EngineError,
        sql: String,
        offset: usize,
    },

    /// The database or a table is busy or locked
    #[error("{0}")]
    Busy(EngineError),

    /// The engine API was called in violation of its preconditions
    #[error("{0}")]
    Misuse(EngineError),

    #[error(transparent)]
    Other(#[from] OtherError),
}

/// Result type alias for arclite operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Pick the error kind for an engine failure.
    ///
    /// A non-negative `offset` for an operation that was given SQL text always
    /// wins; only then is the primary code consulted.
    pub fn classify(engine: EngineError, sql: Option<&str>, offset: c_int) -> Self {
        if let Some(sql) = sql {
            if let Ok(offset) = usize::try_from(offset) {
                return Error::Syntax {
                    error: engine,
                    sql: sql.to_string(),
                    offset,
                };
            }
        }

        match engine.code {
            ffi::SQLITE_BUSY | ffi::SQLITE_LOCKED => Error::Busy(engine),
            ffi::SQLITE_MISUSE => Error::Misuse(engine),
            _ => Error::Sqlite(engine),
        }
    }

    /// Read the error state of `db` and classify it.
    ///
    /// # Safety
    ///
    /// `db` must be a live connection handle (or NULL, which the engine
    /// reports as out of memory).
    pub(crate) unsafe fn from_handle(
        db: *mut ffi::sqlite3,
        context: &str,
        sql: Option<&str>,
    ) -> Self {
        let code = ffi::sqlite3_errcode(db);
        let extended_code = ffi::sqlite3_extended_errcode(db);
        let message = raw::to_string(ffi::sqlite3_errmsg(db)).unwrap_or_default();
        let offset = if sql.is_some() {
            ffi::sqlite3_error_offset(db)
        } else {
            -1
        };

        let engine = EngineError {
            context: context.to_string(),
            message,
            code,
            extended_code,
        };
        Self::classify(engine, sql, offset)
    }

    /// Like [`Error::from_handle`] for a failure in the part of `sql` that
    /// starts at byte `consumed`; a syntax error offset is moved to count from
    /// the start of `sql`.
    ///
    /// # Safety
    ///
    /// Same as [`Error::from_handle`].
    pub(crate) unsafe fn from_handle_at(
        db: *mut ffi::sqlite3,
        context: &str,
        sql: &str,
        consumed: usize,
    ) -> Self {
        let mut err = Self::from_handle(db, context, Some(sql));
        if let Error::Syntax { offset, .. } = &mut err {
            *offset += consumed;
        }
        err
    }

    /// Classify a bare result code, for calls that have no connection to
    /// inspect.
    pub(crate) fn from_code(rc: c_int, context: &str) -> Self {
        let message = unsafe { raw::to_string(ffi::sqlite3_errstr(rc)) }.unwrap_or_default();
        let engine = EngineError {
            context: context.to_string(),
            message,
            code: rc & 0xff,
            extended_code: rc,
        };
        Self::classify(engine, None, -1)
    }

    /// The engine payload, for every kind except [`Error::Other`]
    pub fn engine(&self) -> Option<&EngineError> {
        match self {
            Error::Sqlite(e) | Error::Busy(e) | Error::Misuse(e) => Some(e),
            Error::Syntax { error, .. } => Some(error),
            Error::Other(_) => None,
        }
    }

    /// Primary result code, if the engine reported this error
    pub fn code(&self) -> Option<c_int> {
        self.engine().map(|e| e.code)
    }

    /// Extended result code, if the engine reported this error
    pub fn extended_code(&self) -> Option<c_int> {
        self.engine().map(|e| e.extended_code)
    }

    pub fn is_busy(&self) -> bool {
        matches!(self, Error::Busy(_))
    }

    pub fn is_syntax(&self) -> bool {
        matches!(self, Error::Syntax { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine(code: c_int) -> EngineError {
        EngineError {
            context: "failed to prepare statement".to_string(),
            message: "near \"SELEC\": syntax error".to_string(),
            code,
            extended_code: code,
        }
    }

    #[test]
    fn test_error_display() {
        let err = Error::Sqlite(engine(ffi::SQLITE_ERROR));
        assert_eq!(
            err.to_string(),
            "failed to prepare statement, SQLite error (1,1): near \"SELEC\": syntax error"
        );

        let err = Error::Sqlite(EngineError {
            context: String::new(),
            message: "database is locked".to_string(),
            code: 5,
            extended_code: 517,
        });
        assert_eq!(err.to_string(), "SQLite error (5,517): database is locked");

        let err = Error::Other(OtherError::ColumnNotFound("email".to_string()));
        assert_eq!(err.to_string(), "column not found: email");
    }

    #[test]
    fn test_offset_takes_priority() {
        let err = Error::classify(engine(ffi::SQLITE_BUSY), Some("SELEC 1"), 0);
        match err {
            Error::Syntax { sql, offset, error } => {
                assert_eq!(sql, "SELEC 1");
                assert_eq!(offset, 0);
                assert_eq!(error.code, ffi::SQLITE_BUSY);
            }
            other => panic!("expected syntax error, got {:?}", other),
        }
    }

    #[test]
    fn test_offset_ignored_without_sql() {
        let err = Error::classify(engine(ffi::SQLITE_ERROR), None, 4);
        assert!(matches!(err, Error::Sqlite(_)));
    }

    #[test]
    fn test_code_dispatch() {
        assert!(Error::classify(engine(ffi::SQLITE_BUSY), Some("x"), -1).is_busy());
        assert!(Error::classify(engine(ffi::SQLITE_LOCKED), None, -1).is_busy());
        assert!(matches!(
            Error::classify(engine(ffi::SQLITE_MISUSE), None, -1),
            Error::Misuse(_)
        ));
        assert!(matches!(
            Error::classify(engine(ffi::SQLITE_CONSTRAINT), None, -1),
            Error::Sqlite(_)
        ));
    }

    #[test]
    fn test_from_code() {
        let err = Error::from_code(ffi::SQLITE_MISUSE, "failed to configure");
        assert!(matches!(err, Error::Misuse(_)));
        assert_eq!(err.code(), Some(ffi::SQLITE_MISUSE));
        let message = err.to_string();
        assert!(message.starts_with("failed to configure, SQLite error (21,21): "));
    }

    #[test]
    fn test_accessors() {
        let err = Error::classify(
            EngineError {
                context: String::new(),
                message: "UNIQUE constraint failed: users.id".to_string(),
                code: ffi::SQLITE_CONSTRAINT,
                extended_code: 2067,
            },
            None,
            -1,
        );
        assert_eq!(err.code(), Some(19));
        assert_eq!(err.extended_code(), Some(2067));
        assert!(!err.is_syntax());

        let err: Error = OtherError::StatementNotInitialized.into();
        assert_eq!(err.engine(), None);
        assert_eq!(err.code(), None);
    }
}

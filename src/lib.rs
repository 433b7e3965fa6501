//! arclite - safe ownership and typed access over the SQLite C API
//!
//! This library wraps the engine's native handles:
//! - Connections (open, close, exec, prepare)
//! - Prepared statements (bind, step, reset, column introspection)
//! - Column and parameter views with typed reads and writes
//! - A structured error taxonomy built from the engine's diagnostics
//!
//! ```
//! use arclite::{Connection, DataType};
//!
//! let conn = Connection::open_in_memory()?;
//! conn.exec("CREATE TABLE users (name TEXT, age INTEGER)")?;
//!
//! let mut insert = conn.prepare("INSERT INTO users VALUES (:name, :age)")?;
//! for (name, age) in [("Alice", 42), ("Bob", 69)] {
//!     insert.reuse()?;
//!     insert.bind(":name", name)?;
//!     insert.bind(":age", age)?;
//!     insert.step()?;
//! }
//!
//! let mut query = conn.prepare("SELECT name, age FROM users WHERE age > ?")?;
//! query.bind(1, 50)?;
//! while query.step()? {
//!     assert_eq!(query.column_type("age")?, DataType::Integer);
//!     assert_eq!(query.get_string("name")?, "Bob");
//! }
//! # Ok::<_, arclite::Error>(())
//! ```
//!
//! Every connection is opened in the engine's serialized mode, so a
//! [`Connection`] may move to another thread while its statements stay
//! behind. See also [`connection::config::configure_serialized`].

pub mod connection;
pub mod error;
pub mod statement;
pub mod types;

mod raw;

pub use connection::{Connection, ConnectionConfig, OpenFlags};
pub use error::{EngineError, Error, OtherError, Result};
pub use statement::{
    Bind, BindAll, Column, ColumnIndex, FromColumn, ParamIndex, Parameter, Statement,
};
pub use types::{Blob, DataType, Value};

//! Connection configuration
//!
//! Open flags, the connection builder, and the process-wide threading mode
//! pass-through.

use std::ffi::c_int;
use std::ops::{BitOr, BitOrAssign};

use rusqlite::ffi;

use crate::error::{Error, Result};

/// Flags controlling how a database is opened.
///
/// Bit values are our own; [`OpenFlags::to_native`] maps them onto the
/// engine's `SQLITE_OPEN_*` bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct OpenFlags(u32);

impl OpenFlags {
    pub const NONE: OpenFlags = OpenFlags(0);
    pub const READ_ONLY: OpenFlags = OpenFlags(1 << 0);
    pub const READ_WRITE: OpenFlags = OpenFlags(1 << 1);
    pub const CREATE: OpenFlags = OpenFlags(1 << 2);
    pub const URI: OpenFlags = OpenFlags(1 << 3);
    pub const MEMORY: OpenFlags = OpenFlags(1 << 4);
    pub const NO_MUTEX: OpenFlags = OpenFlags(1 << 5);
    pub const FULL_MUTEX: OpenFlags = OpenFlags(1 << 6);
    pub const SHARED_CACHE: OpenFlags = OpenFlags(1 << 7);
    pub const PRIVATE_CACHE: OpenFlags = OpenFlags(1 << 8);
    pub const NO_FOLLOW: OpenFlags = OpenFlags(1 << 9);

    const NATIVE: [(OpenFlags, c_int); 10] = [
        (OpenFlags::READ_ONLY, ffi::SQLITE_OPEN_READONLY),
        (OpenFlags::READ_WRITE, ffi::SQLITE_OPEN_READWRITE),
        (OpenFlags::CREATE, ffi::SQLITE_OPEN_CREATE),
        (OpenFlags::URI, ffi::SQLITE_OPEN_URI),
        (OpenFlags::MEMORY, ffi::SQLITE_OPEN_MEMORY),
        (OpenFlags::NO_MUTEX, ffi::SQLITE_OPEN_NOMUTEX),
        (OpenFlags::FULL_MUTEX, ffi::SQLITE_OPEN_FULLMUTEX),
        (OpenFlags::SHARED_CACHE, ffi::SQLITE_OPEN_SHAREDCACHE),
        (OpenFlags::PRIVATE_CACHE, ffi::SQLITE_OPEN_PRIVATECACHE),
        (OpenFlags::NO_FOLLOW, ffi::SQLITE_OPEN_NOFOLLOW),
    ];

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn contains(self, other: OpenFlags) -> bool {
        self.0 & other.0 == other.0
    }

    /// Translate to the engine's flag bits.
    ///
    /// The engine refuses to open without an access mode, so when neither
    /// `READ_ONLY` nor `READ_WRITE` is set the engine default
    /// `READ_WRITE | CREATE` is added.
    pub fn to_native(self) -> c_int {
        let mut native = Self::NATIVE
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .fold(0, |acc, (_, bits)| acc | bits);

        if !self.contains(OpenFlags::READ_ONLY) && !self.contains(OpenFlags::READ_WRITE) {
            native |= ffi::SQLITE_OPEN_READWRITE | ffi::SQLITE_OPEN_CREATE;
        }
        native
    }
}

impl BitOr for OpenFlags {
    type Output = OpenFlags;

    fn bitor(self, rhs: OpenFlags) -> OpenFlags {
        OpenFlags(self.0 | rhs.0)
    }
}

impl BitOrAssign for OpenFlags {
    fn bitor_assign(&mut self, rhs: OpenFlags) {
        self.0 |= rhs.0;
    }
}

/// Name of the private in-memory database
pub const MEMORY_DATABASE: &str = ":memory:";

/// Connection configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// Database file name, URI (with [`OpenFlags::URI`]) or `:memory:`
    pub name: String,
    /// Open flags
    pub flags: OpenFlags,
    /// Name of the VFS module to use, engine default when `None`
    pub vfs: Option<String>,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            name: MEMORY_DATABASE.to_string(),
            flags: OpenFlags::NONE,
            vfs: None,
        }
    }
}

impl ConnectionConfig {
    /// Create a config for the database `name` with default flags
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Set the open flags
    pub fn flags(mut self, flags: OpenFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Set the VFS module name
    pub fn vfs(mut self, vfs: impl Into<String>) -> Self {
        self.vfs = Some(vfs.into());
        self
    }

    /// Engine flags the connection is opened with.
    ///
    /// A [`Connection`](crate::Connection) may move to another thread while
    /// its statements stay behind, so every connection runs serialized and
    /// `NO_MUTEX` is replaced by the full mutex.
    pub fn native_flags(&self) -> c_int {
        let native = self.flags.to_native() & !ffi::SQLITE_OPEN_NOMUTEX;
        native | ffi::SQLITE_OPEN_FULLMUTEX
    }
}

/// Whether the engine was compiled with thread-safety support
pub fn is_threadsafe() -> bool {
    unsafe { ffi::sqlite3_threadsafe() != 0 }
}

/// Switch the engine into serialized threading mode.
///
/// The engine only accepts this before it is initialized, that is before the
/// first connection is opened; afterwards it reports [`Error::Misuse`].
///
/// # Safety
///
/// Must not run concurrently with any other engine call in the process.
pub unsafe fn configure_serialized() -> Result<()> {
    let rc = ffi::sqlite3_config(ffi::SQLITE_CONFIG_SERIALIZED);
    if rc != ffi::SQLITE_OK {
        return Err(Error::from_code(
            rc,
            "failed to configure SQLite for serialized threading mode",
        ));
    }
    tracing::debug!("configured serialized threading mode");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_combine() {
        let flags = OpenFlags::READ_WRITE | OpenFlags::CREATE;
        assert!(flags.contains(OpenFlags::READ_WRITE));
        assert!(flags.contains(OpenFlags::CREATE));
        assert!(!flags.contains(OpenFlags::READ_ONLY));

        let mut flags = OpenFlags::NONE;
        assert!(flags.is_empty());
        flags |= OpenFlags::NO_FOLLOW;
        assert_eq!(flags.bits(), 1 << 9);
    }

    #[test]
    fn test_to_native() {
        let native = OpenFlags::READ_ONLY.to_native();
        assert_eq!(native, ffi::SQLITE_OPEN_READONLY);

        let flags = OpenFlags::READ_WRITE | OpenFlags::URI | OpenFlags::FULL_MUTEX;
        assert_eq!(
            flags.to_native(),
            ffi::SQLITE_OPEN_READWRITE | ffi::SQLITE_OPEN_URI | ffi::SQLITE_OPEN_FULLMUTEX
        );

        let flags = OpenFlags::SHARED_CACHE
            | OpenFlags::PRIVATE_CACHE
            | OpenFlags::NO_MUTEX
            | OpenFlags::READ_WRITE;
        assert_eq!(
            flags.to_native(),
            ffi::SQLITE_OPEN_SHAREDCACHE
                | ffi::SQLITE_OPEN_PRIVATECACHE
                | ffi::SQLITE_OPEN_NOMUTEX
                | ffi::SQLITE_OPEN_READWRITE
        );
    }

    #[test]
    fn test_native_flags_always_serialized() {
        let config = ConnectionConfig::default().flags(OpenFlags::NO_MUTEX);
        let native = config.native_flags();
        assert_eq!(native & ffi::SQLITE_OPEN_NOMUTEX, 0);
        assert_ne!(native & ffi::SQLITE_OPEN_FULLMUTEX, 0);
        assert_ne!(native & ffi::SQLITE_OPEN_READWRITE, 0);

        let config = ConnectionConfig::default().flags(OpenFlags::READ_ONLY);
        assert_eq!(
            config.native_flags(),
            ffi::SQLITE_OPEN_READONLY | ffi::SQLITE_OPEN_FULLMUTEX
        );
    }

    #[test]
    fn test_to_native_default_access_mode() {
        assert_eq!(
            OpenFlags::NONE.to_native(),
            ffi::SQLITE_OPEN_READWRITE | ffi::SQLITE_OPEN_CREATE
        );
        assert_eq!(
            OpenFlags::MEMORY.to_native(),
            ffi::SQLITE_OPEN_MEMORY | ffi::SQLITE_OPEN_READWRITE | ffi::SQLITE_OPEN_CREATE
        );
    }

    #[test]
    fn test_config_builder() {
        let config = ConnectionConfig::new("app.db")
            .flags(OpenFlags::READ_ONLY)
            .vfs("unix-none");
        assert_eq!(config.name, "app.db");
        assert_eq!(config.flags, OpenFlags::READ_ONLY);
        assert_eq!(config.vfs.as_deref(), Some("unix-none"));

        let config = ConnectionConfig::default();
        assert_eq!(config.name, MEMORY_DATABASE);
        assert!(config.flags.is_empty());
    }
}

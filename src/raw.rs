//! Helpers for crossing the C boundary
//!
//! Conversions between Rust strings/indices and the pointer and `c_int`
//! shapes the SQLite API expects.

use std::ffi::{c_char, c_int, CStr, CString};

use crate::error::{OtherError, Result};

/// Copy a nul-terminated engine string. `None` when the engine returned NULL.
///
/// # Safety
///
/// `ptr` must be NULL or point to a nul-terminated string that stays valid for
/// the duration of the call.
pub(crate) unsafe fn to_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    Some(CStr::from_ptr(ptr).to_string_lossy().into_owned())
}

/// Build a nul-terminated copy of `s` for the engine.
pub(crate) fn to_cstring(s: &str) -> Result<CString> {
    CString::new(s).map_err(|e| OtherError::InteriorNul(e.nul_position()).into())
}

/// Indices beyond `c_int` are passed as `c_int::MAX`, which the engine treats
/// as out of range like any other invalid index.
pub(crate) fn to_c_index(index: usize) -> c_int {
    c_int::try_from(index).unwrap_or(c_int::MAX)
}

//! Raw SQLite types and the auto-extension calling convention.

#![allow(non_camel_case_types)]

use std::mem;
use std::os::raw::{c_char, c_int, c_void};

/// Opaque SQLite connection handle.
#[repr(C)]
pub struct sqlite3 {
    _private: [u8; 0],
}

/// The host's API routine table. Never dereferenced here.
pub type sqlite3_api_routines = c_void;

pub const SQLITE_OK: c_int = 0;
pub const SQLITE_ERROR: c_int = 1;
pub const SQLITE_NOMEM: c_int = 7;

/// Signature SQLite actually calls every auto-extension with.
pub type RawEntryPoint = unsafe extern "C" fn(
    db: *mut sqlite3,
    pz_err_msg: *mut *mut c_char,
    p_api: *const sqlite3_api_routines,
) -> c_int;

/// Signature `sqlite3_auto_extension` is declared with (`void (*)(void)`).
pub type GenericEntryPoint = unsafe extern "C" fn();

/// Casts an entry point to the generic signature expected by `sqlite3_auto_extension`.
///
/// SQLite stores the pointer opaquely and always calls it back as a [`RawEntryPoint`], so the
/// conversion only changes the declared type. This is the single place the registration side of
/// that cast happens.
pub fn erase_entry_point(entry: RawEntryPoint) -> GenericEntryPoint {
    // SAFETY: both are `extern "C"` function pointers of the same size; the value is only called
    // after `restore_entry_point` (or by SQLite) with the three-argument convention.
    unsafe { mem::transmute::<RawEntryPoint, GenericEntryPoint>(entry) }
}

/// Recovers the real calling convention of a pointer produced by [`erase_entry_point`].
///
/// # Safety
/// `entry` must have been produced by [`erase_entry_point`]; calling the result for any other
/// pointer is undefined behavior.
pub unsafe fn restore_entry_point(entry: GenericEntryPoint) -> RawEntryPoint {
    // SAFETY: the caller guarantees `entry` started life as a `RawEntryPoint`.
    unsafe { mem::transmute::<GenericEntryPoint, RawEntryPoint>(entry) }
}

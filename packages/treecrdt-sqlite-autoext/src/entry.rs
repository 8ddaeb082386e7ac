//! Extension entry points and the hook that forwards to them.

use std::os::raw::{c_char, c_int};

use crate::ffi::{sqlite3, sqlite3_api_routines, RawEntryPoint};

/// An extension initializer with SQLite's `xEntryPoint` convention.
pub trait EntryPoint {
    /// Installs the extension on `db`. Returns `SQLITE_OK` on success; on failure may write a
    /// message into `*pz_err_msg`, allocated the way the host frees it.
    ///
    /// # Safety
    /// Called by the host with a live connection handle and a writable error slot. `p_api` may
    /// be null or a sentinel.
    unsafe fn init(
        db: *mut sqlite3,
        pz_err_msg: *mut *mut c_char,
        p_api: *const sqlite3_api_routines,
    ) -> c_int;
}

/// The hook registered with the host. Passes its arguments through untouched and returns the
/// entry point's status as-is; `p_api` is never dereferenced here.
pub unsafe extern "C" fn forward<E: EntryPoint>(
    db: *mut sqlite3,
    pz_err_msg: *mut *mut c_char,
    p_api: *const sqlite3_api_routines,
) -> c_int {
    unsafe { E::init(db, pz_err_msg, p_api) }
}

/// The forwarding hook for `E`.
///
/// Hosts de-duplicate hooks by address. Entry points whose `init` bodies compile to identical
/// code may be merged into one function and share a hook address, in which case the host keeps
/// only the first; only entry points with distinct bodies get distinct hooks.
pub fn hook<E: EntryPoint>() -> RawEntryPoint {
    forward::<E>
}

#[cfg(feature = "static-link")]
mod treecrdt {
    use std::os::raw::{c_char, c_int};

    use super::EntryPoint;
    use crate::ffi::{sqlite3, sqlite3_api_routines};

    extern "C" {
        // Provided by the TreeCRDT extension static library; the static-link build ignores
        // `p_api`.
        fn sqlite3_treecrdt_init(
            db: *mut sqlite3,
            pz_err_msg: *mut *mut c_char,
            p_api: *const sqlite3_api_routines,
        ) -> c_int;
    }

    /// The statically linked TreeCRDT extension.
    pub struct TreeCrdtInit;

    impl EntryPoint for TreeCrdtInit {
        unsafe fn init(
            db: *mut sqlite3,
            pz_err_msg: *mut *mut c_char,
            p_api: *const sqlite3_api_routines,
        ) -> c_int {
            unsafe { sqlite3_treecrdt_init(db, pz_err_msg, p_api) }
        }
    }

    // Keep the init symbol referenced in static-link builds.
    #[used]
    static _TREECRDT_INIT_REF: unsafe extern "C" fn(
        *mut sqlite3,
        *mut *mut c_char,
        *const sqlite3_api_routines,
    ) -> c_int = sqlite3_treecrdt_init;
}

#[cfg(feature = "static-link")]
pub use treecrdt::TreeCrdtInit;

#![cfg(feature = "static-link")]
//! Process-wide surface of static-link builds. Run with `--features static-link`; the TreeCRDT
//! entry point is stood in for by a symbol defined here.

use std::os::raw::{c_char, c_int};
use std::sync::atomic::{AtomicUsize, Ordering};

use rusqlite::Connection;
use treecrdt_sqlite_autoext::ffi::{sqlite3, sqlite3_api_routines, SQLITE_OK};
use treecrdt_sqlite_autoext::{
    is_registered, register, treecrdt_register_auto, Registration, SqliteHost,
};

static INIT_CALLS: AtomicUsize = AtomicUsize::new(0);

#[no_mangle]
pub unsafe extern "C" fn sqlite3_treecrdt_init(
    _db: *mut sqlite3,
    _pz_err_msg: *mut *mut c_char,
    _p_api: *const sqlite3_api_routines,
) -> c_int {
    INIT_CALLS.fetch_add(1, Ordering::SeqCst);
    SQLITE_OK
}

#[test]
fn c_entry_registers_once_for_all_later_connections() {
    SqliteHost::initialize().unwrap();
    assert!(!is_registered());

    assert_eq!(treecrdt_register_auto(), SQLITE_OK);
    assert_eq!(treecrdt_register_auto(), SQLITE_OK);
    assert!(is_registered());
    assert_eq!(register().unwrap(), Registration::AlreadyInstalled);

    let _first = Connection::open_in_memory().unwrap();
    assert_eq!(INIT_CALLS.load(Ordering::SeqCst), 1);

    let _second = Connection::open_in_memory().unwrap();
    assert_eq!(INIT_CALLS.load(Ordering::SeqCst), 2);
}

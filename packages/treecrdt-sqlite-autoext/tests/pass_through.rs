use std::os::raw::c_char;
use std::ptr::null_mut;

use proptest::prelude::*;
use treecrdt_sqlite_autoext::ffi::{sqlite3, sqlite3_api_routines, SQLITE_ERROR};
use treecrdt_sqlite_autoext::hook;
use treecrdt_test_support::{recording_entry, write_error_message};

recording_entry!(Forwarded);

proptest! {
    #[test]
    fn hook_forwards_arguments_and_status(
        db in 1usize..usize::MAX,
        api in prop_oneof![Just(0usize), Just(1usize), any::<usize>()],
        status in any::<i32>(),
    ) {
        let recorder = Forwarded::recorder();
        recorder.reset();
        recorder.set_status(status);

        let mut slot: *mut c_char = null_mut();
        let slot_ptr: *mut *mut c_char = &mut slot;
        let rc = unsafe {
            hook::<Forwarded>()(
                db as *mut sqlite3,
                slot_ptr,
                api as *const sqlite3_api_routines,
            )
        };

        prop_assert_eq!(rc, status);
        let calls = recorder.calls();
        prop_assert_eq!(calls.len(), 1);
        prop_assert_eq!(calls[0].db, db);
        prop_assert_eq!(calls[0].err_slot, slot_ptr as usize);
        prop_assert_eq!(calls[0].api, api);
        prop_assert!(slot.is_null());
    }
}

recording_entry!(Failing);

#[test]
fn hook_leaves_error_message_as_written() {
    let recorder = Failing::recorder();
    recorder.fail_call(0, SQLITE_ERROR, Some("conflict: node already merged"));

    let mut slot: *mut c_char = null_mut();
    let rc = unsafe { hook::<Failing>()(0x40 as *mut sqlite3, &mut slot, std::ptr::null()) };
    assert_eq!(rc, SQLITE_ERROR);
    assert!(!slot.is_null());

    let message = unsafe { std::ffi::CString::from_raw(slot) };
    assert_eq!(message.to_str().unwrap(), "conflict: node already merged");

    // A null slot is tolerated by the writer.
    unsafe { write_error_message(null_mut(), "ignored") };
}

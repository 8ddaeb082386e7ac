//! Test doubles for the auto-extension registrar: a stub host engine that opens fake
//! connections and runs its registered hooks, and recording entry points.
//!
//! Error messages travel with the `CString::into_raw` convention: entry points write them with
//! [`write_error_message`] and the stub engine takes them back.

use std::ffi::CString;
use std::os::raw::{c_char, c_int};
use std::ptr::null_mut;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use thiserror::Error;
use treecrdt_sqlite_autoext::ffi::{restore_entry_point, GenericEntryPoint, SQLITE_OK};

pub use treecrdt_sqlite_autoext::ffi::{sqlite3, sqlite3_api_routines};
pub use treecrdt_sqlite_autoext::EntryPoint;

pub const SQLITE_MISUSE: c_int = 21;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("open failed (rc={rc}): {}", .message.as_deref().unwrap_or("no message"))]
pub struct OpenError {
    pub rc: c_int,
    /// Address of the connection handle the hooks saw; 0 if none was allocated.
    pub db: usize,
    pub message: Option<String>,
}

struct EngineState {
    initialized: bool,
    dedup: bool,
    extensions: Vec<GenericEntryPoint>,
    install_calls: usize,
    fail_next_install: Option<c_int>,
    api_table: usize,
    next_id: u64,
}

/// In-process stand-in for SQLite's auto-extension list.
///
/// Clones share the same engine, so one handle can go into a `Registrar` while the test keeps
/// another to open connections and inspect state.
#[derive(Clone)]
pub struct StubEngine {
    inner: Arc<Mutex<EngineState>>,
}

impl Default for StubEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl StubEngine {
    /// An uninitialized engine that de-duplicates hooks by pointer identity, like SQLite.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(EngineState {
                initialized: false,
                dedup: true,
                extensions: Vec::new(),
                install_calls: 0,
                fail_next_install: None,
                api_table: 0,
                next_id: 1,
            })),
        }
    }

    /// An engine that keeps every registration, duplicates included.
    pub fn without_dedup() -> Self {
        let engine = Self::new();
        engine.state().dedup = false;
        engine
    }

    fn state(&self) -> MutexGuard<'_, EngineState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn initialize(&self) {
        self.state().initialized = true;
    }

    pub fn is_initialized(&self) -> bool {
        self.state().initialized
    }

    /// Makes the next `auto_extension` call fail with `rc` without registering anything.
    pub fn fail_next_install(&self, rc: c_int) {
        self.state().fail_next_install = Some(rc);
    }

    /// Value handed to hooks as the capability table pointer. Defaults to null.
    pub fn set_api_table(&self, sentinel: usize) {
        self.state().api_table = sentinel;
    }

    pub fn install_calls(&self) -> usize {
        self.state().install_calls
    }

    pub fn registered(&self) -> usize {
        self.state().extensions.len()
    }

    /// Opens a connection and runs every registered hook on it, in registration order, stopping
    /// at the first failure.
    pub fn open(&self) -> Result<StubConnection, OpenError> {
        let (extensions, api_table, id) = {
            let mut state = self.state();
            if !state.initialized {
                return Err(OpenError {
                    rc: SQLITE_MISUSE,
                    db: 0,
                    message: Some("engine not initialized".to_string()),
                });
            }
            let id = state.next_id;
            state.next_id += 1;
            (state.extensions.clone(), state.api_table, id)
        };

        let mut conn = StubConnection {
            db: Box::new(StubDb { id }),
        };
        let db = conn.handle();
        for entry in extensions {
            // SAFETY: only `auto_extension` fills the list, and it is only handed pointers
            // erased from the three-argument convention.
            let entry = unsafe { restore_entry_point(entry) };
            let mut err: *mut c_char = null_mut();
            let rc = unsafe { entry(db, &mut err, api_table as *const sqlite3_api_routines) };
            let message = unsafe { take_error_message(err) };
            if rc != SQLITE_OK {
                return Err(OpenError {
                    rc,
                    db: db as usize,
                    message,
                });
            }
        }
        Ok(conn)
    }
}

impl treecrdt_sqlite_autoext::AutoExtensionHost for StubEngine {
    unsafe fn auto_extension(&self, entry: GenericEntryPoint) -> c_int {
        let mut state = self.state();
        state.install_calls += 1;
        if let Some(rc) = state.fail_next_install.take() {
            return rc;
        }
        let known = state
            .extensions
            .iter()
            .any(|existing| *existing as usize == entry as usize);
        if !(state.dedup && known) {
            state.extensions.push(entry);
        }
        SQLITE_OK
    }
}

struct StubDb {
    id: u64,
}

/// A connection opened by [`StubEngine`]. Its handle stays valid while it is alive.
pub struct StubConnection {
    db: Box<StubDb>,
}

impl StubConnection {
    pub fn id(&self) -> u64 {
        self.db.id
    }

    pub fn handle(&mut self) -> *mut sqlite3 {
        (&mut *self.db as *mut StubDb).cast()
    }

    pub fn handle_addr(&self) -> usize {
        &*self.db as *const StubDb as usize
    }
}

/// Writes `message` into an error slot for [`StubEngine`] to collect.
///
/// # Safety
/// `pz_err_msg` must be null or point to a writable slot.
pub unsafe fn write_error_message(pz_err_msg: *mut *mut c_char, message: &str) {
    if pz_err_msg.is_null() {
        return;
    }
    let msg = CString::new(message.replace('\0', "")).unwrap_or_default();
    unsafe { *pz_err_msg = msg.into_raw() };
}

unsafe fn take_error_message(err: *mut c_char) -> Option<String> {
    if err.is_null() {
        return None;
    }
    let msg = unsafe { CString::from_raw(err) };
    Some(msg.to_string_lossy().into_owned())
}

/// One invocation of a recording entry point, pointers kept as addresses.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Call {
    pub db: usize,
    pub err_slot: usize,
    pub api: usize,
}

struct Scripted {
    index: usize,
    rc: c_int,
    message: Option<String>,
}

/// Backing state for entry points defined with [`recording_entry!`].
pub struct Recorder {
    calls: Mutex<Vec<Call>>,
    scripted: Mutex<Vec<Scripted>>,
    status: Mutex<c_int>,
}

impl Default for Recorder {
    fn default() -> Self {
        Self::new()
    }
}

impl Recorder {
    pub const fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            scripted: Mutex::new(Vec::new()),
            status: Mutex::new(SQLITE_OK),
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Makes the `index`-th call (zero-based) return `rc` and write `message`.
    pub fn fail_call(&self, index: usize, rc: c_int, message: Option<&str>) {
        self.scripted
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Scripted {
                index,
                rc,
                message: message.map(str::to_string),
            });
    }

    /// Status returned by calls with nothing scripted. Defaults to `SQLITE_OK`.
    pub fn set_status(&self, rc: c_int) {
        *self.status.lock().unwrap_or_else(PoisonError::into_inner) = rc;
    }

    pub fn reset(&self) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        self.scripted
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        self.set_status(SQLITE_OK);
    }

    /// Records the call and returns the scripted outcome.
    ///
    /// # Safety
    /// `pz_err_msg` must be null or writable. `db` and `p_api` are only recorded.
    pub unsafe fn record(
        &self,
        db: *mut sqlite3,
        pz_err_msg: *mut *mut c_char,
        p_api: *const sqlite3_api_routines,
    ) -> c_int {
        let index = {
            let mut calls = self.calls.lock().unwrap_or_else(PoisonError::into_inner);
            calls.push(Call {
                db: db as usize,
                err_slot: pz_err_msg as usize,
                api: p_api as usize,
            });
            calls.len() - 1
        };

        let scripted = self.scripted.lock().unwrap_or_else(PoisonError::into_inner);
        match scripted.iter().find(|s| s.index == index) {
            Some(s) => {
                if let Some(message) = &s.message {
                    unsafe { write_error_message(pz_err_msg, message) };
                }
                s.rc
            }
            None => *self.status.lock().unwrap_or_else(PoisonError::into_inner),
        }
    }
}

/// Defines a unit struct implementing `EntryPoint` that records into its own static
/// [`Recorder`], reachable through `Name::recorder()`.
#[macro_export]
macro_rules! recording_entry {
    ($vis:vis $name:ident) => {
        $vis struct $name;

        impl $name {
            pub fn recorder() -> &'static $crate::Recorder {
                static RECORDER: $crate::Recorder = $crate::Recorder::new();
                &RECORDER
            }
        }

        impl $crate::EntryPoint for $name {
            unsafe fn init(
                db: *mut $crate::sqlite3,
                pz_err_msg: *mut *mut ::std::os::raw::c_char,
                p_api: *const $crate::sqlite3_api_routines,
            ) -> ::std::os::raw::c_int {
                unsafe { Self::recorder().record(db, pz_err_msg, p_api) }
            }
        }
    };
}

use std::marker::PhantomData;
use std::os::raw::c_int;
use std::sync::{Mutex, PoisonError};

use crate::entry::{hook, EntryPoint};
use crate::error::{Error, Result};
use crate::ffi::{erase_entry_point, SQLITE_OK};
use crate::host::AutoExtensionHost;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RegistrationState {
    Unregistered,
    Registered,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Registration {
    /// This call handed the hook to the host.
    Installed,
    /// An earlier call already installed it; the host was not called again.
    AlreadyInstalled,
}

/// Installs the forwarding hook for `E` into `H`'s auto-extension list, at most once.
///
/// Meant to live in a `static` and be driven from the embedder's startup sequence, after the
/// host's global initialization and before the connections that should carry the extension are
/// opened. Connections opened earlier are not instrumented retroactively.
pub struct Registrar<H, E> {
    host: H,
    state: Mutex<RegistrationState>,
    _entry: PhantomData<fn() -> E>,
}

impl<H: AutoExtensionHost, E: EntryPoint> Registrar<H, E> {
    /// A registrar in the `Unregistered` state; usable in a `static`.
    pub const fn new(host: H) -> Self {
        Self {
            host,
            state: Mutex::new(RegistrationState::Unregistered),
            _entry: PhantomData,
        }
    }

    /// The host the hook is installed into.
    pub fn host(&self) -> &H {
        &self.host
    }

    /// Current registration state.
    pub fn state(&self) -> RegistrationState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether a `register` call has succeeded.
    pub fn is_registered(&self) -> bool {
        self.state() == RegistrationState::Registered
    }

    /// Registers the hook with the host.
    ///
    /// The guard is checked and set under the state lock, so concurrent or repeated calls reach
    /// the host at most once. A host failure is returned and leaves the registrar
    /// `Unregistered`; without the hook no connection would ever load the extension.
    pub fn register(&self) -> Result<Registration> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if *state == RegistrationState::Registered {
            tracing::debug!("treecrdt auto-extension already registered");
            return Ok(Registration::AlreadyInstalled);
        }

        // The host declares its callback as `void (*)(void)` but always invokes it with the
        // three-argument entry point convention; `erase_entry_point` is that cast.
        let entry = erase_entry_point(hook::<E>());
        let rc = unsafe { self.host.auto_extension(entry) };
        if rc != SQLITE_OK {
            tracing::error!(rc, "failed to register treecrdt auto-extension");
            return Err(Error::Install { rc });
        }

        *state = RegistrationState::Registered;
        tracing::info!("registered treecrdt auto-extension");
        Ok(Registration::Installed)
    }

    /// [`Registrar::register`] as a SQLite result code: `SQLITE_OK` when the hook is installed
    /// (by this call or an earlier one), the host's code otherwise.
    pub fn register_rc(&self) -> c_int {
        match self.register() {
            Ok(_) => SQLITE_OK,
            Err(err) => err.rc(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ffi::{sqlite3, sqlite3_api_routines, GenericEntryPoint, SQLITE_NOMEM};
    use std::cell::{Cell, RefCell};
    use std::os::raw::c_char;

    #[derive(Default)]
    struct CountingHost {
        installs: RefCell<Vec<usize>>,
        fail_with: Cell<Option<c_int>>,
    }

    impl AutoExtensionHost for CountingHost {
        unsafe fn auto_extension(&self, entry: GenericEntryPoint) -> c_int {
            if let Some(rc) = self.fail_with.take() {
                return rc;
            }
            self.installs.borrow_mut().push(entry as usize);
            SQLITE_OK
        }
    }

    struct Noop;

    impl EntryPoint for Noop {
        unsafe fn init(
            _db: *mut sqlite3,
            _pz_err_msg: *mut *mut c_char,
            _p_api: *const sqlite3_api_routines,
        ) -> c_int {
            SQLITE_OK
        }
    }

    #[test]
    fn installs_once() {
        let registrar: Registrar<_, Noop> = Registrar::new(CountingHost::default());
        assert_eq!(registrar.state(), RegistrationState::Unregistered);

        assert_eq!(registrar.register().unwrap(), Registration::Installed);
        assert_eq!(registrar.register().unwrap(), Registration::AlreadyInstalled);
        assert!(registrar.is_registered());

        assert_eq!(registrar.host().installs.borrow().len(), 1);
    }

    #[test]
    fn host_failure_is_returned_and_can_be_retried() {
        let host = CountingHost::default();
        host.fail_with.set(Some(SQLITE_NOMEM));
        let registrar: Registrar<_, Noop> = Registrar::new(host);

        assert_eq!(registrar.register(), Err(Error::Install { rc: SQLITE_NOMEM }));
        assert_eq!(registrar.state(), RegistrationState::Unregistered);
        assert!(registrar.host().installs.borrow().is_empty());

        assert_eq!(registrar.register().unwrap(), Registration::Installed);
        assert_eq!(registrar.host().installs.borrow().len(), 1);
    }

    #[test]
    fn register_rc_reports_host_code() {
        let host = CountingHost::default();
        host.fail_with.set(Some(SQLITE_NOMEM));
        let registrar: Registrar<_, Noop> = Registrar::new(host);

        assert_eq!(registrar.register_rc(), SQLITE_NOMEM);
        assert_eq!(registrar.register_rc(), SQLITE_OK);
        assert_eq!(registrar.register_rc(), SQLITE_OK);
        assert_eq!(registrar.host().installs.borrow().len(), 1);
    }
}

#![deny(unsafe_op_in_unsafe_fn)]
//! Auto-extension registration for the TreeCRDT SQLite extension.
//!
//! SQLite runs every registered auto-extension on each connection it opens. This crate installs a
//! hook into that list, once per process, which forwards to the TreeCRDT entry point
//! (`sqlite3_treecrdt_init`) so applications never have to load the extension explicitly.
//!
//! The host engine and the entry point are both traits ([`AutoExtensionHost`], [`EntryPoint`]),
//! so the registrar can be exercised against test doubles. Static-link builds (`static-link`)
//! export `treecrdt_register_auto` for the embedder's C startup code.

#[cfg(feature = "bundled")]
extern crate rusqlite as _;

pub mod entry;
pub mod error;
pub mod ffi;
pub mod host;
mod registrar;

pub use entry::{forward, hook, EntryPoint};
pub use error::{Error, Result};
pub use host::AutoExtensionHost;
#[cfg(any(feature = "bundled", feature = "static-link"))]
pub use host::SqliteHost;
pub use registrar::{Registrar, Registration, RegistrationState};

#[cfg(feature = "static-link")]
pub use entry::TreeCrdtInit;
#[cfg(feature = "static-link")]
pub use auto::{is_registered, register, treecrdt_register_auto};

#[cfg(feature = "static-link")]
mod auto {
    use std::os::raw::c_int;

    use crate::entry::TreeCrdtInit;
    use crate::error::Result;
    use crate::host::SqliteHost;
    use crate::registrar::{Registrar, Registration};

    static TREECRDT_AUTO: Registrar<SqliteHost, TreeCrdtInit> = Registrar::new(SqliteHost);

    /// Registers the TreeCRDT extension with the linked SQLite for every connection opened from
    /// now on. Call after `sqlite3_initialize`.
    pub fn register() -> Result<Registration> {
        TREECRDT_AUTO.register()
    }

    /// Whether the process-wide registration has succeeded.
    pub fn is_registered() -> bool {
        TREECRDT_AUTO.is_registered()
    }

    /// C entry for the embedder's startup code, called after `sqlite3_initialize`.
    ///
    /// Returns `SQLITE_OK` (also on repeated calls) or the code `sqlite3_auto_extension` failed
    /// with. Callers declaring it as returning `void` still link and run.
    #[no_mangle]
    pub extern "C" fn treecrdt_register_auto() -> c_int {
        TREECRDT_AUTO.register_rc()
    }
}

//! The host engine side of auto-extension registration.

use std::os::raw::c_int;

use crate::ffi::GenericEntryPoint;

/// A database engine with an auto-extension list, modelled on `sqlite3_auto_extension`.
pub trait AutoExtensionHost {
    /// Adds `entry` to the host's process-wide auto-extension list and returns the host's
    /// result code (`SQLITE_OK` on success).
    ///
    /// # Safety
    /// `entry` must come from [`crate::ffi::erase_entry_point`]: the host calls it back with the
    /// three-argument [`crate::ffi::RawEntryPoint`] convention on every connection open.
    unsafe fn auto_extension(&self, entry: GenericEntryPoint) -> c_int;
}

#[cfg(any(feature = "bundled", feature = "static-link"))]
mod sqlite {
    use std::os::raw::c_int;

    use super::AutoExtensionHost;
    use crate::error::{Error, Result};
    use crate::ffi::{GenericEntryPoint, SQLITE_OK};

    mod sys {
        use std::os::raw::c_int;

        // Declared locally with the generic entry point type: the declaration SQLite ships
        // is `void (*)(void)`, which is what the registrar hands over.
        extern "C" {
            pub fn sqlite3_initialize() -> c_int;
            pub fn sqlite3_auto_extension(x_entry_point: Option<unsafe extern "C" fn()>) -> c_int;
        }
    }

    /// The linked SQLite library (bundled natively, or wa-sqlite in static-link builds).
    /// SQLite de-duplicates auto-extensions by pointer identity.
    #[derive(Clone, Copy, Debug, Default)]
    pub struct SqliteHost;

    impl SqliteHost {
        /// Runs `sqlite3_initialize`. Safe to call repeatedly.
        pub fn initialize() -> Result<()> {
            let rc = unsafe { sys::sqlite3_initialize() };
            if rc != SQLITE_OK {
                return Err(Error::Initialize { rc });
            }
            Ok(())
        }
    }

    impl AutoExtensionHost for SqliteHost {
        unsafe fn auto_extension(&self, entry: GenericEntryPoint) -> c_int {
            unsafe { sys::sqlite3_auto_extension(Some(entry)) }
        }
    }
}

#[cfg(any(feature = "bundled", feature = "static-link"))]
pub use sqlite::SqliteHost;

use std::os::raw::c_int;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    #[error("auto-extension install failed (rc={rc})")]
    Install { rc: c_int },
    #[error("sqlite global initialization failed (rc={rc})")]
    Initialize { rc: c_int },
}

impl Error {
    /// Raw SQLite result code, for callers on the C side of the boundary.
    pub fn rc(&self) -> c_int {
        match self {
            Error::Install { rc } | Error::Initialize { rc } => *rc,
        }
    }
}

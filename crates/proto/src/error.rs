use crate::consts::{EACCES, EEXIST, EINVAL, EIO, ENOENT, ENOTDIR, EPERM};
use std::fmt;

/// The closed set of error numbers a 9P operation may report.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Errno {
    Perm = EPERM,
    NoEnt = ENOENT,
    Io = EIO,
    Access = EACCES,
    Exist = EEXIST,
    NotDir = ENOTDIR,
    Inval = EINVAL,
}

impl Errno {
    #[must_use]
    pub fn code(self) -> u32 {
        self as u32
    }

    #[must_use]
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            EPERM => Some(Errno::Perm),
            ENOENT => Some(Errno::NoEnt),
            EIO => Some(Errno::Io),
            EACCES => Some(Errno::Access),
            EEXIST => Some(Errno::Exist),
            ENOTDIR => Some(Errno::NotDir),
            EINVAL => Some(Errno::Inval),
            _ => None,
        }
    }

    /// Text used for the `ename` of an Rerror.
    #[must_use]
    pub fn message(self) -> &'static str {
        match self {
            Errno::Perm => "permission denied",
            Errno::NoEnt => "file does not exist",
            Errno::Io => "i/o error",
            Errno::Access => "access denied",
            Errno::Exist => "file already exists",
            Errno::NotDir => "not a directory",
            Errno::Inval => "bad arg in system call",
        }
    }
}

impl fmt::Display for Errno {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error(transparent)]
    FlagsetInvalidBits(#[from] flagset::InvalidBits),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid UTF-8 string")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    #[error("string too long: {0} bytes")]
    StringTooLong(usize),

    #[error("stat too long: {0} bytes")]
    StatTooLong(usize),

    #[error("Insufficient data: expected {expected}, got {actual}")]
    InsufficientData { expected: usize, actual: usize },

    #[error("{name}: mode {mode:#010x} disagrees with qid type {qtype:#04x}")]
    ModeMismatch { name: String, mode: u32, qtype: u8 },

    #[error("{0:?}: not a single path element")]
    InvalidName(String),
}

impl Error {
    /// Collapse into the protocol's error number.
    #[must_use]
    pub fn errno(&self) -> Errno {
        match self {
            Error::Io(_) | Error::InsufficientData { .. } => Errno::Io,
            Error::FlagsetInvalidBits(_)
            | Error::InvalidUtf8(_)
            | Error::StringTooLong(_)
            | Error::StatTooLong(_)
            | Error::ModeMismatch { .. }
            | Error::InvalidName(_) => Errno::Inval,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

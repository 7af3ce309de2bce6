use ninefold_proto::{Errno, Qid};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("invalid mount flag: {0:#x}")]
    InvalidMountFlag(u32),

    #[error("cache flag is only valid for mount")]
    CacheOnBind,

    #[error("({0}): not a directory")]
    NotDirectory(Qid),

    #[error("{0:?}: not a single path element")]
    InvalidName(String),

    #[error("{0}: file does not exist")]
    NotFound(String),

    #[error("{0}: file already exists")]
    Exists(String),

    #[error("no union member accepts creates")]
    NoCreateTarget,

    #[error("create {name}: {errno}")]
    CreateFailed { name: String, errno: Errno },

    #[error("invalid open mode: {0:#x}")]
    InvalidOpenMode(u32),

    #[error("exec mode cannot be combined with truncate")]
    ExecTruncate,

    #[error("({0}): directories may only be opened for reading")]
    IsDirectory(Qid),

    #[error("({qid}): access {access:#o} denied")]
    PermissionDenied { qid: Qid, access: u32 },

    #[error("({0}): exclusive use file already open")]
    ExclusiveInUse(Qid),
}

impl Error {
    /// Collapse into the protocol's error number.
    #[must_use]
    pub fn errno(&self) -> Errno {
        match self {
            Error::InvalidMountFlag(_)
            | Error::CacheOnBind
            | Error::InvalidName(_)
            | Error::InvalidOpenMode(_)
            | Error::ExecTruncate => Errno::Inval,
            Error::NotDirectory(_) => Errno::NotDir,
            Error::NotFound(_) => Errno::NoEnt,
            Error::Exists(_) => Errno::Exist,
            Error::NoCreateTarget | Error::IsDirectory(_) => Errno::Perm,
            Error::PermissionDenied { .. } | Error::ExclusiveInUse(_) => Errno::Access,
            Error::CreateFailed { errno, .. } => *errno,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

use crate::error::{Error, Result};
use ninefold_proto::{
    consts::{
        DMDIR, DMEXEC, DMREAD, DMWRITE, OAPPEND, OCEXEC, OEXCL, OEXEC, ORCLOSE, ORDWR, OREAD,
        OTRUNC, OWRITE,
    },
    Class, Dir, Perm, Qid,
};
use tracing::debug;

const OMODE: u32 = 0x3;
const OFLAGS: u32 = OTRUNC | OCEXEC | ORCLOSE | OAPPEND | OEXCL;

/// The low two bits of an open mode. Exactly one applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Access {
    #[default]
    Read,
    Write,
    ReadWrite,
    /// read, checking execute permission
    Exec,
}

/// The mode of a Topen or Tcreate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OpenMode {
    pub base: Access,
    pub truncate: bool,
    /// advisory, for the client's own bookkeeping
    pub close_on_exec: bool,
    pub remove_on_close: bool,
    pub append: bool,
    pub exclusive: bool,
}

impl OpenMode {
    #[must_use]
    pub fn new(base: Access) -> Self {
        Self {
            base,
            ..Self::default()
        }
    }

    /// Decode and validate a raw mode.
    ///
    /// # Errors
    /// - `Error::InvalidOpenMode` if unknown bits are set
    /// - `Error::ExecTruncate` for `OEXEC | OTRUNC`
    pub fn from_bits(bits: u32) -> Result<Self> {
        if bits & !(OMODE | OFLAGS) != 0 {
            debug!(mode = bits, "rejected open mode with unknown bits");
            return Err(Error::InvalidOpenMode(bits));
        }

        let base = match bits & OMODE {
            OREAD => Access::Read,
            OWRITE => Access::Write,
            ORDWR => Access::ReadWrite,
            _ => Access::Exec,
        };

        let mode = Self {
            base,
            truncate: bits & OTRUNC != 0,
            close_on_exec: bits & OCEXEC != 0,
            remove_on_close: bits & ORCLOSE != 0,
            append: bits & OAPPEND != 0,
            exclusive: bits & OEXCL != 0,
        };
        mode.validate()?;
        Ok(mode)
    }

    #[must_use]
    pub fn bits(&self) -> u32 {
        let mut bits = match self.base {
            Access::Read => OREAD,
            Access::Write => OWRITE,
            Access::ReadWrite => ORDWR,
            Access::Exec => OEXEC,
        };
        for (set, flag) in [
            (self.truncate, OTRUNC),
            (self.close_on_exec, OCEXEC),
            (self.remove_on_close, ORCLOSE),
            (self.append, OAPPEND),
            (self.exclusive, OEXCL),
        ] {
            if set {
                bits |= flag;
            }
        }
        bits
    }

    /// # Errors
    /// - `Error::ExecTruncate` if an exec open asks for truncation
    pub fn validate(&self) -> Result<()> {
        if self.base == Access::Exec && self.truncate {
            debug!(mode = self.bits(), "rejected exec open with truncate");
            return Err(Error::ExecTruncate);
        }
        Ok(())
    }

    /// Whether the open can modify the file.
    #[must_use]
    pub fn writes(&self) -> bool {
        self.truncate || matches!(self.base, Access::Write | Access::ReadWrite)
    }

    /// The `DMREAD`/`DMWRITE`/`DMEXEC` bits the opener must hold.
    #[must_use]
    pub fn access(&self) -> u32 {
        let mut access = match self.base {
            Access::Read => DMREAD,
            Access::Write => DMWRITE,
            Access::ReadWrite => DMREAD | DMWRITE,
            Access::Exec => DMEXEC,
        };
        if self.truncate {
            access |= DMWRITE;
        }
        access
    }

    /// The mode as the server applies it to `qid`: writes to an append-only
    /// file always append.
    #[must_use]
    pub fn effective_for(self, qid: &Qid) -> Self {
        Self {
            append: self.append || qid.is_append_only(),
            ..self
        }
    }

    /// Decide whether a user of `class` may open `dir` with this mode.
    ///
    /// # Errors
    /// - see [`OpenMode::validate`]
    /// - `Error::IsDirectory` for anything but a plain read of a directory
    /// - `Error::PermissionDenied` when `dir.mode` does not grant `class` the
    ///   required access
    pub fn check(&self, dir: &Dir, class: Class) -> Result<()> {
        self.validate()?;

        if dir.is_dir() && (self.base != Access::Read || self.truncate) {
            return Err(Error::IsDirectory(dir.qid));
        }

        let access = self.access();
        if !dir.mode.permits(class, access) {
            return Err(Error::PermissionDenied {
                qid: dir.qid,
                access,
            });
        }
        Ok(())
    }

    /// Enforce single exclusive use. Only files whose qid carries the
    /// exclusive bit are affected; on anything else `exclusive` is ignored.
    ///
    /// # Errors
    /// - `Error::ExclusiveInUse` if this is an exclusive open of an exclusive
    ///   file that someone else already holds open
    pub fn check_exclusive(&self, qid: &Qid, other_opener: bool) -> Result<()> {
        if self.exclusive && qid.is_exclusive() && other_opener {
            return Err(Error::ExclusiveInUse(*qid));
        }
        Ok(())
    }

    /// Decide whether a user of `class` may create a file with permissions
    /// `perm` in `parent` using this mode.
    ///
    /// # Errors
    /// - see [`OpenMode::validate`]
    /// - `Error::NotDirectory` if `parent` is not a directory
    /// - `Error::PermissionDenied` without write permission on `parent`
    /// - `Error::IsDirectory` when creating a directory with a mode other
    ///   than a plain read
    pub fn check_create(&self, perm: u32, parent: &Dir, class: Class) -> Result<()> {
        self.validate()?;

        if !parent.is_dir() {
            return Err(Error::NotDirectory(parent.qid));
        }
        if !parent.mode.permits(class, DMWRITE) {
            return Err(Error::PermissionDenied {
                qid: parent.qid,
                access: DMWRITE,
            });
        }
        if perm & DMDIR != 0 && (self.base != Access::Read || self.truncate) {
            return Err(Error::IsDirectory(parent.qid));
        }
        Ok(())
    }
}

impl TryFrom<u32> for OpenMode {
    type Error = Error;

    fn try_from(bits: u32) -> Result<Self> {
        OpenMode::from_bits(bits)
    }
}

/// Permissions a new file in `parent` ends up with. A directory inherits at
/// most the rwx bits of its parent, a file at most the rw bits.
#[must_use]
pub fn create_perm(perm: u32, parent: &Dir) -> Perm {
    let inherited = parent.mode.permissions();
    if perm & DMDIR != 0 {
        Perm(perm & (!0o777 | inherited))
    } else {
        Perm(perm & (!0o666 | (inherited & 0o666)))
    }
}

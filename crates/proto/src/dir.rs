use crate::{
    consts::{DMDIR, QT_MIRRORED},
    error::{Error, Result},
    Protocol, Qid, QidType,
};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use flagset::{flags, FlagSet};
use std::io::Cursor;

flags! {
    pub enum DirMode: u32 {
        Dir = 0x8000_0000,
        Append = 0x4000_0000,
        Exclusive = 0x2000_0000,
        Mount = 0x1000_0000,
        Auth = 0x0800_0000,
        Tmp = 0x0400_0000,
        OwnerRead = 0o400,
        OwnerWrite = 0o200,
        OwnerExec = 0o100,
        GroupRead = 0o040,
        GroupWrite = 0o020,
        GroupExec = 0o010,
        OtherRead = 0o004,
        OtherWrite = 0o002,
        OtherExec = 0o001,
    }
}

/// Which permission triple of a mode applies to a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Class {
    Owner,
    Group,
    Other,
}

impl Class {
    fn shift(self) -> u32 {
        match self {
            Class::Owner => 6,
            Class::Group => 3,
            Class::Other => 0,
        }
    }
}

/// The `mode` word of a [`Dir`].
///
/// Kept as raw bits so that modes carrying bits outside of 9P2000 (setuid,
/// 9P2000.u extensions) survive a decode/encode cycle untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Perm(pub u32);

impl Perm {
    /// Mode for a file with identity `qid` and permission bits `perm`. The
    /// high bits are taken from the qid, never from `perm`.
    #[must_use]
    pub fn for_qid(qid: &Qid, perm: u32) -> Self {
        let mirrored = u32::from(QT_MIRRORED) << 24;
        let high = u32::from(qid.qtype.bits() & QT_MIRRORED) << 24;
        Perm((perm & !mirrored) | high)
    }

    #[must_use]
    pub fn bits(self) -> u32 {
        self.0
    }

    #[must_use]
    pub fn flags(self) -> FlagSet<DirMode> {
        FlagSet::new_truncated(self.0)
    }

    #[must_use]
    pub fn is_dir(self) -> bool {
        self.0 & DMDIR != 0
    }

    /// The rwx bits for owner, group and other.
    #[must_use]
    pub fn permissions(self) -> u32 {
        self.0 & 0o777
    }

    /// The qid type implied by the high byte.
    #[must_use]
    pub fn qid_type(self) -> FlagSet<QidType> {
        #[allow(clippy::cast_possible_truncation)]
        let high = (self.0 >> 24) as u8;
        FlagSet::new_truncated(high & QT_MIRRORED)
    }

    /// Whether `class` holds every bit of `access` (a mask of `DMREAD`,
    /// `DMWRITE`, `DMEXEC`).
    #[must_use]
    pub fn permits(self, class: Class, access: u32) -> bool {
        let granted = (self.0 >> class.shift()) & 0o7;
        granted & access == access
    }
}

impl From<u32> for Perm {
    fn from(bits: u32) -> Self {
        Perm(bits)
    }
}

/// Metadata for one file, as carried by Rstat and Twstat.
///
/// Fields are declared in wire order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dir {
    /// server type, opaque outside the kernel
    pub r#type: u16,
    /// server subtype
    pub dev: u32,
    pub qid: Qid,
    pub mode: Perm,
    /// last read, seconds since the epoch
    pub atime: u32,
    /// last write, seconds since the epoch
    pub mtime: u32,
    pub length: u64,
    /// last element of the path
    pub name: String,
    pub uid: String,
    pub gid: String,
    /// last modifier
    pub muid: String,
}

impl Dir {
    /// A record whose mode agrees with `qid` by construction.
    #[must_use]
    pub fn new(name: impl Into<String>, qid: Qid, perm: u32) -> Self {
        Self {
            r#type: 0,
            dev: 0,
            qid,
            mode: Perm::for_qid(&qid, perm),
            atime: 0,
            mtime: 0,
            length: 0,
            name: name.into(),
            uid: String::new(),
            gid: String::new(),
            muid: String::new(),
        }
    }

    #[must_use]
    pub fn is_dir(&self) -> bool {
        self.qid.is_dir()
    }

    /// Check the record is self-consistent: `name` is a single element and
    /// the high bits of `mode` mirror `qid.qtype`.
    ///
    /// # Errors
    /// - `Error::InvalidName` if the name contains a slash (a bare "/" is
    ///   accepted for a root)
    /// - `Error::ModeMismatch` if the directory, append, exclusive, mount,
    ///   auth or tmp bits differ between `mode` and `qid`
    pub fn validate(&self) -> Result<()> {
        if self.name != "/" && self.name.contains('/') {
            return Err(Error::InvalidName(self.name.clone()));
        }

        let from_qid = self.qid.qtype.bits() & QT_MIRRORED;
        if self.mode.qid_type().bits() != from_qid {
            return Err(Error::ModeMismatch {
                name: self.name.clone(),
                mode: self.mode.bits(),
                qtype: self.qid.qtype.bits(),
            });
        }

        Ok(())
    }

    /// # Errors
    /// - failure to encode any of the fields
    pub fn to_bytes(&self) -> Result<Bytes> {
        let mut buf = BytesMut::new();
        self.encode(&mut buf)?;
        Ok(buf.freeze())
    }

    /// Decode one size-prefixed record and check it with [`Dir::validate`].
    ///
    /// # Errors
    /// - the data doesn't hold a complete record
    /// - the record is inconsistent
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let mut cursor = Cursor::new(data);
        let dir = Dir::decode(&mut cursor)?;
        dir.validate()?;
        Ok(dir)
    }

    /// Decode the body of an Rread on a directory: back to back records.
    ///
    /// # Errors
    /// - a record is truncated or inconsistent
    pub fn decode_entries(data: &[u8]) -> Result<Vec<Self>> {
        let mut cursor = Cursor::new(data);
        let mut entries = Vec::new();
        while cursor.has_remaining() {
            let dir = Dir::decode(&mut cursor)?;
            dir.validate()?;
            entries.push(dir);
        }
        Ok(entries)
    }
}

impl Protocol for Dir {
    /// # Errors
    /// - any string is longer than u16 allows
    /// - the whole record is longer than u16 allows
    fn encode(&self, buf: &mut BytesMut) -> Result<()> {
        let mut content_buf = BytesMut::new();

        self.r#type.encode(&mut content_buf)?;
        self.dev.encode(&mut content_buf)?;
        self.qid.encode(&mut content_buf)?;
        self.mode.bits().encode(&mut content_buf)?;
        self.atime.encode(&mut content_buf)?;
        self.mtime.encode(&mut content_buf)?;
        self.length.encode(&mut content_buf)?;
        self.name.encode(&mut content_buf)?;
        self.uid.encode(&mut content_buf)?;
        self.gid.encode(&mut content_buf)?;
        self.muid.encode(&mut content_buf)?;

        let size = u16::try_from(content_buf.len())
            .map_err(|_| Error::StatTooLong(content_buf.len()))?;

        buf.reserve(2 + content_buf.len());
        buf.put_u16_le(size);
        buf.extend_from_slice(&content_buf);
        Ok(())
    }

    fn decode(buf: &mut Cursor<&[u8]>) -> Result<Self> {
        let size = u16::decode(buf)? as usize;
        if buf.remaining() < size {
            return Err(Error::InsufficientData {
                expected: size,
                actual: buf.remaining(),
            });
        }

        let mut content = vec![0u8; size];
        buf.copy_to_slice(&mut content);
        let mut cursor = Cursor::new(content.as_slice());

        // anything left inside `size` after muid is an extension we don't read
        Ok(Dir {
            r#type: u16::decode(&mut cursor)?,
            dev: u32::decode(&mut cursor)?,
            qid: Qid::decode(&mut cursor)?,
            mode: Perm(u32::decode(&mut cursor)?),
            atime: u32::decode(&mut cursor)?,
            mtime: u32::decode(&mut cursor)?,
            length: u64::decode(&mut cursor)?,
            name: String::decode(&mut cursor)?,
            uid: String::decode(&mut cursor)?,
            gid: String::decode(&mut cursor)?,
            muid: String::decode(&mut cursor)?,
        })
    }
}

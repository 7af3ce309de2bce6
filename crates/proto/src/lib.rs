use crate::error::{Error, Result};
use byteorder::{LittleEndian, ReadBytesExt};
use bytes::{Buf, BufMut, BytesMut};
use flagset::{flags, FlagSet};
use std::io::Cursor;

pub mod consts;
mod dir;
pub mod error;
mod fmt;

pub use dir::{Class, Dir, DirMode, Perm};
pub use error::Errno;

/// Byte count of a 9P message or message field.
pub type Size = u32;
/// Correlates an in-flight request with its response.
pub type Tag = u16;
/// Client-chosen handle for a file within a session.
pub type Fid = u32;

pub trait Protocol: Sized {
    /// # Errors
    /// - implementation specific
    fn encode(&self, buf: &mut BytesMut) -> Result<()>;
    /// # Errors
    /// - implementation specific
    fn decode(buf: &mut Cursor<&[u8]>) -> Result<Self>;

    /// calculate encoded size if known at compile time
    fn encoded_size(&self) -> Option<usize> {
        None
    }
}

flags! {
    pub enum QidType: u8 {
        Dir = 0x80,
        Append = 0x40,
        Exclusive = 0x20,
        Mount = 0x10,
        Auth = 0x08,
        Tmp = 0x04,
        Symlink = 0x02,
        Link = 0x01,
    }
}

/// A server's unique identification for a file.
///
/// `path` names the file for as long as it exists on the server, `version`
/// changes whenever the server sees the file change. An empty `qtype` is a
/// plain file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Qid {
    pub path: u64,
    pub version: u32,
    pub qtype: FlagSet<QidType>,
}

impl Qid {
    #[must_use]
    pub fn new(path: u64, version: u32, qtype: impl Into<FlagSet<QidType>>) -> Self {
        Self {
            path,
            version,
            qtype: qtype.into(),
        }
    }

    #[must_use]
    pub fn file(path: u64, version: u32) -> Self {
        Self::new(path, version, FlagSet::default())
    }

    #[must_use]
    pub fn directory(path: u64, version: u32) -> Self {
        Self::new(path, version, QidType::Dir)
    }

    /// Same file, regardless of revision.
    #[must_use]
    pub fn same_file(&self, other: &Qid) -> bool {
        self.path == other.path
    }

    /// Same file at the same revision; a cached copy keyed by `self` is
    /// still good for `other`.
    #[must_use]
    pub fn same_revision(&self, other: &Qid) -> bool {
        self.path == other.path && self.version == other.version
    }

    #[must_use]
    pub fn is_dir(&self) -> bool {
        self.qtype.contains(QidType::Dir)
    }

    #[must_use]
    pub fn is_append_only(&self) -> bool {
        self.qtype.contains(QidType::Append)
    }

    #[must_use]
    pub fn is_exclusive(&self) -> bool {
        self.qtype.contains(QidType::Exclusive)
    }

    #[must_use]
    pub fn is_auth(&self) -> bool {
        self.qtype.contains(QidType::Auth)
    }

    /// Record a change to the file. The counter wraps.
    pub fn bump_version(&mut self) {
        self.version = self.version.wrapping_add(1);
    }
}

impl Protocol for u8 {
    fn encode(&self, buf: &mut BytesMut) -> Result<()> {
        buf.put_u8(*self);
        Ok(())
    }

    fn decode(buf: &mut Cursor<&[u8]>) -> Result<Self> {
        Ok(buf.read_u8()?)
    }

    fn encoded_size(&self) -> Option<usize> {
        Some(1)
    }
}

impl Protocol for u16 {
    fn encode(&self, buf: &mut BytesMut) -> Result<()> {
        buf.put_u16_le(*self);
        Ok(())
    }

    fn decode(buf: &mut Cursor<&[u8]>) -> Result<Self> {
        Ok(buf.read_u16::<LittleEndian>()?)
    }

    fn encoded_size(&self) -> Option<usize> {
        Some(2)
    }
}

impl Protocol for u32 {
    fn encode(&self, buf: &mut BytesMut) -> Result<()> {
        buf.put_u32_le(*self);
        Ok(())
    }

    fn decode(buf: &mut Cursor<&[u8]>) -> Result<Self> {
        Ok(buf.read_u32::<LittleEndian>()?)
    }

    fn encoded_size(&self) -> Option<usize> {
        Some(4)
    }
}

impl Protocol for u64 {
    fn encode(&self, buf: &mut BytesMut) -> Result<()> {
        buf.put_u64_le(*self);
        Ok(())
    }

    fn decode(buf: &mut Cursor<&[u8]>) -> Result<Self> {
        Ok(buf.read_u64::<LittleEndian>()?)
    }

    fn encoded_size(&self) -> Option<usize> {
        Some(8)
    }
}

impl Protocol for String {
    /// # Errors
    /// - string length overflows u16
    fn encode(&self, buf: &mut BytesMut) -> Result<()> {
        let bytes = self.as_bytes();
        let len = u16::try_from(bytes.len()).map_err(|_| Error::StringTooLong(bytes.len()))?;

        // reserve space for length + string data
        buf.reserve(2 + bytes.len());
        buf.put_u16_le(len);
        buf.put_slice(bytes);
        Ok(())
    }

    fn decode(buf: &mut Cursor<&[u8]>) -> Result<Self> {
        let len = buf.read_u16::<LittleEndian>()? as usize;
        if buf.remaining() < len {
            return Err(Error::InsufficientData {
                expected: len,
                actual: buf.remaining(),
            });
        }

        let mut string_bytes = vec![0u8; len];
        buf.copy_to_slice(&mut string_bytes);
        Ok(String::from_utf8(string_bytes)?)
    }
}

impl Protocol for Qid {
    fn encode(&self, buf: &mut BytesMut) -> Result<()> {
        buf.reserve(13); // fixed size: 1 + 4 + 8
        self.qtype.bits().encode(buf)?;
        self.version.encode(buf)?;
        self.path.encode(buf)?;
        Ok(())
    }

    fn decode(buf: &mut Cursor<&[u8]>) -> Result<Self> {
        let qtype = FlagSet::new(u8::decode(buf)?)?;
        Ok(Qid {
            qtype,
            version: u32::decode(buf)?,
            path: u64::decode(buf)?,
        })
    }

    fn encoded_size(&self) -> Option<usize> {
        Some(13)
    }
}

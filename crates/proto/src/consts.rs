// QID type bits
pub const QTDIR: u8 = 0x80;
pub const QTAPPEND: u8 = 0x40;
pub const QTEXCL: u8 = 0x20;
pub const QTMOUNT: u8 = 0x10;
pub const QTAUTH: u8 = 0x08;
pub const QTTMP: u8 = 0x04;
pub const QTSYMLINK: u8 = 0x02;
pub const QTLINK: u8 = 0x01;
pub const QTFILE: u8 = 0x00;

/// qid type bits that have a `DM*` counterpart in the top byte of a mode
pub const QT_MIRRORED: u8 = QTDIR | QTAPPEND | QTEXCL | QTMOUNT | QTAUTH | QTTMP;

// Topen/Tcreate mode
pub const OREAD: u32 = 0x0;
pub const OWRITE: u32 = 0x1;
pub const ORDWR: u32 = 0x2;
pub const OEXEC: u32 = 0x3;
pub const OTRUNC: u32 = 0x10;
pub const OCEXEC: u32 = 0x20;
pub const ORCLOSE: u32 = 0x40;
pub const OAPPEND: u32 = 0x80;
pub const OEXCL: u32 = 0x1000;

// Dir mode
pub const DMDIR: u32 = 0x8000_0000;
pub const DMAPPEND: u32 = 0x4000_0000;
pub const DMEXCL: u32 = 0x2000_0000;
pub const DMMOUNT: u32 = 0x1000_0000;
pub const DMAUTH: u32 = 0x0800_0000;
pub const DMTMP: u32 = 0x0400_0000;
pub const DMREAD: u32 = 0x4;
pub const DMWRITE: u32 = 0x2;
pub const DMEXEC: u32 = 0x1;

/// non-data size of a Twrite message
pub const IOHDRSZ: u32 = 24;
pub const MSIZE: u32 = 2 * 1_048_576 + IOHDRSZ;
pub const DEFAULT_VERSION: &str = "9P2000";

pub const NOTAG: u16 = 0xFFFF;
pub const NOFID: u32 = 0xFFFF_FFFF;
pub const NOUID: u32 = 0xFFFF_FFFF;

pub const EPERM: u32 = 1;
pub const ENOENT: u32 = 2;
pub const EIO: u32 = 5;
pub const EACCES: u32 = 13;
pub const EEXIST: u32 = 17;
pub const ENOTDIR: u32 = 20;
pub const EINVAL: u32 = 22;

use crate::error::{Error, Result};
use std::fmt;

pub const MREPL: u32 = 0x0000;
pub const MBEFORE: u32 = 0x0001;
pub const MAFTER: u32 = 0x0002;
pub const MORDER: u32 = 0x0003;
pub const MCREATE: u32 = 0x0004;
pub const MCACHE: u32 = 0x0010;
pub const MMASK: u32 = MORDER | MCREATE | MCACHE;

/// Where a newly bound directory goes in a union.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MountAction {
    /// The new file replaces the union; it becomes a union of one.
    #[default]
    Repl,
    /// The new directory is searched before everything already there.
    Before,
    /// The new directory is searched after everything already there.
    After,
}

/// Flags accepted by bind and mount.
///
/// `create` marks the new member as a target for creates in the union.
/// `cache` lets the I/O layer satisfy reads from a local cache and is only
/// accepted by mount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MountFlag {
    pub action: MountAction,
    pub create: bool,
    pub cache: bool,
}

impl MountFlag {
    pub const REPL: MountFlag = MountFlag::new(MountAction::Repl);
    pub const BEFORE: MountFlag = MountFlag::new(MountAction::Before);
    pub const AFTER: MountFlag = MountFlag::new(MountAction::After);

    #[must_use]
    pub const fn new(action: MountAction) -> Self {
        Self {
            action,
            create: false,
            cache: false,
        }
    }

    #[must_use]
    pub const fn with_create(mut self) -> Self {
        self.create = true;
        self
    }

    #[must_use]
    pub const fn with_cache(mut self) -> Self {
        self.cache = true;
        self
    }

    /// # Errors
    /// - bits outside of `MMASK` are set
    /// - the order field is `MBEFORE | MAFTER`
    pub fn from_bits(bits: u32) -> Result<Self> {
        if bits & !MMASK != 0 {
            return Err(Error::InvalidMountFlag(bits));
        }

        let action = match bits & MORDER {
            MREPL => MountAction::Repl,
            MBEFORE => MountAction::Before,
            MAFTER => MountAction::After,
            _ => return Err(Error::InvalidMountFlag(bits)),
        };

        Ok(Self {
            action,
            create: bits & MCREATE != 0,
            cache: bits & MCACHE != 0,
        })
    }

    #[must_use]
    pub fn bits(self) -> u32 {
        let mut bits = match self.action {
            MountAction::Repl => MREPL,
            MountAction::Before => MBEFORE,
            MountAction::After => MAFTER,
        };
        if self.create {
            bits |= MCREATE;
        }
        if self.cache {
            bits |= MCACHE;
        }
        bits
    }
}

impl TryFrom<u32> for MountFlag {
    type Error = Error;

    fn try_from(bits: u32) -> Result<Self> {
        MountFlag::from_bits(bits)
    }
}

impl fmt::Display for MountFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let action = match self.action {
            MountAction::Repl => "REPL",
            MountAction::Before => "BEFORE",
            MountAction::After => "AFTER",
        };
        f.write_str(action)?;
        if self.create {
            f.write_str("|CREATE")?;
        }
        if self.cache {
            f.write_str("|CACHE")?;
        }
        Ok(())
    }
}

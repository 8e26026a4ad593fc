//! Opcode table and protocol constants
//!
//! The opcode set is closed: servers reject anything outside this table, so
//! the enum is the single source of command numbers for the crate.

use std::ops::BitOr;

/// First byte of every request frame.
pub const MAGIC: u8 = 0xC8;

/// Status byte of a successful response.
pub const STATUS_OK: u8 = 0x00;

/// Failure status reported by stock servers for every unsatisfiable
/// operation: missing record, rejected putkeep, exhausted iterator. Other
/// values are possible in principle and are surfaced verbatim.
pub const STATUS_ERR: u8 = 0x01;

/// Command opcodes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Opcode {
    Put = 0x10,
    PutKeep = 0x11,
    PutCat = 0x12,
    PutShl = 0x13,
    PutNr = 0x18,
    Out = 0x20,
    Get = 0x30,
    Mget = 0x31,
    Vsiz = 0x38,
    IterInit = 0x50,
    IterNext = 0x51,
    Fwmkeys = 0x58,
    /// In the opcode table but not exposed as a command.
    AddInt = 0x60,
    /// In the opcode table but not exposed as a command.
    AddDouble = 0x61,
    Ext = 0x68,
    Sync = 0x70,
    Vanish = 0x71,
    Copy = 0x72,
    Restore = 0x73,
    SetMst = 0x78,
    Rnum = 0x80,
    Size = 0x81,
    Stat = 0x88,
    Misc = 0x90,
}

impl Opcode {
    /// The wire byte for this opcode
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// Options bitmask for [`misc`](crate::client::Tyrant::misc) calls.
///
/// Distinct from [`ExtOpts`]: the two masks share bit 0 on the wire but mean
/// different things, so they do not mix at the type level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MiscOpts(u32);

impl MiscOpts {
    /// No options set
    pub const NONE: MiscOpts = MiscOpts(0);

    /// Omit the call from the server's update log
    pub const NO_UPDATE_LOG: MiscOpts = MiscOpts(1 << 0);

    /// The raw bitmask as encoded into the options field
    pub fn bits(self) -> u32 {
        self.0
    }
}

impl BitOr for MiscOpts {
    type Output = MiscOpts;

    fn bitor(self, rhs: MiscOpts) -> MiscOpts {
        MiscOpts(self.0 | rhs.0)
    }
}

/// Locking options bitmask for [`ext`](crate::client::Tyrant::ext) calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExtOpts(u32);

impl ExtOpts {
    /// No locking
    pub const NONE: ExtOpts = ExtOpts(0);

    /// Lock the record named by the key argument while the function runs
    pub const LOCK_RECORD: ExtOpts = ExtOpts(1 << 0);

    /// Lock the whole database while the function runs
    pub const LOCK_GLOBAL: ExtOpts = ExtOpts(1 << 1);

    /// The raw bitmask as encoded into the options field
    pub fn bits(self) -> u32 {
        self.0
    }
}

impl BitOr for ExtOpts {
    type Output = ExtOpts;

    fn bitor(self, rhs: ExtOpts) -> ExtOpts {
        ExtOpts(self.0 | rhs.0)
    }
}

// SPDX-License-Identifier: Apache-2.0 OR MIT
//
// Copyright (c) 2024 by the author(s)

//! Payloads of the privileged command surface, laid out the way user space
//! passes them.

use core::fmt;
use core::mem::size_of;

use crate::geometry::CacheType;

/// Version of the command surface.
pub const VERSION: Version = Version {
    major: 0,
    minor: 0,
    micro: 7,
};

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Version {
    pub major: i32,
    pub minor: i32,
    pub micro: i32,
}

impl Version {
    /// Clients refuse to run against a different major version.
    pub fn is_compatible(&self, other: &Version) -> bool {
        self.major == other.major
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.micro)
    }
}

unsafe impl bytemuck::Pod for Version {}
unsafe impl bytemuck::Zeroable for Version {}

/// The `Ctype` of every cache level as found in CLIDR_EL1, L1 first.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Clid {
    pub ctype: [u32; 7],
}

impl Clid {
    /// The recognised type of each level, `None` for reserved encodings.
    pub fn levels(&self) -> impl Iterator<Item = Option<CacheType>> + '_ {
        self.ctype
            .iter()
            .map(|&ctype| CacheType::from_ctype(u64::from(ctype)).ok())
    }
}

unsafe impl bytemuck::Pod for Clid {}
unsafe impl bytemuck::Zeroable for Clid {}

/// Geometry query: `level` and `icache` in, the rest out.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Ccsidr {
    pub level: i32,
    pub icache: i32,
    pub nsets: i32,
    pub nways: i32,
    pub linesize: i32,
}

unsafe impl bytemuck::Pod for Ccsidr {}
unsafe impl bytemuck::Zeroable for Ccsidr {}

/// One entry of the output array of a dump.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RawCacheLine {
    pub set: i32,
    pub way: i32,
    pub valid: u8,
    pub dirty: u8,
    pub ns: u8,
    pub _reserved0: [u8; 5],
    pub tag: u64,
    /// Capacity of `linedata` on input, bytes written on output.
    pub linesize: u32,
    pub _reserved1: u32,
    /// User address of the line data buffer.
    pub linedata: u64,
}

unsafe impl bytemuck::Pod for RawCacheLine {}
unsafe impl bytemuck::Zeroable for RawCacheLine {}

/// A dump request. `set` and `way` of -1 select every set or way; `nlines`
/// is the length of `lines` on input and the number of lines produced on
/// output.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RawSelector {
    pub level: i32,
    pub icache: i32,
    pub set: i32,
    pub way: i32,
    pub nlines: u32,
    pub _reserved: u32,
    /// User address of an array of [`RawCacheLine`].
    pub lines: u64,
}

unsafe impl bytemuck::Pod for RawSelector {}
unsafe impl bytemuck::Zeroable for RawSelector {}

const IOC_NRBITS: u32 = 8;
const IOC_TYPEBITS: u32 = 8;
const IOC_SIZEBITS: u32 = 14;

const IOC_NRSHIFT: u32 = 0;
const IOC_TYPESHIFT: u32 = IOC_NRSHIFT + IOC_NRBITS;
const IOC_SIZESHIFT: u32 = IOC_TYPESHIFT + IOC_TYPEBITS;
const IOC_DIRSHIFT: u32 = IOC_SIZESHIFT + IOC_SIZEBITS;

const IOC_WRITE: u32 = 1;
const IOC_READ: u32 = 2;

/// Type byte shared by every command.
pub const MAGIC: u8 = b'r';

const fn ioc(dir: u32, nr: u32, size: usize) -> u32 {
    (dir << IOC_DIRSHIFT) | ((size as u32) << IOC_SIZESHIFT) | ((MAGIC as u32) << IOC_TYPESHIFT) | (nr << IOC_NRSHIFT)
}

/// The four commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Version,
    Clid,
    Ccsidr,
    Dump,
}

impl Command {
    pub const ALL: [Command; 4] = [Command::Version, Command::Clid, Command::Ccsidr, Command::Dump];

    pub const fn number(self) -> u32 {
        match self {
            Command::Version => 42,
            Command::Clid => 43,
            Command::Ccsidr => 44,
            Command::Dump => 45,
        }
    }

    /// Size of the payload the command carries.
    pub const fn size(self) -> usize {
        match self {
            Command::Version => size_of::<Version>(),
            Command::Clid => size_of::<Clid>(),
            Command::Ccsidr => size_of::<Ccsidr>(),
            Command::Dump => size_of::<RawSelector>(),
        }
    }

    /// The ioctl request code of the command.
    pub const fn code(self) -> u32 {
        let dir = match self {
            Command::Version | Command::Clid => IOC_READ,
            Command::Ccsidr | Command::Dump => IOC_READ | IOC_WRITE,
        };
        ioc(dir, self.number(), self.size())
    }

    /// Splits a request code into the command it names and the payload size
    /// it announces, which is not necessarily the size the command expects.
    /// The direction bits are not looked at; only [`Command::code`] is a
    /// valid request code.
    pub fn decode(code: u32) -> Option<(Command, usize)> {
        let field = |shift: u32, bits: u32| (code >> shift) & ((1 << bits) - 1);

        if field(IOC_TYPESHIFT, IOC_TYPEBITS) != u32::from(MAGIC) {
            return None;
        }
        let nr = field(IOC_NRSHIFT, IOC_NRBITS);
        let command = Self::ALL.into_iter().find(|command| command.number() == nr)?;
        Some((command, field(IOC_SIZESHIFT, IOC_SIZEBITS) as usize))
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Command::Version => "RAMINDEX_VERSION",
            Command::Clid => "RAMINDEX_CLID",
            Command::Ccsidr => "RAMINDEX_CCSIDR",
            Command::Dump => "RAMINDEX_DUMP",
        })
    }
}

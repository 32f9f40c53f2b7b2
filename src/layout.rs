// SPDX-License-Identifier: Apache-2.0 OR MIT
//
// Copyright (c) 2024 by the author(s)

//! RAMINDEX selector layouts of the supported cores.
//!
//! A selector word picks one RAM (by RAM-ID), one line (by set and way) and,
//! for data RAMs, one slice of that line (by chunk). The same tables are used
//! by the dumpers that run at EL1 and by the EL3 service, so that both sides
//! always agree on the encoding.

use bit_field::BitField;
use core::ops::Range;

use crate::cpu::RamBank;

/// A contiguous bit field `[lsb + width - 1 : lsb]` of a selector word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitSpan {
    pub lsb: usize,
    pub width: usize,
}

impl BitSpan {
    pub const fn new(lsb: usize, width: usize) -> Self {
        Self { lsb, width }
    }

    #[inline]
    pub const fn range(&self) -> Range<usize> {
        self.lsb..self.lsb + self.width
    }

    /// The bits covered by this span.
    #[inline]
    pub const fn mask(&self) -> u64 {
        ((1u64 << self.width) - 1) << self.lsb
    }

    /// Places the low `width` bits of `value` into `word`; higher bits of
    /// `value` are dropped, as the hardware would.
    #[inline]
    fn insert(&self, word: &mut u64, value: u64) {
        word.set_bits(self.range(), value.get_bits(0..self.width));
    }
}

/// RAM-ID field, common to every supported core.
pub const RAMID: BitSpan = BitSpan::new(24, 8);

/// Selector layout of one cache of one core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RamLayout {
    /// The register bank that takes the selector.
    pub bank: RamBank,
    /// RAM-ID of the tag RAM.
    pub tag_ram: u8,
    /// RAM-ID of the data RAM.
    pub data_ram: u8,
    pub way: BitSpan,
    pub set: BitSpan,
    /// Picks the slice of the line returned by one data RAM read.
    pub chunk: BitSpan,
    /// Line bytes returned by one data RAM read.
    pub bytes_per_read: u32,
    /// Data RAM reads needed to cover a whole line.
    pub reads: u32,
}

impl RamLayout {
    /// Bytes in one line of this cache.
    #[inline]
    pub const fn line_bytes(&self) -> u32 {
        self.bytes_per_read * self.reads
    }

    /// Every bit a selector for this cache may have set.
    pub const fn selector_mask(&self) -> u64 {
        RAMID.mask() | self.way.mask() | self.set.mask() | self.chunk.mask()
    }

    /// Selector word reading the tag RAM entry of `(set, way)`.
    pub fn tag_selector(&self, set: u32, way: u32) -> u64 {
        self.selector(self.tag_ram, set, way, 0)
    }

    /// Selector word reading slice `chunk` of the data RAM entry of
    /// `(set, way)`. Slice `n` holds line bytes
    /// `[n * bytes_per_read, (n + 1) * bytes_per_read)`.
    pub fn data_selector(&self, set: u32, way: u32, chunk: u32) -> u64 {
        self.selector(self.data_ram, set, way, chunk)
    }

    fn selector(&self, ram: u8, set: u32, way: u32, chunk: u32) -> u64 {
        let mut word = 0u64;
        RAMID.insert(&mut word, u64::from(ram));
        self.way.insert(&mut word, u64::from(way));
        self.set.insert(&mut word, u64::from(set));
        self.chunk.insert(&mut word, u64::from(chunk));
        word
    }
}

/// Cortex-A72 48KiB L1 instruction cache.
///
/// ```text
/// [31:24] RAMID   0x00 tag, 0x01 data
/// [19:18] Way
/// [13:6]  Set     VA[13:6]
/// [5:3]   Doubleword within the line (data RAM only)
/// ```
pub const CORTEX_A72_L1I: RamLayout = RamLayout {
    bank: RamBank::CortexA72ISide,
    tag_ram: 0x00,
    data_ram: 0x01,
    way: BitSpan::new(18, 2),
    set: BitSpan::new(6, 8),
    chunk: BitSpan::new(3, 3),
    bytes_per_read: 8,
    reads: 8,
};

/// Cortex-A72 32KiB L1 data cache.
///
/// ```text
/// [31:24] RAMID   0x08 tag, 0x09 data
/// [18]    Way
/// [13:6]  Set     VA[13:6]
/// [5:3]   Doubleword within the line (data RAM only)
/// ```
pub const CORTEX_A72_L1D: RamLayout = RamLayout {
    bank: RamBank::CortexA72DSide,
    tag_ram: 0x08,
    data_ram: 0x09,
    way: BitSpan::new(18, 1),
    set: BitSpan::new(6, 8),
    chunk: BitSpan::new(3, 3),
    bytes_per_read: 8,
    reads: 8,
};

/// Cortex-A720 32KiB L1 instruction cache.
///
/// ```text
/// [31:24] RAMID   0x00 tag, 0x01 data
/// [19:18] Way
/// [16:14] VA[5:3] (data RAM only)
/// [12:6]  Set     VA[12:6]
/// ```
pub const CORTEX_A720_L1I: RamLayout = RamLayout {
    bank: RamBank::CortexA720ISide,
    tag_ram: 0x00,
    data_ram: 0x01,
    way: BitSpan::new(18, 2),
    set: BitSpan::new(6, 7),
    chunk: BitSpan::new(14, 3),
    bytes_per_read: 8,
    reads: 8,
};

/// Cortex-A720 32KiB L1 data cache.
///
/// ```text
/// [31:24] RAMID   0x08 tag, 0x09 data
/// [19:18] Way
/// [17:16] VA[5:4] (data RAM only)
/// [12:6]  Set     VA[12:6]
/// ```
pub const CORTEX_A720_L1D: RamLayout = RamLayout {
    bank: RamBank::CortexA720DSide,
    tag_ram: 0x08,
    data_ram: 0x09,
    way: BitSpan::new(18, 2),
    set: BitSpan::new(6, 7),
    chunk: BitSpan::new(16, 2),
    bytes_per_read: 16,
    reads: 4,
};

// SPDX-License-Identifier: Apache-2.0 OR MIT
//
// Copyright (c) 2024 by the author(s)

//! Per-core line dumpers.
//!
//! A dumper reads one `(set, way)` of one cache and writes it to a
//! [`LineSlot`]. Every supported core provides an [`Operations`] table with
//! one optional dumper per `(level, icache)` pair.

use core::fmt;

use crate::cpu::Cpu;
use crate::error::Result;
use crate::line::{LineHeader, LineSlot};

pub mod cortex_a72;
pub mod cortex_a720;

/// Dumps line `(set, way)`, writing at most `len` data bytes.
///
/// `set` and `way` have been checked against the cache geometry, and `len`
/// is already the smaller of the slot capacity and the cache line size.
pub type DumpFn = fn(cpu: &mut dyn Cpu, set: i32, way: i32, len: u32, slot: &mut dyn LineSlot) -> Result<()>;

/// The dumpers one core provides, `None` where a cache cannot be dumped.
#[derive(Clone, Copy, Default)]
pub struct Operations {
    pub l1i: Option<DumpFn>,
    pub l1d: Option<DumpFn>,
    pub l2i: Option<DumpFn>,
    pub l2d: Option<DumpFn>,
    pub l3i: Option<DumpFn>,
    pub l3d: Option<DumpFn>,
}

impl Operations {
    /// Number of cache levels the table has slots for.
    pub const LEVELS: i32 = 3;

    /// No dumper at all.
    pub const EMPTY: Self = Self {
        l1i: None,
        l1d: None,
        l2i: None,
        l2d: None,
        l3i: None,
        l3d: None,
    };

    /// The dumper for `(level, icache)`, level 0 being L1. Unified caches
    /// are looked up with `icache == false`.
    pub fn lookup(&self, level: i32, icache: bool) -> Option<DumpFn> {
        match (level, icache) {
            (0, true) => self.l1i,
            (0, false) => self.l1d,
            (1, true) => self.l2i,
            (1, false) => self.l2d,
            (2, true) => self.l3i,
            (2, false) => self.l3d,
            _ => None,
        }
    }
}

impl fmt::Debug for Operations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operations")
            .field("l1i", &self.l1i.is_some())
            .field("l1d", &self.l1d.is_some())
            .field("l2i", &self.l2i.is_some())
            .field("l2d", &self.l2d.is_some())
            .field("l3i", &self.l3i.is_some())
            .field("l3d", &self.l3d.is_some())
            .finish()
    }
}

/// State decoded from a tag RAM entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TagState {
    pub valid: bool,
    pub dirty: bool,
    pub ns: bool,
    /// Reconstructed physical address of the line.
    pub tag: u64,
}

/// Writes one line into a slot: the header first, then the data in
/// ascending order until `len` bytes have been written.
pub(crate) struct LineWriter<'s> {
    slot: &'s mut dyn LineSlot,
    len: u32,
    written: u32,
}

impl<'s> LineWriter<'s> {
    /// Writes the header of `(set, way)` announcing `len` data bytes.
    pub fn start(slot: &'s mut dyn LineSlot, set: i32, way: i32, state: TagState, len: u32) -> Result<Self> {
        slot.write_header(&LineHeader {
            set,
            way,
            valid: state.valid,
            dirty: state.dirty,
            ns: state.ns,
            tag: state.tag,
            linesize: len,
        })?;
        Ok(Self { slot, len, written: 0 })
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.written >= self.len
    }

    /// Appends `bytes`, dropping whatever does not fit.
    pub fn push(&mut self, bytes: &[u8]) -> Result<()> {
        let room = (self.len - self.written) as usize;
        let take = bytes.len().min(room);
        if take == 0 {
            return Ok(());
        }
        self.slot.write_data(self.written, &bytes[..take])?;
        self.written += take as u32;
        Ok(())
    }
}

/// Number of reads of `bytes_per_read` bytes covering `len` bytes.
#[inline]
pub(crate) fn reads_for(len: u32, bytes_per_read: u32) -> u32 {
    len.div_ceil(bytes_per_read)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::line::CacheLine;

    fn noop(_: &mut dyn Cpu, _: i32, _: i32, _: u32, _: &mut dyn LineSlot) -> Result<()> {
        Ok(())
    }

    #[test]
    fn lookup_maps_every_slot() {
        let ops = Operations {
            l2d: Some(noop),
            ..Operations::EMPTY
        };
        assert!(ops.lookup(1, false).is_some());
        assert!(ops.lookup(1, true).is_none());
        assert!(ops.lookup(0, false).is_none());
        assert!(ops.lookup(3, false).is_none());
        assert!(ops.lookup(-1, false).is_none());
    }

    #[test]
    fn writer_truncates_the_tail() {
        let mut buf = [0u8; 16];
        let mut line = CacheLine::new(&mut buf);
        let mut writer = LineWriter::start(&mut line, 1, 0, TagState::default(), 11).unwrap();
        writer.push(&[1; 8]).unwrap();
        assert!(!writer.is_full());
        writer.push(&[2; 8]).unwrap();
        assert!(writer.is_full());
        writer.push(&[3; 8]).unwrap();
        assert_eq!(line.linesize, 11);
        assert_eq!(line.data(), &[1, 1, 1, 1, 1, 1, 1, 1, 2, 2, 2]);
        assert_eq!(line.linedata[11..], [0; 5]);
    }

    #[test]
    fn zero_length_line_still_gets_a_header() {
        let mut buf = [0u8; 4];
        let mut line = CacheLine::new(&mut buf);
        let state = TagState {
            valid: true,
            dirty: true,
            ns: false,
            tag: 0x1000,
        };
        let mut writer = LineWriter::start(&mut line, 5, 1, state, 0).unwrap();
        assert!(writer.is_full());
        writer.push(&[9; 8]).unwrap();
        assert_eq!((line.set, line.way, line.tag, line.linesize), (5, 1, 0x1000, 0));
        assert!(line.valid && line.dirty);
        assert_eq!(buf, [0; 4]);
    }

    #[test]
    fn partial_reads_are_rounded_up() {
        assert_eq!(reads_for(0, 8), 0);
        assert_eq!(reads_for(1, 8), 1);
        assert_eq!(reads_for(16, 8), 2);
        assert_eq!(reads_for(17, 16), 2);
        assert_eq!(reads_for(64, 16), 4);
    }
}

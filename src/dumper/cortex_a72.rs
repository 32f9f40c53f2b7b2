// SPDX-License-Identifier: Apache-2.0 OR MIT
//
// Copyright (c) 2024 by the author(s)

//! Cortex-A72 L1 caches, read directly through RAMINDEX at EL1.
//!
//! Data RAM reads return one doubleword of the line as two 32-bit words,
//! lower address in the first result register.

use tock_registers::{register_bitfields, LocalRegisterCopy};

use super::{reads_for, DumpFn, LineWriter, Operations, TagState};
use crate::cpu::Cpu;
use crate::error::Result;
use crate::layout::{RamLayout, CORTEX_A72_L1D, CORTEX_A72_L1I};
use crate::line::LineSlot;

register_bitfields! {u64,
    /// IL1 tag RAM, first result register.
    pub L1I_TAG0 [
        /// Physical address bits [43:12].
        PhysicalAddress OFFSET(0) NUMBITS(32) []
    ],

    /// IL1 tag RAM, second result register.
    pub L1I_TAG1 [
        Valid OFFSET(1) NUMBITS(1) [],
        NonSecure OFFSET(0) NUMBITS(1) []
    ],

    /// DL1 tag RAM, first result register.
    pub L1D_TAG0 [
        NonSecure OFFSET(30) NUMBITS(1) [],
        /// Physical address bits [43:14].
        PhysicalAddress OFFSET(0) NUMBITS(30) []
    ],

    /// DL1 tag RAM, second result register.
    pub L1D_TAG1 [
        /// MOESI state.
        State OFFSET(0) NUMBITS(2) [
            Invalid = 0b00,
            Dirty = 0b11
        ]
    ]
}

/// Decodes an IL1 tag RAM entry of `set`.
pub fn decode_l1i_tag(words: [u64; 2], set: u32) -> TagState {
    let tag0 = LocalRegisterCopy::<u64, L1I_TAG0::Register>::new(words[0]);
    let tag1 = LocalRegisterCopy::<u64, L1I_TAG1::Register>::new(words[1]);

    TagState {
        valid: tag1.is_set(L1I_TAG1::Valid),
        dirty: false,
        ns: tag1.is_set(L1I_TAG1::NonSecure),
        tag: (tag0.read(L1I_TAG0::PhysicalAddress) << 12) | ((u64::from(set) & 0x3f) << 6),
    }
}

/// Decodes a DL1 tag RAM entry of `set`.
pub fn decode_l1d_tag(words: [u64; 2], set: u32) -> TagState {
    let tag0 = LocalRegisterCopy::<u64, L1D_TAG0::Register>::new(words[0]);
    let tag1 = LocalRegisterCopy::<u64, L1D_TAG1::Register>::new(words[1]);

    TagState {
        valid: !tag1.matches_all(L1D_TAG1::State::Invalid),
        dirty: tag1.matches_all(L1D_TAG1::State::Dirty),
        ns: tag0.is_set(L1D_TAG0::NonSecure),
        tag: (tag0.read(L1D_TAG0::PhysicalAddress) << 14) | ((u64::from(set) & 0xff) << 6),
    }
}

fn dump_line(
    cpu: &mut dyn Cpu,
    layout: &RamLayout,
    decode: fn([u64; 2], u32) -> TagState,
    set: i32,
    way: i32,
    len: u32,
    slot: &mut dyn LineSlot,
) -> Result<()> {
    let (s, w) = (set as u32, way as u32);

    // The chunk field only reaches line_bytes() into the line.
    let len = len.min(layout.line_bytes());

    let state = decode(cpu.ramindex(layout.bank, layout.tag_selector(s, w)), s);
    let mut line = LineWriter::start(slot, set, way, state, len)?;

    for chunk in 0..reads_for(len, layout.bytes_per_read) {
        let [r0, r1] = cpu.ramindex(layout.bank, layout.data_selector(s, w, chunk));
        let mut bytes = [0u8; 8];
        bytes[..4].copy_from_slice(&(r0 as u32).to_le_bytes());
        bytes[4..].copy_from_slice(&(r1 as u32).to_le_bytes());
        line.push(&bytes)?;
    }

    Ok(())
}

fn dump_l1i_cacheline(cpu: &mut dyn Cpu, set: i32, way: i32, len: u32, slot: &mut dyn LineSlot) -> Result<()> {
    dump_line(cpu, &CORTEX_A72_L1I, decode_l1i_tag, set, way, len, slot)
}

fn dump_l1d_cacheline(cpu: &mut dyn Cpu, set: i32, way: i32, len: u32, slot: &mut dyn LineSlot) -> Result<()> {
    dump_line(cpu, &CORTEX_A72_L1D, decode_l1d_tag, set, way, len, slot)
}

/// Cortex-A72 dumpers. The L2 is not reachable through RAMINDEX.
pub static OPERATIONS: Operations = Operations {
    l1i: Some(dump_l1i_cacheline as DumpFn),
    l1d: Some(dump_l1d_cacheline as DumpFn),
    ..Operations::EMPTY
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::RamBank;
    use crate::fake::FakeCpu;
    use crate::line::CacheLine;

    fn pattern() -> [u8; 64] {
        core::array::from_fn(|i| i as u8)
    }

    #[test]
    fn l1d_tag_reconstruction() {
        let state = decode_l1d_tag([(1 << 30) | 0x2_0001, 0b11], 0x85);
        assert!(state.valid && state.dirty && state.ns);
        assert_eq!(state.tag, (0x2_0001 << 14) | (0x85 << 6));

        let state = decode_l1d_tag([0x3fff_ffff, 0b01], 0);
        assert!(state.valid && !state.dirty && !state.ns);
        assert_eq!(state.tag, 0x3fff_ffff << 14);

        assert!(!decode_l1d_tag([0, 0b00], 0).valid);
    }

    #[test]
    fn l1i_tag_reconstruction() {
        let state = decode_l1i_tag([0x8_0000, 0b11], 0xc1);
        assert!(state.valid && state.ns && !state.dirty);
        // Only set bits [5:0] are missing from the IL1 tag.
        assert_eq!(state.tag, (0x8_0000 << 12) | (0x01 << 6));
        assert_eq!(state.tag % 64, 0);
    }

    #[test]
    fn l1d_line_is_read_in_ascending_doublewords() {
        let mut cpu = FakeCpu::cortex_a72();
        cpu.fill_line(&CORTEX_A72_L1D, 7, 1, [0x1234, 0b10], &pattern());

        let mut buf = [0u8; 64];
        let mut line = CacheLine::new(&mut buf);
        dump_l1d_cacheline(&mut cpu, 7, 1, 64, &mut line).unwrap();

        assert_eq!((line.set, line.way, line.linesize), (7, 1, 64));
        assert!(line.valid && !line.dirty);
        assert_eq!(line.tag, (0x1234 << 14) | (7 << 6));
        assert_eq!(line.data(), &pattern()[..]);

        let issued = cpu.issued();
        assert_eq!(issued.len(), 9);
        assert_eq!(issued[0], (RamBank::CortexA72DSide, CORTEX_A72_L1D.tag_selector(7, 1)));
        for chunk in 0..8 {
            assert_eq!(
                issued[1 + chunk as usize],
                (RamBank::CortexA72DSide, CORTEX_A72_L1D.data_selector(7, 1, chunk))
            );
        }
    }

    #[test]
    fn short_buffer_gets_the_head_of_the_line() {
        let mut cpu = FakeCpu::cortex_a72();
        cpu.fill_line(&CORTEX_A72_L1I, 0, 2, [0x40, 0b10], &pattern());

        for len in [0u32, 3, 4, 5, 8, 13, 63] {
            let mut buf = [0xeeu8; 64];
            let mut line = CacheLine::new(&mut buf);
            dump_l1i_cacheline(&mut cpu, 0, 2, len, &mut line).unwrap();
            assert_eq!(line.linesize, len);
            assert!(!line.dirty);
            assert_eq!(line.data(), &pattern()[..len as usize]);
            assert!(buf[len as usize..].iter().all(|&b| b == 0xee));
        }
    }

    #[test]
    fn only_the_needed_doublewords_are_read() {
        let mut cpu = FakeCpu::cortex_a72();
        let mut buf = [0u8; 64];
        let mut line = CacheLine::new(&mut buf);
        dump_l1d_cacheline(&mut cpu, 0, 0, 17, &mut line).unwrap();
        // One tag read and three data reads.
        assert_eq!(cpu.issued().len(), 4);
    }

    #[test]
    fn longer_lines_are_cut_at_the_layout() {
        let mut cpu = FakeCpu::cortex_a72();
        cpu.fill_line(&CORTEX_A72_L1D, 3, 0, [0x10, 0b01], &pattern());

        let mut buf = [0xeeu8; 128];
        let mut line = CacheLine::new(&mut buf);
        dump_l1d_cacheline(&mut cpu, 3, 0, 128, &mut line).unwrap();
        assert_eq!(line.linesize, 64);
        assert_eq!(line.data(), &pattern()[..]);
        // No chunk is read twice.
        assert_eq!(cpu.issued().len(), 9);
        assert!(buf[64..].iter().all(|&b| b == 0xee));
    }

    #[test]
    fn no_l2_dumper() {
        assert!(OPERATIONS.lookup(0, true).is_some());
        assert!(OPERATIONS.lookup(0, false).is_some());
        assert!(OPERATIONS.lookup(1, false).is_none());
    }
}

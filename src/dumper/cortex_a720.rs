// SPDX-License-Identifier: Apache-2.0 OR MIT
//
// Copyright (c) 2024 by the author(s)

//! Cortex-A720 L1 caches.
//!
//! The A720 only grants RAMINDEX access at EL3, so the dumpers here ask the
//! secure monitor for the line and decode what it returns. The monitor side
//! lives in [`el3`] and shares the selector layouts with them.

use tock_registers::{register_bitfields, LocalRegisterCopy};

use super::{DumpFn, LineWriter, Operations, TagState};
use crate::cpu::Cpu;
use crate::error::Result;
use crate::layout::{RamLayout, CORTEX_A720_L1D, CORTEX_A720_L1I};
use crate::line::LineSlot;
use crate::smc::{self, CpuService};

register_bitfields! {u64,
    /// IMP_ISIDE_DATA0_EL3 after an L1 instruction tag RAM read.
    pub L1I_TAG [
        Valid OFFSET(29) NUMBITS(1) [],
        NonSecure OFFSET(28) NUMBITS(1) [],
        /// Physical address bits [39:12].
        PhysicalAddress OFFSET(0) NUMBITS(28) []
    ],

    /// IMP_DSIDE_DATA0_EL3 after an L1 data tag RAM read.
    pub L1D_TAG [
        NonSecure OFFSET(30) NUMBITS(1) [],
        /// Physical address bits [39:12].
        PhysicalAddress OFFSET(2) NUMBITS(28) [],
        State OFFSET(0) NUMBITS(2) [
            Invalid = 0b00,
            Dirty = 0b10
        ]
    ]
}

/// Decodes the L1 instruction tag word of `set`.
pub fn decode_l1i_tag(word: u64, set: u32) -> TagState {
    let tag = LocalRegisterCopy::<u64, L1I_TAG::Register>::new(word);

    TagState {
        valid: tag.is_set(L1I_TAG::Valid),
        dirty: false,
        ns: tag.is_set(L1I_TAG::NonSecure),
        tag: (tag.read(L1I_TAG::PhysicalAddress) << 12) | ((u64::from(set) & 0x3f) << 6),
    }
}

/// Decodes the L1 data tag word of `set`.
pub fn decode_l1d_tag(word: u64, set: u32) -> TagState {
    let tag = LocalRegisterCopy::<u64, L1D_TAG::Register>::new(word);

    TagState {
        valid: !tag.matches_all(L1D_TAG::State::Invalid),
        dirty: tag.matches_all(L1D_TAG::State::Dirty),
        ns: tag.is_set(L1D_TAG::NonSecure),
        tag: (tag.read(L1D_TAG::PhysicalAddress) << 12) | ((u64::from(set) & 0x3f) << 6),
    }
}

#[allow(clippy::too_many_arguments)]
fn dump_line(
    cpu: &mut dyn Cpu,
    service: CpuService,
    layout: &RamLayout,
    decode: fn(u64, u32) -> TagState,
    set: i32,
    way: i32,
    len: u32,
    slot: &mut dyn LineSlot,
) -> Result<()> {
    let ret = smc::call(cpu, service, set, way)?;

    let len = len.min(layout.line_bytes());
    let state = decode(ret.x(1), set as u32);
    let mut line = LineWriter::start(slot, set, way, state, len)?;

    let words = (layout.line_bytes() / 8) as usize;
    for word in &ret.0[2..2 + words] {
        if line.is_full() {
            break;
        }
        line.push(&word.to_le_bytes())?;
    }

    Ok(())
}

fn dump_l1i_cacheline(cpu: &mut dyn Cpu, set: i32, way: i32, len: u32, slot: &mut dyn LineSlot) -> Result<()> {
    dump_line(
        cpu,
        CpuService::GetL1ICacheLine,
        &CORTEX_A720_L1I,
        decode_l1i_tag,
        set,
        way,
        len,
        slot,
    )
}

fn dump_l1d_cacheline(cpu: &mut dyn Cpu, set: i32, way: i32, len: u32, slot: &mut dyn LineSlot) -> Result<()> {
    dump_line(
        cpu,
        CpuService::GetL1DCacheLine,
        &CORTEX_A720_L1D,
        decode_l1d_tag,
        set,
        way,
        len,
        slot,
    )
}

/// Cortex-A720 dumpers.
///
/// The L2 and L3 calls exist on the wire but the monitor does not implement
/// them yet, so there is no dumper for them.
pub static OPERATIONS: Operations = Operations {
    l1i: Some(dump_l1i_cacheline as DumpFn),
    l1d: Some(dump_l1d_cacheline as DumpFn),
    ..Operations::EMPTY
};

/// The RAMINDEX reads done by the secure monitor.
pub mod el3 {
    use crate::cpu::{Cpu, SmcRegs};
    use crate::layout::{CORTEX_A720_L1D, CORTEX_A720_L1I};
    use crate::smc::SMC_OK;

    /// Reads L1 instruction line `(set, way)` into `ret`: the tag word in
    /// `x1`, eight 8 byte chunks of the line in `x2..x9`.
    pub fn l1i_cacheline(cpu: &mut dyn Cpu, set: u64, way: u64, ret: &mut SmcRegs) -> u64 {
        let layout = &CORTEX_A720_L1I;
        let (set, way) = (set as u32, way as u32);

        ret.0[1] = cpu.ramindex(layout.bank, layout.tag_selector(set, way))[0];

        // Each read returns the two 32-bit halves of one chunk.
        for chunk in 0..layout.reads {
            let [r0, r1] = cpu.ramindex(layout.bank, layout.data_selector(set, way, chunk));
            ret.0[2 + chunk as usize] = ((r1 & 0xffff_ffff) << 32) | (r0 & 0xffff_ffff);
        }

        SMC_OK
    }

    /// Reads L1 data line `(set, way)` into `ret`: the tag word in `x1`,
    /// four 16 byte chunks of the line in `x2..x9`.
    pub fn l1d_cacheline(cpu: &mut dyn Cpu, set: u64, way: u64, ret: &mut SmcRegs) -> u64 {
        let layout = &CORTEX_A720_L1D;
        let (set, way) = (set as u32, way as u32);

        ret.0[1] = cpu.ramindex(layout.bank, layout.tag_selector(set, way))[0];

        for chunk in 0..layout.reads as usize {
            let [r0, r1] = cpu.ramindex(layout.bank, layout.data_selector(set, way, chunk as u32));
            ret.0[2 + chunk * 2] = r0;
            ret.0[3 + chunk * 2] = r1;
        }

        SMC_OK
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::fake::FakeCpu;
    use crate::line::CacheLine;

    fn pattern() -> [u8; 64] {
        core::array::from_fn(|i| 0xff - i as u8)
    }

    #[test]
    fn l1i_tag_decoding() {
        let state = decode_l1i_tag((1 << 29) | 0x0abc_d123, 0x7f);
        assert!(state.valid && !state.ns && !state.dirty);
        assert_eq!(state.tag, (0x0abc_d123 << 12) | (0x3f << 6));

        let state = decode_l1i_tag(1 << 28, 0);
        assert!(!state.valid && state.ns);
        assert_eq!(state.tag, 0);
    }

    #[test]
    fn l1d_tag_decoding() {
        let state = decode_l1d_tag((1 << 30) | (0x123 << 2) | 0b10, 1);
        assert!(state.valid && state.dirty && state.ns);
        assert_eq!(state.tag, (0x123 << 12) | (1 << 6));

        let clean = decode_l1d_tag(0b01, 0);
        assert!(clean.valid && !clean.dirty);
        let other = decode_l1d_tag(0b11, 0);
        assert!(other.valid && !other.dirty);
        assert!(!decode_l1d_tag(0, 0).valid);
    }

    #[test]
    fn l1d_line_through_the_monitor() {
        let mut cpu = FakeCpu::cortex_a720();
        cpu.fill_line(&CORTEX_A720_L1D, 9, 2, [(0x55 << 2) | 0b01, 0], &pattern());

        let mut buf = [0u8; 64];
        let mut line = CacheLine::new(&mut buf);
        dump_l1d_cacheline(&mut cpu, 9, 2, 64, &mut line).unwrap();

        assert_eq!((line.set, line.way, line.linesize), (9, 2, 64));
        assert!(line.valid && !line.dirty && !line.ns);
        assert_eq!(line.tag, (0x55 << 12) | (9 << 6));
        assert_eq!(line.data(), &pattern()[..]);
    }

    #[test]
    fn l1i_line_is_truncated_to_the_buffer() {
        let mut cpu = FakeCpu::cortex_a720();
        cpu.fill_line(&CORTEX_A720_L1I, 0, 0, [1 << 29, 0], &pattern());

        for len in [0u32, 5, 16, 20, 64] {
            let mut buf = [0u8; 64];
            let mut line = CacheLine::new(&mut buf);
            dump_l1i_cacheline(&mut cpu, 0, 0, len, &mut line).unwrap();
            assert_eq!(line.linesize, len);
            assert!(line.valid && !line.dirty);
            assert_eq!(line.data(), &pattern()[..len as usize]);
            assert!(buf[len as usize..].iter().all(|&b| b == 0));
        }
    }

    #[test]
    fn header_matches_what_the_monitor_returned() {
        let mut cpu = FakeCpu::cortex_a720();
        cpu.fill_line(&CORTEX_A720_L1I, 4, 1, [1 << 29, 0], &pattern());

        let mut buf = [0u8; 96];
        let mut line = CacheLine::new(&mut buf);
        dump_l1i_cacheline(&mut cpu, 4, 1, 96, &mut line).unwrap();
        assert_eq!(line.linesize, 64);
        assert_eq!(line.data(), &pattern()[..]);
        assert!(buf[64..].iter().all(|&b| b == 0));
    }

    #[test]
    fn monitor_failure_leaves_the_slot_alone() {
        let mut cpu = FakeCpu::cortex_a72();
        let mut buf = [0u8; 8];
        let mut line = CacheLine::new(&mut buf);
        let err = dump_l1d_cacheline(&mut cpu, 1, 1, 8, &mut line).unwrap_err();
        assert!(matches!(err, Error::Unsupported { .. }));
        assert_eq!((line.set, line.way, line.linesize), (0, 0, 8));
    }

    #[test]
    fn only_l1_dumpers() {
        assert!(OPERATIONS.lookup(0, true).is_some());
        assert!(OPERATIONS.lookup(0, false).is_some());
        assert!(OPERATIONS.lookup(1, false).is_none());
        assert!(OPERATIONS.lookup(2, false).is_none());
    }
}

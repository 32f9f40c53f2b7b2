// SPDX-License-Identifier: Apache-2.0 OR MIT
//
// Copyright (c) 2024 by the author(s)

//! Secure monitor side of the cache line service.
//!
//! Runs at EL3 on the PE that issued the SMC and only ever touches the
//! RAMINDEX registers of that PE.

use log::error;

use super::{CpuService, SMC_OK, SMC_UNK};
use crate::cpu::{Cpu, SmcRegs};
use crate::dumper::cortex_a720::el3;

/// Handles one fast SMC with the argument registers `args` and returns the
/// registers to hand back to the caller.
///
/// Only `x0..x9` carry results; for anything but success they are zero apart
/// from the status in `x0`.
pub fn handle_smc(cpu: &mut dyn Cpu, args: &SmcRegs) -> SmcRegs {
    let fid = args.x(0) as u32;
    let (set, way) = (args.x(1), args.x(2));
    let mut ret = SmcRegs::default();

    let status = match CpuService::from_function_id(fid) {
        Some(CpuService::GetL1ICacheLine) => el3::l1i_cacheline(cpu, set, way, &mut ret),
        Some(CpuService::GetL1DCacheLine) => el3::l1d_cacheline(cpu, set, way, &mut ret),
        Some(CpuService::GetL2UCacheLine) | Some(CpuService::GetL3UCacheLine) => SMC_UNK,
        None => {
            error!("unhandled SMC ({:#x})", fid);
            SMC_UNK
        }
    };

    if status != SMC_OK {
        ret = SmcRegs::default();
    }
    ret.0[0] = status;
    ret
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::RamBank;
    use crate::fake::FakeCpu;
    use crate::layout::{CORTEX_A720_L1D, CORTEX_A720_L1I};

    fn pattern() -> [u8; 64] {
        core::array::from_fn(|i| (i as u8).wrapping_mul(3))
    }

    #[test]
    fn l1i_words_pack_two_halves() {
        let mut cpu = FakeCpu::cortex_a720();
        cpu.fill_line(&CORTEX_A720_L1I, 0x41, 3, [0x2abc_def0, 0], &pattern());

        let ret = handle_smc(&mut cpu, &SmcRegs::call(0x8100_0001, 0x41, 3));
        assert_eq!(ret.x(0), SMC_OK);
        assert_eq!(ret.x(1), 0x2abc_def0);
        for i in 0..8 {
            let bytes: [u8; 8] = pattern()[i * 8..i * 8 + 8].try_into().unwrap();
            assert_eq!(ret.x(2 + i), u64::from_le_bytes(bytes));
        }

        let issued = cpu.issued();
        assert_eq!(issued.len(), 9);
        assert_eq!(issued[0], (RamBank::CortexA720ISide, CORTEX_A720_L1I.tag_selector(0x41, 3)));
        assert_eq!(issued[8], (RamBank::CortexA720ISide, CORTEX_A720_L1I.data_selector(0x41, 3, 7)));
    }

    #[test]
    fn l1d_words_come_in_pairs() {
        let mut cpu = FakeCpu::cortex_a720();
        cpu.fill_line(&CORTEX_A720_L1D, 2, 1, [0x4000_0006, 0], &pattern());

        let ret = handle_smc(&mut cpu, &SmcRegs::call(0x8100_0002, 2, 1));
        assert_eq!(ret.x(0), SMC_OK);
        assert_eq!(ret.x(1), 0x4000_0006);
        for i in 0..8 {
            let bytes: [u8; 8] = pattern()[i * 8..i * 8 + 8].try_into().unwrap();
            assert_eq!(ret.x(2 + i), u64::from_le_bytes(bytes));
        }
        // One tag read and four 16 byte data reads.
        assert_eq!(cpu.issued().len(), 5);
        assert!(cpu.issued().iter().all(|&(bank, _)| bank == RamBank::CortexA720DSide));
    }

    #[test]
    fn unified_caches_and_unknown_calls_are_refused() {
        let mut cpu = FakeCpu::cortex_a720();
        for fid in [0x8100_0003, 0x8100_0004, 0x8100_0005, 0x8400_0000] {
            let ret = handle_smc(&mut cpu, &SmcRegs::call(fid, 0, 0));
            assert_eq!(ret.x(0), SMC_UNK);
            assert!(ret.0[1..].iter().all(|&x| x == 0));
        }
        assert!(cpu.issued().is_empty());
    }
}

/*
 * Copyright (c) 2024 by the author(s)
 *
 * =============================================================================
 *
 * Licensed under either of
 *   - Apache License, Version 2.0 (http://www.apache.org/licenses/LICENSE-2.0)
 *   - MIT License (http://opensource.org/licenses/MIT)
 * at your option.
 *
 * =============================================================================
 */

//! Instruction sequences executed on the running PE.

use cortex_a::asm::barrier;

use crate::cpu::{Cpu, RamBank, SmcRegs};
use crate::registers::*;

/// `SYS` to RAMINDEX, `DSB SY`, `ISB`, then both result registers, emitted as
/// one block so that no memory access can be scheduled inside the sequence.
#[cfg(target_arch = "aarch64")]
macro_rules! ramindex_sequence {
    ($sys:literal, $data0:literal, $data1:literal, $selector:expr) => {{
        let data0: u64;
        let data1: u64;
        core::arch::asm!(
            concat!("sys ", $sys, ", {selector}"),
            "dsb sy",
            "isb",
            concat!("mrs {data0}, ", $data0),
            concat!("mrs {data1}, ", $data1),
            selector = in(reg) $selector,
            data0 = out(reg) data0,
            data1 = out(reg) data1,
            options(nostack),
        );
        [data0, data1]
    }};
}

/// Runs `f` with IRQs and FIQs masked on this PE.
#[inline]
pub fn without_interrupts<R>(f: impl FnOnce() -> R) -> R {
    let saved = DAIF.get();
    DAIF.modify(DAIF::I::Masked + DAIF::F::Masked);
    let ret = f();
    DAIF.set(saved);
    ret
}

/// Returns the current exception level (0-3).
#[inline]
pub fn current_el() -> u8 {
    CurrentEL.read(CurrentEL::EL) as u8
}

/// Reads one RAMINDEX entry through the register bank `bank`.
///
/// # Safety
///
/// The caller must run at an exception level that may access the bank
/// (EL1 for the Cortex-A72 banks, EL3 for the Cortex-A720 banks) on a core
/// that implements it; otherwise the access is UNDEFINED.
#[inline]
pub unsafe fn ramindex_read(bank: RamBank, selector: u64) -> [u64; 2] {
    match () {
        #[cfg(target_arch = "aarch64")]
        () => without_interrupts(|| match bank {
            RamBank::CortexA72ISide => {
                ramindex_sequence!("#0, c15, c4, #0", "s3_0_c15_c0_0", "s3_0_c15_c0_1", selector)
            }
            RamBank::CortexA72DSide => {
                ramindex_sequence!("#0, c15, c4, #0", "s3_0_c15_c1_0", "s3_0_c15_c1_1", selector)
            }
            RamBank::CortexA720ISide => {
                ramindex_sequence!("#6, c15, c0, #0", "s3_6_c15_c0_0", "s3_6_c15_c0_1", selector)
            }
            RamBank::CortexA720DSide => {
                ramindex_sequence!("#6, c15, c0, #0", "s3_6_c15_c1_0", "s3_6_c15_c1_1", selector)
            }
        }),

        #[cfg(not(target_arch = "aarch64"))]
        () => {
            let _ = (bank, selector);
            unimplemented!()
        }
    }
}

/// SMC Calling Convention v1.2 call passing and returning `x0..x9`.
#[inline(never)]
pub fn smc_call(args: &SmcRegs) -> SmcRegs {
    match () {
        #[cfg(target_arch = "aarch64")]
        () => {
            let mut r = args.0;
            unsafe {
                core::arch::asm!(
                    "smc #0",
                    inout("x0") r[0],
                    inout("x1") r[1],
                    inout("x2") r[2],
                    inout("x3") r[3],
                    inout("x4") r[4],
                    inout("x5") r[5],
                    inout("x6") r[6],
                    inout("x7") r[7],
                    inout("x8") r[8],
                    inout("x9") r[9],
                    options(nomem, nostack),
                );
            }
            SmcRegs(r)
        }

        #[cfg(not(target_arch = "aarch64"))]
        () => {
            let _ = args;
            unimplemented!()
        }
    }
}

/// The PE this code runs on.
///
/// RAMINDEX is local to a PE, so callers that want a specific core must pin
/// themselves to it before using this type.
#[derive(Debug, Default, Clone, Copy)]
pub struct Aarch64;

impl Cpu for Aarch64 {
    #[inline]
    fn midr_el1(&self) -> u64 {
        MIDR_EL1.get()
    }

    #[inline]
    fn clidr_el1(&self) -> u64 {
        CLIDR_EL1.get()
    }

    #[inline]
    fn id_aa64mmfr2_el1(&self) -> u64 {
        ID_AA64MMFR2_EL1.get()
    }

    fn read_ccsidr(&mut self, csselr: u64) -> u64 {
        CSSELR_EL1.set(csselr);
        unsafe { barrier::isb(barrier::SY) };
        CCSIDR_EL1.get()
    }

    fn ramindex(&mut self, bank: RamBank, selector: u64) -> [u64; 2] {
        debug_assert!(current_el() >= bank.min_el(), "{:?} used below EL{}", bank, bank.min_el());
        // The dumper tables only hand out banks of the identified core.
        unsafe { ramindex_read(bank, selector) }
    }

    fn smc(&mut self, args: &SmcRegs) -> SmcRegs {
        smc_call(args)
    }
}

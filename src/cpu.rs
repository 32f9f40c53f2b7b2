// SPDX-License-Identifier: Apache-2.0 OR MIT
//
// Copyright (c) 2024 by the author(s)

//! The hardware seam: every instruction the core issues goes through [`Cpu`].
//!
//! [`crate::asm::Aarch64`] executes the instructions on the running PE,
//! `crate::fake::FakeCpu` simulates them for host tests.

/// The RAMINDEX register banks of the supported cores.
///
/// Each bank fixes the instruction that takes the selector word and the two
/// implementation defined registers that return the result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RamBank {
    /// Cortex-A72 `SYS #0, C15, C4, #0` with results in `S3_0_C15_C0_{0,1}`.
    CortexA72ISide,
    /// Cortex-A72 `SYS #0, C15, C4, #0` with results in `S3_0_C15_C1_{0,1}`.
    CortexA72DSide,
    /// Cortex-A720 `SYS #6, C15, C0, #0` with results in `S3_6_C15_C0_{0,1}`.
    /// Only accessible at EL3.
    CortexA720ISide,
    /// Cortex-A720 `SYS #6, C15, C0, #0` with results in `S3_6_C15_C1_{0,1}`.
    /// Only accessible at EL3.
    CortexA720DSide,
}

impl RamBank {
    /// Lowest exception level allowed to use the bank.
    pub const fn min_el(self) -> u8 {
        match self {
            RamBank::CortexA72ISide | RamBank::CortexA72DSide => 1,
            RamBank::CortexA720ISide | RamBank::CortexA720DSide => 3,
        }
    }
}

/// Number of general purpose registers exchanged with the secure monitor.
pub const SMC_REGS: usize = 10;

/// Registers `x0..x9` on entry to or return from an SMC.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SmcRegs(pub [u64; SMC_REGS]);

impl SmcRegs {
    /// Builds the argument registers of a call with function id `fid`.
    pub fn call(fid: u32, x1: u64, x2: u64) -> Self {
        let mut regs = [0; SMC_REGS];
        regs[0] = u64::from(fid);
        regs[1] = x1;
        regs[2] = x2;
        Self(regs)
    }

    #[inline]
    pub fn x(&self, n: usize) -> u64 {
        self.0[n]
    }
}

/// Access to the system registers and instructions the introspection core
/// needs on the PE that services a request.
///
/// Implementations must not let anything else on the same PE touch the
/// RAMINDEX registers while [`Cpu::ramindex`] runs.
pub trait Cpu {
    /// Reads MIDR_EL1.
    fn midr_el1(&self) -> u64;

    /// Reads CLIDR_EL1.
    fn clidr_el1(&self) -> u64;

    /// Reads ID_AA64MMFR2_EL1.
    fn id_aa64mmfr2_el1(&self) -> u64;

    /// Writes CSSELR_EL1, synchronizes the context and reads the CCSIDR_EL1
    /// of the selected cache.
    fn read_ccsidr(&mut self, csselr: u64) -> u64;

    /// Writes `selector` to the RAMINDEX register of `bank`, issues
    /// `DSB SY; ISB` and returns both result registers.
    fn ramindex(&mut self, bank: RamBank, selector: u64) -> [u64; 2];

    /// Issues a fast SMC and blocks until the secure monitor returns.
    fn smc(&mut self, args: &SmcRegs) -> SmcRegs;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn smc_arguments() {
        let regs = SmcRegs::call(0x8100_0002, 7, 3);
        assert_eq!(regs.0, [0x8100_0002, 7, 3, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(regs.x(1), 7);
    }

    #[test]
    fn only_el3_reaches_the_cortex_a720_banks() {
        assert_eq!(RamBank::CortexA72DSide.min_el(), 1);
        assert_eq!(RamBank::CortexA720ISide.min_el(), 3);
    }
}

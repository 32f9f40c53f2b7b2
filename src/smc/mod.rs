// SPDX-License-Identifier: Apache-2.0 OR MIT
//
// Copyright (c) 2024 by the author(s)

//! Normal world side of the cache line service of the secure monitor.
//!
//! Calls follow the SMC Calling Convention v1.2: fast SMC32 calls in the CPU
//! service owner range, set in `x1`, way in `x2`. On return `x0` is the
//! status, `x1` the raw tag word and `x2..x9` the line data.

use bitflags::bitflags;
use core::fmt;
use log::{debug, trace};

use crate::cpu::{Cpu, SmcRegs};
use crate::error::{Result, UnsupportedSnafu};

pub mod el3;

bitflags! {
    /// Call type bits of an SMCCC function identifier.
    pub struct CallFlags: u32 {
        /// Fast (atomic) call, as opposed to a yielding call.
        const FAST_CALL = 1 << 31;
        /// SMC64 calling convention; clear for SMC32.
        const SMC64 = 1 << 30;
    }
}

/// Owning entity number of CPU service calls.
pub const OWNER_CPU: u32 = 1;

const OWNER_SHIFT: u32 = 24;
const OWNER_MASK: u32 = 0x3f;

/// Returned in `x0` on success.
pub const SMC_OK: u64 = 0;
/// Returned in `x0` for unknown or unimplemented calls.
pub const SMC_UNK: u64 = u64::MAX;

/// Composes an SMCCC function identifier.
pub const fn function_id(flags: CallFlags, owner: u32, number: u16) -> u32 {
    flags.bits() | ((owner & OWNER_MASK) << OWNER_SHIFT) | number as u32
}

/// The calls of the cache line service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum CpuService {
    GetL1ICacheLine = 1,
    GetL1DCacheLine = 2,
    GetL2UCacheLine = 3,
    GetL3UCacheLine = 4,
}

impl CpuService {
    pub const ALL: [CpuService; 4] = [
        CpuService::GetL1ICacheLine,
        CpuService::GetL1DCacheLine,
        CpuService::GetL2UCacheLine,
        CpuService::GetL3UCacheLine,
    ];

    pub const fn function_id(self) -> u32 {
        function_id(CallFlags::FAST_CALL, OWNER_CPU, self as u16)
    }

    pub fn from_function_id(fid: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|service| service.function_id() == fid)
    }
}

impl fmt::Display for CpuService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CpuService::GetL1ICacheLine => "CPU_SVC_GET_L1I_CACHELINE",
            CpuService::GetL1DCacheLine => "CPU_SVC_GET_L1D_CACHELINE",
            CpuService::GetL2UCacheLine => "CPU_SVC_GET_L2U_CACHELINE",
            CpuService::GetL3UCacheLine => "CPU_SVC_GET_L3U_CACHELINE",
        })
    }
}

/// Issues `service` for `(set, way)` and returns the registers as the secure
/// monitor left them, whatever the status.
pub fn call_raw(cpu: &mut dyn Cpu, service: CpuService, set: i32, way: i32) -> SmcRegs {
    let ret = cpu.smc(&SmcRegs::call(service.function_id(), set as u64, way as u64));
    trace!("{} ({}, {}) -> {:x?}", service, set, way, ret.0);
    ret
}

/// Issues `service` for `(set, way)`, failing with `Unsupported` unless the
/// secure monitor reports success.
pub fn call(cpu: &mut dyn Cpu, service: CpuService, set: i32, way: i32) -> Result<SmcRegs> {
    let ret = call_raw(cpu, service, set, way);
    if ret.x(0) != SMC_OK {
        debug!("{} failed with status {:#x}", service, ret.x(0));
        return UnsupportedSnafu {
            what: "secure monitor call",
        }
        .fail();
    }
    Ok(ret)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::fake::FakeCpu;

    #[test]
    fn function_ids_are_fixed() {
        assert_eq!(CpuService::GetL1ICacheLine.function_id(), 0x8100_0001);
        assert_eq!(CpuService::GetL1DCacheLine.function_id(), 0x8100_0002);
        assert_eq!(CpuService::GetL2UCacheLine.function_id(), 0x8100_0003);
        assert_eq!(CpuService::GetL3UCacheLine.function_id(), 0x8100_0004);
        assert_eq!(
            function_id(CallFlags::FAST_CALL | CallFlags::SMC64, 4, 0),
            0xc400_0000
        );
    }

    #[test]
    fn function_id_round_trip() {
        for service in CpuService::ALL {
            assert_eq!(CpuService::from_function_id(service.function_id()), Some(service));
        }
        assert_eq!(CpuService::from_function_id(0x8400_0000), None);
        assert_eq!(CpuService::from_function_id(0xc100_0001), None);
    }

    #[test]
    fn arguments_are_passed_in_x1_and_x2() {
        let mut cpu = FakeCpu::cortex_a720();
        call(&mut cpu, CpuService::GetL1DCacheLine, 5, 3).unwrap();
        let args = cpu.last_smc().unwrap();
        assert_eq!(args.0[..3], [0x8100_0002, 5, 3]);
        assert!(args.0[3..].iter().all(|&x| x == 0));
    }

    #[test]
    fn reserved_calls_are_unsupported() {
        let mut cpu = FakeCpu::cortex_a720();
        assert_eq!(
            call(&mut cpu, CpuService::GetL2UCacheLine, 0, 0),
            Err(Error::Unsupported {
                what: "secure monitor call"
            })
        );
        assert_eq!(call_raw(&mut cpu, CpuService::GetL3UCacheLine, 0, 0).x(0), SMC_UNK);
    }

    #[test]
    fn no_monitor_service_means_unsupported() {
        let mut cpu = FakeCpu::cortex_a72();
        assert!(matches!(
            call(&mut cpu, CpuService::GetL1ICacheLine, 0, 0),
            Err(Error::Unsupported { .. })
        ));
    }
}

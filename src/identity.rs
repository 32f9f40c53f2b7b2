// SPDX-License-Identifier: Apache-2.0 OR MIT
//
// Copyright (c) 2024 by the author(s)

//! Identification of the core the introspection core runs on.

use core::fmt;

use log::{error, info};
use spin::Once;
use tock_registers::LocalRegisterCopy;

use crate::cpu::Cpu;
use crate::dumper::{cortex_a72, cortex_a720, Operations};
use crate::error::{Result, UnsupportedSnafu};
use crate::geometry::CacheHierarchy;
use crate::registers::MIDR_EL1;
use crate::uapi::VERSION;

/// The supported cores.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Core {
    /// Dumps lines with RAMINDEX at EL1.
    CortexA72,
    /// Dumps lines through the secure monitor.
    CortexA720,
}

impl Core {
    const CORTEX_A72_PART: u64 = 0xd08;
    const CORTEX_A720_PART: u64 = 0xd81;

    /// Looks the core up by implementer and part number. Variant and revision
    /// do not change the RAMINDEX layouts and are ignored.
    pub fn from_midr(midr: u64) -> Option<Self> {
        let midr = LocalRegisterCopy::<u64, MIDR_EL1::Register>::new(midr);
        if !midr.matches_all(MIDR_EL1::Implementer::Arm) {
            return None;
        }

        match midr.read(MIDR_EL1::PartNum) {
            Self::CORTEX_A72_PART => Some(Core::CortexA72),
            Self::CORTEX_A720_PART => Some(Core::CortexA720),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Core::CortexA72 => "Cortex-A72",
            Core::CortexA720 => "Cortex-A720",
        }
    }

    /// The dumpers of this core.
    pub fn operations(&self) -> &'static Operations {
        match self {
            Core::CortexA72 => &cortex_a72::OPERATIONS,
            Core::CortexA720 => &cortex_a720::OPERATIONS,
        }
    }
}

impl fmt::Display for Core {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What was learnt about the core at startup. Never changes afterwards.
#[derive(Debug, Clone, Copy)]
pub struct CoreIdentity {
    pub midr: u64,
    pub clidr: u64,
    pub core: Core,
    pub hierarchy: CacheHierarchy,
}

impl CoreIdentity {
    /// Reads MIDR_EL1 and CLIDR_EL1 and picks the dumpers for the core.
    /// Fails with `Unsupported` on any core without dumpers.
    pub fn probe(cpu: &dyn Cpu) -> Result<Self> {
        let midr = cpu.midr_el1();
        let clidr = cpu.clidr_el1();

        let core = match Core::from_midr(midr) {
            Some(core) => core,
            None => {
                error!("unsupported core (midr_el1: {:#x})", midr);
                return UnsupportedSnafu { what: "core" }.fail();
            }
        };

        Ok(Self {
            midr,
            clidr,
            core,
            hierarchy: CacheHierarchy::from_clidr(clidr),
        })
    }

    #[inline]
    pub fn operations(&self) -> &'static Operations {
        self.core.operations()
    }

    /// Logs the startup banner.
    pub fn describe(&self) {
        info!(
            "{} (version: {}, midr_el1: {:#x}, clidr_el1: {:#x})",
            self.core, VERSION, self.midr, self.clidr
        );
    }
}

static IDENTITY: Once<CoreIdentity> = Once::new();

/// Identifies the core once; later calls return the first result.
pub fn init(cpu: &dyn Cpu) -> Result<&'static CoreIdentity> {
    IDENTITY.try_call_once(|| {
        let identity = CoreIdentity::probe(cpu)?;
        identity.describe();
        Ok(identity)
    })
}

/// The identity recorded by [`init`], if it succeeded.
pub fn current() -> Option<&'static CoreIdentity> {
    IDENTITY.get()
}

// SPDX-License-Identifier: Apache-2.0 OR MIT
//
// Copyright (c) 2024 by the author(s)

//! Cache hierarchy and cache geometry, derived from CLIDR_EL1, CCSIDR_EL1 and
//! ID_AA64MMFR2_EL1.

use core::fmt;

use log::{debug, warn};
use snafu::ensure;
use tock_registers::LocalRegisterCopy;

use crate::cpu::Cpu;
use crate::error::{DecodeSnafu, InvalidArgumentSnafu, Result};
use crate::registers::{CCSIDR_EL1, CLIDR_EL1, CSSELR_EL1, CTYPE, ID_AA64MMFR2_EL1};

/// Maximum number of cache levels CLIDR_EL1 can describe.
pub const MAX_CACHE_LEVELS: usize = 7;

/// The kind of cache implemented at one level.
///
/// The discriminants are the CLIDR_EL1 `Ctype` encodings, which are also the
/// values reported to user space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u32)]
pub enum CacheType {
    #[default]
    None = 0b000,
    SeparateIandD = 0b011,
    Unified = 0b100,
}

impl CacheType {
    /// Decodes one `Ctype` field. Instruction-only and data-only caches, and
    /// the reserved encodings, are not recognised.
    pub fn from_ctype(ctype: u64) -> Result<Self> {
        match ctype {
            0b000 => Ok(CacheType::None),
            0b011 => Ok(CacheType::SeparateIandD),
            0b100 => Ok(CacheType::Unified),
            value => DecodeSnafu {
                register: "CLIDR_EL1",
                value,
            }
            .fail(),
        }
    }
}

impl fmt::Display for CacheType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CacheType::None => "No cache",
            CacheType::Unified => "Unified cache",
            CacheType::SeparateIandD => "Separate instruction and data caches",
        })
    }
}

/// The implemented cache levels, index 0 being L1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheHierarchy {
    levels: [CacheType; MAX_CACHE_LEVELS],
    depth: usize,
}

impl CacheHierarchy {
    /// Walks the `Ctype` fields of `clidr` up to the first level without a
    /// cache. A level with an unrecognised type also ends the walk.
    pub fn from_clidr(clidr: u64) -> Self {
        let clidr = LocalRegisterCopy::<u64, CLIDR_EL1::Register>::new(clidr);
        let mut levels = [CacheType::None; MAX_CACHE_LEVELS];
        let mut depth = 0;

        for (level, field) in CTYPE.iter().enumerate() {
            match CacheType::from_ctype(clidr.read(*field)) {
                Ok(CacheType::None) => break,
                Ok(ctype) => {
                    levels[level] = ctype;
                    depth += 1;
                }
                Err(err) => {
                    warn!("L{}: {}, ignoring this and deeper levels", level + 1, err);
                    break;
                }
            }
        }

        Self { levels, depth }
    }

    /// Number of implemented levels.
    #[inline]
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Type of every level, `CacheType::None` past the last implemented one.
    #[inline]
    pub fn levels(&self) -> &[CacheType; MAX_CACHE_LEVELS] {
        &self.levels
    }

    /// Checks that `(level, icache)` names an implemented cache and returns
    /// the type of that level.
    pub fn validate(&self, level: i32, icache: bool) -> Result<CacheType> {
        let ctype = usize::try_from(level)
            .ok()
            .filter(|&level| level < self.depth)
            .map(|level| self.levels[level]);
        let ctype = match ctype {
            Some(ctype) => ctype,
            None => return InvalidArgumentSnafu { what: "cache level not implemented" }.fail(),
        };
        ensure!(
            !(icache && ctype == CacheType::Unified),
            InvalidArgumentSnafu {
                what: "unified cache requested as instruction cache"
            }
        );
        Ok(ctype)
    }
}

/// Shape of one cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheGeometry {
    pub nsets: u32,
    pub nways: u32,
    /// Line size in bytes.
    pub linesize: u32,
}

impl CacheGeometry {
    /// Decodes a CCSIDR_EL1 value. `ccidx` selects the FEAT_CCIDX layout.
    pub fn from_ccsidr(ccsidr: u64, ccidx: bool) -> Self {
        let ccsidr = LocalRegisterCopy::<u64, CCSIDR_EL1::Register>::new(ccsidr);
        let (nsets, nways) = if ccidx {
            (
                ccsidr.read(CCSIDR_EL1::NumSetsCcidx),
                ccsidr.read(CCSIDR_EL1::AssociativityCcidx),
            )
        } else {
            (
                ccsidr.read(CCSIDR_EL1::NumSets),
                ccsidr.read(CCSIDR_EL1::Associativity),
            )
        };

        Self {
            nsets: nsets as u32 + 1,
            nways: nways as u32 + 1,
            linesize: 1 << (ccsidr.read(CCSIDR_EL1::LineSize) + 4),
        }
    }

    /// Total capacity in bytes.
    #[inline]
    pub fn size_bytes(&self) -> u64 {
        u64::from(self.nsets) * u64::from(self.nways) * u64::from(self.linesize)
    }

    /// Number of lines, i.e. `nsets * nways`.
    #[inline]
    pub fn lines(&self) -> u64 {
        u64::from(self.nsets) * u64::from(self.nways)
    }
}

impl fmt::Display for CacheGeometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} KiB, {} ways, {} sets, {}B lines",
            self.size_bytes() / 1024,
            self.nways,
            self.nsets,
            self.linesize
        )
    }
}

/// The CSSELR_EL1 value selecting `(level, icache)`.
pub fn csselr(level: u8, icache: bool) -> u64 {
    let mut csselr = LocalRegisterCopy::<u64, CSSELR_EL1::Register>::new(0);
    csselr.modify(CSSELR_EL1::Level.val(u64::from(level)));
    csselr.modify(if icache {
        CSSELR_EL1::InD::Instruction
    } else {
        CSSELR_EL1::InD::DataOrUnified
    });
    csselr.get()
}

/// Whether the PE implements the 64-bit CCSIDR_EL1 layout.
pub fn has_ccidx(cpu: &dyn Cpu) -> bool {
    LocalRegisterCopy::<u64, ID_AA64MMFR2_EL1::Register>::new(cpu.id_aa64mmfr2_el1())
        .read(ID_AA64MMFR2_EL1::CCIDX)
        != 0
}

/// Reads the geometry of the cache selected by `(level, icache)`, level 0
/// being L1.
///
/// Only the range of `level` is checked here; whether the level is
/// implemented is up to [`CacheHierarchy::validate`].
pub fn probe(cpu: &mut dyn Cpu, level: i32, icache: bool) -> Result<CacheGeometry> {
    let level = match u8::try_from(level) {
        Ok(level) if usize::from(level) < MAX_CACHE_LEVELS => level,
        _ => return InvalidArgumentSnafu { what: "cache level out of range" }.fail(),
    };

    let ccidx = has_ccidx(cpu);
    let ccsidr = cpu.read_ccsidr(csselr(level, icache));
    debug!("L{}{} ccsidr_el1: {:#x}", level + 1, if icache { "I" } else { "D" }, ccsidr);

    Ok(CacheGeometry::from_ccsidr(ccsidr, ccidx))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::fake::FakeCpu;

    #[test]
    fn ccsidr_legacy_layout() {
        // Cortex-A72 L1D: 256 sets, 2 ways, 64 byte lines.
        let ccsidr = (255 << 13) | (1 << 3) | 2;
        let geometry = CacheGeometry::from_ccsidr(ccsidr, false);
        assert_eq!(
            geometry,
            CacheGeometry {
                nsets: 256,
                nways: 2,
                linesize: 64
            }
        );
        assert_eq!(geometry.size_bytes(), 32 * 1024);
        assert_eq!(geometry.lines(), 512);
        assert_eq!(format!("{}", geometry), "32 KiB, 2 ways, 256 sets, 64B lines");
    }

    #[test]
    fn ccsidr_ccidx_layout() {
        let ccsidr = (1023u64 << 32) | (15 << 3) | 2;
        let geometry = CacheGeometry::from_ccsidr(ccsidr, true);
        assert_eq!(geometry.nsets, 1024);
        assert_eq!(geometry.nways, 16);
        assert_eq!(geometry.linesize, 64);
        // The same word read with the legacy layout means something else.
        assert_ne!(CacheGeometry::from_ccsidr(ccsidr, false), geometry);
    }

    #[test]
    fn every_line_size_encoding() {
        let sizes: [u32; 8] = [16, 32, 64, 128, 256, 512, 1024, 2048];
        for (encoding, size) in sizes.iter().enumerate() {
            assert_eq!(CacheGeometry::from_ccsidr(encoding as u64, false).linesize, *size);
        }
    }

    #[test]
    fn csselr_encoding() {
        assert_eq!(csselr(0, false), 0b0000);
        assert_eq!(csselr(0, true), 0b0001);
        assert_eq!(csselr(1, false), 0b0010);
        assert_eq!(csselr(6, true), 0b1101);
    }

    #[test]
    fn hierarchy_stops_at_first_missing_level() {
        // L1 separate, L2 unified, L3 none, L4 unified (never reached).
        let clidr = 0b011 | (0b100 << 3) | (0b100 << 9);
        let hierarchy = CacheHierarchy::from_clidr(clidr);
        assert_eq!(hierarchy.depth(), 2);
        assert_eq!(hierarchy.levels()[0], CacheType::SeparateIandD);
        assert_eq!(hierarchy.levels()[1], CacheType::Unified);
        assert_eq!(hierarchy.levels()[3], CacheType::None);
    }

    #[test]
    fn hierarchy_treats_reserved_type_as_terminator() {
        let clidr = 0b011 | (0b101 << 3) | (0b100 << 6);
        let hierarchy = CacheHierarchy::from_clidr(clidr);
        assert_eq!(hierarchy.depth(), 1);
        assert_eq!(
            CacheType::from_ctype(0b101),
            Err(Error::DecodeError {
                register: "CLIDR_EL1",
                value: 0b101
            })
        );
        // Instruction-only caches are not recognised either.
        assert!(CacheType::from_ctype(0b001).is_err());
    }

    #[test]
    fn hierarchy_validation() {
        let hierarchy = CacheHierarchy::from_clidr(0b011 | (0b100 << 3));
        assert_eq!(hierarchy.validate(0, true), Ok(CacheType::SeparateIandD));
        assert_eq!(hierarchy.validate(1, false), Ok(CacheType::Unified));
        assert!(matches!(
            hierarchy.validate(1, true),
            Err(Error::InvalidArgument { .. })
        ));
        assert!(matches!(
            hierarchy.validate(2, false),
            Err(Error::InvalidArgument { .. })
        ));
        assert!(matches!(
            hierarchy.validate(-1, false),
            Err(Error::InvalidArgument { .. })
        ));
    }

    #[test]
    fn cache_type_names() {
        assert_eq!(CacheType::None.to_string(), "No cache");
        assert_eq!(CacheType::Unified.to_string(), "Unified cache");
        assert_eq!(
            CacheType::SeparateIandD.to_string(),
            "Separate instruction and data caches"
        );
    }

    #[test]
    fn probe_reads_the_selected_cache() {
        let mut cpu = FakeCpu::cortex_a72();
        let l1i = probe(&mut cpu, 0, true).unwrap();
        assert_eq!((l1i.nsets, l1i.nways, l1i.linesize), (256, 3, 64));
        let l1d = probe(&mut cpu, 0, false).unwrap();
        assert_eq!((l1d.nsets, l1d.nways, l1d.linesize), (256, 2, 64));
        assert_eq!(cpu.last_csselr(), Some(0));
    }

    #[test]
    fn probe_uses_ccidx_layout_when_implemented() {
        let mut cpu = FakeCpu::cortex_a720();
        assert!(has_ccidx(&cpu));
        let l2 = probe(&mut cpu, 1, false).unwrap();
        assert_eq!((l2.nsets, l2.nways, l2.linesize), (1024, 8, 64));
    }

    #[test]
    fn probe_rejects_levels_out_of_range() {
        let mut cpu = FakeCpu::cortex_a72();
        assert!(matches!(probe(&mut cpu, 7, false), Err(Error::InvalidArgument { .. })));
        assert!(matches!(probe(&mut cpu, -1, false), Err(Error::InvalidArgument { .. })));
    }

    #[test]
    fn implemented_levels_have_sane_geometry() {
        for mut cpu in [FakeCpu::cortex_a72(), FakeCpu::cortex_a720()] {
            let hierarchy = CacheHierarchy::from_clidr(cpu.clidr_el1());
            for level in 0..hierarchy.depth() {
                let icaches: &[bool] = match hierarchy.levels()[level] {
                    CacheType::SeparateIandD => &[false, true],
                    _ => &[false],
                };
                for &icache in icaches {
                    let geometry = probe(&mut cpu, level as i32, icache).unwrap();
                    assert!(geometry.nsets >= 1 && geometry.nways >= 1);
                    assert!([16, 32, 64, 128].contains(&geometry.linesize));
                }
            }
        }
    }
}

// SPDX-License-Identifier: Apache-2.0 OR MIT
//
// Copyright (c) 2024 by the author(s)

//! Simulated hardware for host tests.
//!
//! [`FakeCpu`] answers system register reads and RAMINDEX selector words the
//! way a Cortex-A72 or Cortex-A720 would, and runs the real EL3 handler when
//! the secure monitor is called. [`FakeUserMemory`] stands in for a user
//! address space with faults at chosen addresses.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::ops::Range;
use std::vec::Vec;

use bytemuck::Pod;

use crate::cpu::{Cpu, RamBank, SmcRegs};
use crate::error::{Error, Result};
use crate::geometry::csselr;
use crate::layout::RamLayout;
use crate::smc::{el3, SMC_UNK};
use crate::uaccess::{UserAccess, UserPtr};

/// CCSIDR_EL1 value in the legacy 32-bit layout.
pub const fn ccsidr(nsets: u64, nways: u64, linesize: u64) -> u64 {
    ((nsets - 1) << 13) | ((nways - 1) << 3) | (linesize.trailing_zeros() as u64 - 4)
}

/// CCSIDR_EL1 value in the FEAT_CCIDX layout.
pub const fn ccsidr_ccidx(nsets: u64, nways: u64, linesize: u64) -> u64 {
    ((nsets - 1) << 32) | ((nways - 1) << 3) | (linesize.trailing_zeros() as u64 - 4)
}

/// A simulated PE.
#[derive(Debug, Clone, Default)]
pub struct FakeCpu {
    midr: u64,
    clidr: u64,
    mmfr2: u64,
    ccsidr: BTreeMap<u64, u64>,
    rams: BTreeMap<(RamBank, u64), [u64; 2]>,
    monitor: bool,
    csselr: Option<u64>,
    issued: Vec<(RamBank, u64)>,
    smcs: Vec<SmcRegs>,
}

impl FakeCpu {
    /// A Cortex-A72 r0p3 with 48KiB L1I, 32KiB L1D and a 1MiB L2.
    pub fn cortex_a72() -> Self {
        let mut cpu = Self {
            midr: 0x410f_d083,
            clidr: 0x0a20_0023,
            ..Default::default()
        };
        cpu.set_ccsidr(0, true, ccsidr(256, 3, 64));
        cpu.set_ccsidr(0, false, ccsidr(256, 2, 64));
        cpu.set_ccsidr(1, false, ccsidr(1024, 16, 64));
        cpu
    }

    /// A Cortex-A720 r0p1 with 32KiB L1I and L1D, a 512KiB L2 and a 2MiB L3,
    /// running a secure monitor with the cache line service.
    pub fn cortex_a720() -> Self {
        let mut cpu = Self {
            midr: 0x410f_d811,
            clidr: 0x8300_0123,
            mmfr2: 1 << 20,
            monitor: true,
            ..Default::default()
        };
        cpu.set_ccsidr(0, true, ccsidr_ccidx(128, 4, 64));
        cpu.set_ccsidr(0, false, ccsidr_ccidx(128, 4, 64));
        cpu.set_ccsidr(1, false, ccsidr_ccidx(1024, 8, 64));
        cpu.set_ccsidr(2, false, ccsidr_ccidx(2048, 16, 64));
        cpu
    }

    pub fn set_midr(&mut self, midr: u64) {
        self.midr = midr;
    }

    pub fn set_clidr(&mut self, clidr: u64) {
        self.clidr = clidr;
    }

    pub fn set_ccsidr(&mut self, level: u8, icache: bool, value: u64) {
        self.ccsidr.insert(csselr(level, icache), value);
    }

    /// Sets the result registers returned for `selector` on `bank`.
    pub fn set_ram(&mut self, bank: RamBank, selector: u64, words: [u64; 2]) {
        self.rams.insert((bank, selector), words);
    }

    /// Stores a whole line: `tag` as the tag RAM result registers and `data`
    /// spread over the data RAM reads of `layout`, each read returning the
    /// lower half of its bytes in the first register.
    pub fn fill_line(&mut self, layout: &RamLayout, set: u32, way: u32, tag: [u64; 2], data: &[u8]) {
        self.set_ram(layout.bank, layout.tag_selector(set, way), tag);

        let half = (layout.bytes_per_read / 2) as usize;
        let word = |bytes: &[u8]| {
            let mut buf = [0u8; 8];
            buf[..bytes.len()].copy_from_slice(bytes);
            u64::from_le_bytes(buf)
        };
        for chunk in 0..layout.reads {
            let start = (chunk * layout.bytes_per_read) as usize;
            let words = [
                word(&data[start..start + half]),
                word(&data[start + half..start + 2 * half]),
            ];
            self.set_ram(layout.bank, layout.data_selector(set, way, chunk), words);
        }
    }

    /// Every `(bank, selector)` issued so far.
    pub fn issued(&self) -> &[(RamBank, u64)] {
        &self.issued
    }

    pub fn clear_issued(&mut self) {
        self.issued.clear();
    }

    /// The last value written to CSSELR_EL1.
    pub fn last_csselr(&self) -> Option<u64> {
        self.csselr
    }

    /// The arguments of the last SMC.
    pub fn last_smc(&self) -> Option<SmcRegs> {
        self.smcs.last().copied()
    }
}

impl Cpu for FakeCpu {
    fn midr_el1(&self) -> u64 {
        self.midr
    }

    fn clidr_el1(&self) -> u64 {
        self.clidr
    }

    fn id_aa64mmfr2_el1(&self) -> u64 {
        self.mmfr2
    }

    fn read_ccsidr(&mut self, csselr: u64) -> u64 {
        self.csselr = Some(csselr);
        self.ccsidr.get(&csselr).copied().unwrap_or(0)
    }

    fn ramindex(&mut self, bank: RamBank, selector: u64) -> [u64; 2] {
        self.issued.push((bank, selector));
        self.rams.get(&(bank, selector)).copied().unwrap_or_default()
    }

    fn smc(&mut self, args: &SmcRegs) -> SmcRegs {
        self.smcs.push(*args);
        if !self.monitor {
            let mut ret = SmcRegs::default();
            ret.0[0] = SMC_UNK;
            return ret;
        }
        el3::handle_smc(self, args)
    }
}

/// A user address space of a few pages starting at [`FakeUserMemory::BASE`].
#[derive(Debug)]
pub struct FakeUserMemory {
    bytes: RefCell<Vec<u8>>,
    next: RefCell<usize>,
    faults: RefCell<Vec<Range<u64>>>,
    writes: RefCell<usize>,
}

impl Default for FakeUserMemory {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeUserMemory {
    pub const BASE: u64 = 0x4000_0000;
    const SIZE: usize = 0x10000;

    pub fn new() -> Self {
        Self {
            bytes: RefCell::new(vec![0; Self::SIZE]),
            next: RefCell::new(0),
            faults: RefCell::new(Vec::new()),
            writes: RefCell::new(0),
        }
    }

    /// Reserves `size` zeroed bytes, 8-byte aligned.
    pub fn alloc(&self, size: usize) -> UserPtr {
        let mut next = self.next.borrow_mut();
        let ptr = UserPtr(Self::BASE + *next as u64);
        *next = (*next + size + 7) & !7;
        assert!(*next <= Self::SIZE, "fake user memory exhausted");
        ptr
    }

    /// Makes every access touching `range` fault.
    pub fn fault(&self, range: Range<u64>) {
        self.faults.borrow_mut().push(range);
    }

    /// Number of successful writes into this memory.
    pub fn writes(&self) -> usize {
        *self.writes.borrow()
    }

    fn span(&self, ptr: UserPtr, len: usize) -> Option<Range<usize>> {
        let start = usize::try_from(ptr.0.checked_sub(Self::BASE)?).ok()?;
        let end = start.checked_add(len)?;
        (end <= Self::SIZE).then_some(start..end)
    }

    fn check(&self, ptr: UserPtr, len: usize) -> Result<Range<usize>> {
        let span = self.span(ptr, len).ok_or(Error::IoFault)?;
        let end = ptr.0 + len as u64;
        if self
            .faults
            .borrow()
            .iter()
            .any(|fault| fault.start < end && ptr.0 < fault.end)
        {
            return Err(Error::IoFault);
        }
        Ok(span)
    }

    pub fn read(&self, ptr: UserPtr, len: usize) -> Vec<u8> {
        let span = self.span(ptr, len).expect("read outside fake user memory");
        self.bytes.borrow()[span].to_vec()
    }

    pub fn write(&self, ptr: UserPtr, bytes: &[u8]) {
        let span = self.span(ptr, bytes.len()).expect("write outside fake user memory");
        self.bytes.borrow_mut()[span].copy_from_slice(bytes);
    }

    /// Reads a `T`, failing on injected faults.
    pub fn get<T: Pod>(&self, ptr: UserPtr) -> T {
        let mut value = T::zeroed();
        self.copy_from_user(bytemuck::bytes_of_mut(&mut value), ptr)
            .expect("faulting read from fake user memory");
        value
    }

    /// Reads a `T`, ignoring injected faults.
    pub fn get_unchecked<T: Pod>(&self, ptr: UserPtr) -> T {
        bytemuck::pod_read_unaligned(&self.read(ptr, core::mem::size_of::<T>()))
    }

    pub fn put<T: Pod>(&self, ptr: UserPtr, value: &T) {
        self.write(ptr, bytemuck::bytes_of(value));
    }
}

impl UserAccess for FakeUserMemory {
    fn copy_from_user(&self, dst: &mut [u8], src: UserPtr) -> Result<()> {
        let span = self.check(src, dst.len())?;
        dst.copy_from_slice(&self.bytes.borrow()[span]);
        Ok(())
    }

    fn copy_to_user(&self, dst: UserPtr, src: &[u8]) -> Result<()> {
        let span = self.check(dst, src.len())?;
        self.bytes.borrow_mut()[span].copy_from_slice(src);
        *self.writes.borrow_mut() += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::CacheGeometry;

    #[test]
    fn ccsidr_helpers_encode_the_geometry() {
        let g = CacheGeometry::from_ccsidr(ccsidr(256, 3, 64), false);
        assert_eq!((g.nsets, g.nways, g.linesize), (256, 3, 64));
        let g = CacheGeometry::from_ccsidr(ccsidr_ccidx(2048, 16, 128), true);
        assert_eq!((g.nsets, g.nways, g.linesize), (2048, 16, 128));
    }

    #[test]
    fn unknown_selectors_read_as_zero() {
        let mut cpu = FakeCpu::cortex_a72();
        assert_eq!(cpu.ramindex(RamBank::CortexA72DSide, 0x0800_0000), [0, 0]);
        cpu.set_ram(RamBank::CortexA72DSide, 0x0800_0000, [1, 2]);
        assert_eq!(cpu.ramindex(RamBank::CortexA72DSide, 0x0800_0000), [1, 2]);
        // Banks are separate.
        assert_eq!(cpu.ramindex(RamBank::CortexA72ISide, 0x0800_0000), [0, 0]);
        assert_eq!(cpu.issued().len(), 3);
        cpu.clear_issued();
        assert!(cpu.issued().is_empty());
    }

    #[test]
    fn user_memory_faults() {
        let mem = FakeUserMemory::new();
        let ptr = mem.alloc(16);
        mem.fault(ptr.0 + 8..ptr.0 + 16);
        assert_eq!(mem.copy_to_user(ptr, &[1; 8]), Ok(()));
        assert_eq!(mem.copy_to_user(ptr, &[1; 9]), Err(Error::IoFault));
        assert_eq!(mem.copy_to_user(UserPtr(0x10), &[1]), Err(Error::IoFault));
        assert_eq!(mem.writes(), 1);
    }
}

// SPDX-License-Identifier: Apache-2.0 OR MIT
//
// Copyright (c) 2024 by the author(s)

//! Dumped cache lines and the destinations they are written to.

use crate::error::{Error, Result};

/// Everything about a dumped line except its data.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LineHeader {
    pub set: i32,
    pub way: i32,
    pub valid: bool,
    /// Always false for instruction caches.
    pub dirty: bool,
    /// Non-secure bit of the physical address.
    pub ns: bool,
    /// Physical address of byte 0 of the line.
    pub tag: u64,
    /// Number of line bytes that follow.
    pub linesize: u32,
}

/// Where one line is written to.
///
/// The header is always written before any data, so a fault part way
/// through the data leaves a truthful `linesize` behind.
pub trait LineSlot {
    /// Size of the caller's data buffer in bytes.
    fn capacity(&mut self) -> Result<u32>;

    fn write_header(&mut self, header: &LineHeader) -> Result<()>;

    /// Writes `bytes` at byte `offset` of the data buffer.
    fn write_data(&mut self, offset: u32, bytes: &[u8]) -> Result<()>;
}

impl<T: LineSlot + ?Sized> LineSlot for &mut T {
    fn capacity(&mut self) -> Result<u32> {
        (**self).capacity()
    }

    fn write_header(&mut self, header: &LineHeader) -> Result<()> {
        (**self).write_header(header)
    }

    fn write_data(&mut self, offset: u32, bytes: &[u8]) -> Result<()> {
        (**self).write_data(offset, bytes)
    }
}

/// The caller's array of output lines.
pub trait LineArray {
    type Slot<'a>: LineSlot
    where
        Self: 'a;

    /// Returns the slot at `index`, which the dump engine only asks for while
    /// `index` is below the caller's line count.
    fn slot(&mut self, index: u32) -> Result<Self::Slot<'_>>;
}

/// One dumped line in kernel memory.
#[derive(Debug, PartialEq, Eq)]
pub struct CacheLine<'a> {
    pub set: i32,
    pub way: i32,
    pub valid: bool,
    pub dirty: bool,
    pub ns: bool,
    pub tag: u64,
    /// On input the capacity of `linedata`, on output the bytes written.
    pub linesize: u32,
    pub linedata: &'a mut [u8],
}

impl<'a> CacheLine<'a> {
    /// An empty line whose capacity is the whole of `linedata`.
    pub fn new(linedata: &'a mut [u8]) -> Self {
        Self {
            set: 0,
            way: 0,
            valid: false,
            dirty: false,
            ns: false,
            tag: 0,
            linesize: linedata.len() as u32,
            linedata,
        }
    }

    /// The bytes written by the last dump.
    pub fn data(&self) -> &[u8] {
        let len = (self.linesize as usize).min(self.linedata.len());
        &self.linedata[..len]
    }

    pub fn header(&self) -> LineHeader {
        LineHeader {
            set: self.set,
            way: self.way,
            valid: self.valid,
            dirty: self.dirty,
            ns: self.ns,
            tag: self.tag,
            linesize: self.linesize,
        }
    }
}

impl LineSlot for CacheLine<'_> {
    fn capacity(&mut self) -> Result<u32> {
        Ok(self.linesize.min(self.linedata.len() as u32))
    }

    fn write_header(&mut self, header: &LineHeader) -> Result<()> {
        self.set = header.set;
        self.way = header.way;
        self.valid = header.valid;
        self.dirty = header.dirty;
        self.ns = header.ns;
        self.tag = header.tag;
        self.linesize = header.linesize;
        Ok(())
    }

    fn write_data(&mut self, offset: u32, bytes: &[u8]) -> Result<()> {
        let start = offset as usize;
        let dst = start
            .checked_add(bytes.len())
            .and_then(|end| self.linedata.get_mut(start..end))
            .ok_or(Error::IoFault)?;
        dst.copy_from_slice(bytes);
        Ok(())
    }
}

impl<'a> LineArray for [CacheLine<'a>] {
    type Slot<'s> = &'s mut CacheLine<'a> where Self: 's;

    fn slot(&mut self, index: u32) -> Result<Self::Slot<'_>> {
        self.get_mut(index as usize).ok_or(Error::IoFault)
    }
}

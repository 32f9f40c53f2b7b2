// SPDX-License-Identifier: Apache-2.0 OR MIT
//
// Copyright (c) 2024 by the author(s)

//! Fault-safe access to caller memory.
//!
//! Every access to memory named by the caller goes through [`UserAccess`],
//! which reports a fault as [`Error::IoFault`] instead of taking it.

use core::mem::{offset_of, size_of};

use bytemuck::Pod;

use crate::error::{Error, Result};
use crate::line::{LineArray, LineHeader, LineSlot};
use crate::uapi::RawCacheLine;

/// An address in the caller's address space.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct UserPtr(pub u64);

impl UserPtr {
    /// `self + bytes`, faulting on overflow.
    pub fn offset(self, bytes: usize) -> Result<Self> {
        self.0
            .checked_add(bytes as u64)
            .map(UserPtr)
            .ok_or(Error::IoFault)
    }
}

/// Copies between kernel buffers and caller memory.
pub trait UserAccess {
    fn copy_from_user(&self, dst: &mut [u8], src: UserPtr) -> Result<()>;

    fn copy_to_user(&self, dst: UserPtr, src: &[u8]) -> Result<()>;
}

/// Reads one `T` from `src`.
pub fn get_user<T: Pod, U: UserAccess + ?Sized>(user: &U, src: UserPtr) -> Result<T> {
    let mut value = T::zeroed();
    user.copy_from_user(bytemuck::bytes_of_mut(&mut value), src)?;
    Ok(value)
}

/// Writes `value` to `dst`.
pub fn put_user<T: Pod, U: UserAccess + ?Sized>(user: &U, dst: UserPtr, value: &T) -> Result<()> {
    user.copy_to_user(dst, bytemuck::bytes_of(value))
}

/// The caller's array of `nlines` [`RawCacheLine`] at `base`.
pub struct UserLines<'u, U: UserAccess + ?Sized> {
    user: &'u U,
    base: UserPtr,
    nlines: u32,
}

impl<'u, U: UserAccess + ?Sized> UserLines<'u, U> {
    pub fn new(user: &'u U, base: UserPtr, nlines: u32) -> Self {
        Self { user, base, nlines }
    }
}

impl<'u, U: UserAccess + ?Sized> LineArray for UserLines<'u, U> {
    type Slot<'a> = UserLineSlot<'a, U> where Self: 'a;

    fn slot(&mut self, index: u32) -> Result<Self::Slot<'_>> {
        if index >= self.nlines {
            return Err(Error::IoFault);
        }
        let line = self.base.offset(index as usize * size_of::<RawCacheLine>())?;
        Ok(UserLineSlot {
            user: self.user,
            line,
            linedata: None,
        })
    }
}

/// One [`RawCacheLine`] in caller memory.
///
/// The header is stored field by field so that a fault stops the write
/// exactly where it happened.
pub struct UserLineSlot<'u, U: UserAccess + ?Sized> {
    user: &'u U,
    line: UserPtr,
    linedata: Option<UserPtr>,
}

impl<U: UserAccess + ?Sized> UserLineSlot<'_, U> {
    fn field(&self, offset: usize) -> Result<UserPtr> {
        self.line.offset(offset)
    }

    fn put<T: Pod>(&self, offset: usize, value: T) -> Result<()> {
        put_user(self.user, self.field(offset)?, &value)
    }
}

impl<U: UserAccess + ?Sized> LineSlot for UserLineSlot<'_, U> {
    fn capacity(&mut self) -> Result<u32> {
        get_user(self.user, self.field(offset_of!(RawCacheLine, linesize))?)
    }

    fn write_header(&mut self, header: &LineHeader) -> Result<()> {
        self.put(offset_of!(RawCacheLine, set), header.set)?;
        self.put(offset_of!(RawCacheLine, way), header.way)?;
        self.put(offset_of!(RawCacheLine, valid), header.valid as u8)?;
        self.put(offset_of!(RawCacheLine, dirty), header.dirty as u8)?;
        self.put(offset_of!(RawCacheLine, ns), header.ns as u8)?;
        self.put(offset_of!(RawCacheLine, tag), header.tag)?;
        self.put(offset_of!(RawCacheLine, linesize), header.linesize)
    }

    fn write_data(&mut self, offset: u32, bytes: &[u8]) -> Result<()> {
        let linedata = match self.linedata {
            Some(linedata) => linedata,
            None => {
                let linedata = UserPtr(get_user(self.user, self.field(offset_of!(RawCacheLine, linedata))?)?);
                self.linedata = Some(linedata);
                linedata
            }
        };
        self.user.copy_to_user(linedata.offset(offset as usize)?, bytes)
    }
}

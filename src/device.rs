// SPDX-License-Identifier: Apache-2.0 OR MIT
//
// Copyright (c) 2024 by the author(s)

//! The privileged command surface: version, cache hierarchy, cache geometry
//! and line dumps, each served on the PE that receives the command.

use core::mem::offset_of;

use log::{debug, trace};
use snafu::ensure;

use crate::cpu::Cpu;
use crate::engine::{self, DumpReport, Request};
use crate::error::{InvalidArgumentSnafu, Result};
use crate::geometry;
use crate::identity::{self, CoreIdentity};
use crate::line::LineArray;
use crate::uaccess::{get_user, put_user, UserAccess, UserLines, UserPtr};
use crate::uapi::{Ccsidr, Clid, Command, RawSelector, Version, VERSION};

/// The introspection device of one PE.
///
/// Commands run to completion on the caller's context; `&mut self` keeps two
/// of them from using the RAMINDEX registers at the same time.
#[derive(Debug)]
pub struct RamIndex<C: Cpu> {
    cpu: C,
    identity: CoreIdentity,
}

impl<C: Cpu> RamIndex<C> {
    /// Identifies the core behind `cpu`. Fails with `Unsupported` when there
    /// are no dumpers for it, in which case no command can be served.
    pub fn new(cpu: C) -> Result<Self> {
        let identity = CoreIdentity::probe(&cpu)?;
        identity.describe();
        Ok(Self { cpu, identity })
    }

    /// Like [`RamIndex::new`], but shares the identity recorded process-wide
    /// by [`identity::init`].
    pub fn shared(cpu: C) -> Result<Self> {
        let identity = *identity::init(&cpu)?;
        Ok(Self { cpu, identity })
    }

    pub fn identity(&self) -> &CoreIdentity {
        &self.identity
    }

    pub fn version(&self) -> Version {
        VERSION
    }

    /// The `Ctype` fields of CLIDR_EL1 as read at startup.
    pub fn clid(&self) -> Clid {
        let mut clid = Clid::default();
        for (level, ctype) in clid.ctype.iter_mut().enumerate() {
            *ctype = ((self.identity.clidr >> (3 * level)) & 0b111) as u32;
        }

        let hierarchy = &self.identity.hierarchy;
        if hierarchy.depth() == 0 {
            debug!("System has no caches");
        } else {
            debug!("Cache hierarchy:");
            for (level, ctype) in hierarchy.levels()[..hierarchy.depth()].iter().enumerate() {
                debug!("L{} -> '{}'", level + 1, ctype);
            }
        }

        clid
    }

    /// Geometry of the cache selected by `level` and `icache`.
    pub fn ccsidr(&mut self, level: i32, icache: i32) -> Result<Ccsidr> {
        ensure!(
            icache == 0 || icache == 1,
            InvalidArgumentSnafu { what: "cache type" }
        );
        let geometry = geometry::probe(&mut self.cpu, level, icache == 1)?;

        Ok(Ccsidr {
            level,
            icache,
            nsets: geometry.nsets as i32,
            nways: geometry.nways as i32,
            linesize: geometry.linesize as i32,
        })
    }

    /// Dumps the lines selected by `request` into `out`.
    pub fn dump<A: LineArray + ?Sized>(&mut self, request: &Request, out: &mut A) -> DumpReport {
        engine::dump(&mut self.cpu, &self.identity, request, out)
    }

    /// Serves the command with request code `code` whose payload lives at
    /// `arg` in the caller's memory.
    pub fn ioctl<U: UserAccess + ?Sized>(&mut self, user: &U, code: u32, arg: UserPtr) -> Result<()> {
        let (command, size) = match Command::decode(code) {
            Some(decoded) => decoded,
            None => {
                trace!("cmd: {:#x} 'RAMINDEX_UNRECOGNIZED_COMMAND'", code);
                return InvalidArgumentSnafu { what: "command" }.fail();
            }
        };
        trace!("cmd: {:#x} '{}'", code, command);
        ensure!(size == command.size(), InvalidArgumentSnafu { what: "payload size" });
        ensure!(code == command.code(), InvalidArgumentSnafu { what: "command direction" });

        match command {
            Command::Version => put_user(user, arg, &self.version()),
            Command::Clid => put_user(user, arg, &self.clid()),
            Command::Ccsidr => {
                let query: Ccsidr = get_user(user, arg)?;
                let reply = self.ccsidr(query.level, query.icache)?;
                put_user(user, arg, &reply)
            }
            Command::Dump => self.ioctl_dump(user, arg),
        }
    }

    fn ioctl_dump<U: UserAccess + ?Sized>(&mut self, user: &U, arg: UserPtr) -> Result<()> {
        let selector: RawSelector = get_user(user, arg)?;
        let request = Request {
            level: selector.level,
            icache: selector.icache,
            set: selector.set,
            way: selector.way,
            nlines: selector.nlines,
        };

        let mut lines = UserLines::new(user, UserPtr(selector.lines), selector.nlines);
        let report = self.dump(&request, &mut lines);

        // The count is reported even when the dump failed part way.
        let written = put_user(user, arg.offset(offset_of!(RawSelector, nlines))?, &report.produced);
        report.status?;
        written
    }
}

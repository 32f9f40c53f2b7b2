// SPDX-License-Identifier: Apache-2.0 OR MIT
//
// Copyright (c) 2024 by the author(s)

//! Turns one dump request into dumper calls, one per selected line.

use core::ops::Range;

use log::debug;

use crate::cpu::Cpu;
use crate::dumper::Operations;
use crate::error::{Error, InvalidArgumentSnafu, Result, UnsupportedSnafu};
use crate::geometry::{self, MAX_CACHE_LEVELS};
use crate::identity::CoreIdentity;
use crate::line::{LineArray, LineSlot};

/// Selects every set or every way.
pub const ALL: i32 = -1;

/// What to dump. `set` and `way` may be [`ALL`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Request {
    /// Cache level, 0 being L1.
    pub level: i32,
    /// 1 for the instruction cache, 0 for data and unified caches.
    pub icache: i32,
    pub set: i32,
    pub way: i32,
    /// Number of lines the caller has room for.
    pub nlines: u32,
}

/// Outcome of a dump: the lines written before `status` was known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DumpReport {
    pub produced: u32,
    pub status: Result<()>,
}

fn level_name(level: i32, icache: bool) -> (i32, &'static str) {
    (level + 1, if icache { "instruction" } else { "data" })
}

/// The sets or ways selected by `index`, checked against `count`.
fn span(index: i32, count: u32) -> Option<Range<u32>> {
    match u32::try_from(index) {
        Err(_) => Some(0..count),
        Ok(index) if index < count => Some(index..index + 1),
        Ok(_) => None,
    }
}

/// Every `(set, way)` of `sets` x `ways` in set-major order, at most `cap`
/// of them.
pub fn lines(sets: Range<u32>, ways: Range<u32>, cap: u32) -> impl Iterator<Item = (u32, u32)> {
    sets.flat_map(move |set| ways.clone().map(move |way| (set, way)))
        .take(cap as usize)
}

/// Dumps the lines selected by `request` into `out`, in set-major order.
///
/// Stops at the first error. Lines produced up to that point are valid and
/// counted in the report; the failed line is not.
pub fn dump<A>(cpu: &mut dyn Cpu, identity: &CoreIdentity, request: &Request, out: &mut A) -> DumpReport
where
    A: LineArray + ?Sized,
{
    let mut produced = 0;
    let status = run(cpu, identity, request, out, &mut produced);
    DumpReport { produced, status }
}

fn run<A>(cpu: &mut dyn Cpu, identity: &CoreIdentity, request: &Request, out: &mut A, produced: &mut u32) -> Result<()>
where
    A: LineArray + ?Sized,
{
    let icache = match request.icache {
        0 => false,
        1 => true,
        _ => return InvalidArgumentSnafu { what: "cache type" }.fail(),
    };
    let level = request.level;
    if !(0..MAX_CACHE_LEVELS as i32).contains(&level) {
        return InvalidArgumentSnafu { what: "cache level" }.fail();
    }

    let (l, kind) = level_name(level, icache);
    let unsupported = || {
        debug!("There is no associated operation to dump L{} {} cache", l, kind);
        UnsupportedSnafu { what: "cache" }.fail()
    };

    // Levels past the table have no slot to be missing from.
    let dump_line = identity.operations().lookup(level, icache);
    if dump_line.is_none() && level < Operations::LEVELS {
        return unsupported();
    }
    identity.hierarchy.validate(level, icache)?;
    let dump_line = match dump_line {
        Some(dump_line) => dump_line,
        None => return unsupported(),
    };
    let geometry = geometry::probe(cpu, level, icache)?;

    let sets = match span(request.set, geometry.nsets) {
        Some(sets) => sets,
        None => {
            debug!(
                "Selected L{} {} cache has {} sets whereas {} set has been requested",
                l, kind, geometry.nsets, request.set
            );
            return InvalidArgumentSnafu { what: "set" }.fail();
        }
    };
    let ways = match span(request.way, geometry.nways) {
        Some(ways) => ways,
        None => {
            debug!(
                "Selected L{} {} cache has {} ways whereas {} way has been requested",
                l, kind, geometry.nways, request.way
            );
            return InvalidArgumentSnafu { what: "way" }.fail();
        }
    };

    for (set, way) in lines(sets, ways, request.nlines) {
        let mut slot = out.slot(*produced)?;
        let len = slot.capacity()?.min(geometry.linesize);
        dump_line(cpu, set as i32, way as i32, len, &mut slot as &mut dyn LineSlot)?;
        *produced += 1;
    }

    Ok(())
}

impl DumpReport {
    /// The number of lines produced, or the error that stopped the dump.
    pub fn into_result(self) -> Result<u32, Error> {
        self.status.map(|()| self.produced)
    }
}

// SPDX-License-Identifier: Apache-2.0 OR MIT
//
// Copyright (c) 2024 by the author(s)

//! Access to the internal cache RAMs of Cortex-A processors.
//!
//! Arm cores expose the tag and data arrays of their caches through an
//! IMPLEMENTATION DEFINED RAMINDEX mechanism: a selector word naming a RAM,
//! a set, a way and a slice of the line is written to a system register, and
//! the result comes back in one or two others. This crate knows the selector
//! encodings and result layouts of the supported cores and serves dump
//! requests on top of them.
//!
//! ## Currently Supported Cores
//!
//! - [x] Cortex-A72, L1 instruction and data caches, at EL1
//! - [x] Cortex-A720, L1 instruction and data caches, through the secure monitor
//!
//! ## Usage
//!
//! ```rust,ignore
//! use ramindex::{asm::Aarch64, engine::{Request, ALL}, line::CacheLine, RamIndex};
//!
//! let mut dev = RamIndex::new(Aarch64)?;
//! let mut data = [0u8; 64];
//! let mut lines = [CacheLine::new(&mut data)];
//! let request = Request { level: 0, icache: 0, set: 12, way: ALL, nlines: 1 };
//! let produced = dev.dump(&request, &mut lines[..]).into_result()?;
//! ```
//!
//! ## Disclaimer
//!
//! Descriptive comments in the source files are taken from the Technical
//! Reference Manuals of the respective cores and the
//! [ARM Architecture Reference Manual for A-profile architecture](https://developer.arm.com/documentation/ddi0487/latest).

#![cfg_attr(not(any(test, feature = "fakes")), no_std)]

pub mod asm;
pub mod cpu;
pub mod device;
pub mod dumper;
pub mod engine;
pub mod error;
pub mod geometry;
pub mod identity;
pub mod layout;
pub mod line;
pub mod registers;
pub mod smc;
pub mod uaccess;
pub mod uapi;

#[cfg(any(test, feature = "fakes"))]
pub mod fake;

pub use cpu::{Cpu, RamBank};
pub use device::RamIndex;
pub use error::{Error, Result};
pub use geometry::{CacheGeometry, CacheType};

// SPDX-License-Identifier: Apache-2.0 OR MIT
//
// Copyright (c) 2024 by the author(s)

//! System registers used to identify the core and its caches.

#[macro_use]
mod macros;
mod ccsidr_el1;
mod clidr_el1;
mod csselr_el1;
mod id_aa64mmfr2_el1;
mod midr_el1;

pub use cortex_a::registers::{CurrentEL, DAIF};
pub use tock_registers::interfaces::*;

pub use self::ccsidr_el1::CCSIDR_EL1;
pub use self::clidr_el1::{CLIDR_EL1, CTYPE};
pub use self::csselr_el1::CSSELR_EL1;
pub use self::id_aa64mmfr2_el1::ID_AA64MMFR2_EL1;
pub use self::midr_el1::MIDR_EL1;

// SPDX-License-Identifier: Apache-2.0 OR MIT
//
// Copyright (c) 2024 by the author(s)

//! Cache Level ID Register
//!
//! Identifies the type of cache, or caches, that are implemented at each
//! level and can be managed using the architected cache maintenance
//! instructions, up to a maximum of seven levels.

use tock_registers::{fields::Field, interfaces::Readable, register_bitfields};

register_bitfields! {u64,
    pub CLIDR_EL1 [
        /// Inner cache boundary.
        ICB OFFSET(30) NUMBITS(3) [],

        /// Level of Unification Uniprocessor for the cache hierarchy.
        LoUU OFFSET(27) NUMBITS(3) [],

        /// Level of Coherence for the cache hierarchy.
        LoC OFFSET(24) NUMBITS(3) [],

        /// Level of Unification Inner Shareable for the cache hierarchy.
        LoUIS OFFSET(21) NUMBITS(3) [],

        /// Cache Type fields. Indicate the type of cache implemented at each
        /// level, from Level 1 up to a maximum of seven levels.
        ///
        /// 0b000 No cache.
        /// 0b001 Instruction cache only.
        /// 0b010 Data cache only.
        /// 0b011 Separate instruction and data caches.
        /// 0b100 Unified cache.
        Ctype7 OFFSET(18) NUMBITS(3) [],
        Ctype6 OFFSET(15) NUMBITS(3) [],
        Ctype5 OFFSET(12) NUMBITS(3) [],
        Ctype4 OFFSET(9) NUMBITS(3) [],
        Ctype3 OFFSET(6) NUMBITS(3) [],
        Ctype2 OFFSET(3) NUMBITS(3) [],
        Ctype1 OFFSET(0) NUMBITS(3) []
    ]
}

/// The `Ctype<n>` fields in level order, index 0 being Level 1.
pub const CTYPE: [Field<u64, CLIDR_EL1::Register>; 7] = [
    CLIDR_EL1::Ctype1,
    CLIDR_EL1::Ctype2,
    CLIDR_EL1::Ctype3,
    CLIDR_EL1::Ctype4,
    CLIDR_EL1::Ctype5,
    CLIDR_EL1::Ctype6,
    CLIDR_EL1::Ctype7,
];

pub struct Reg;

impl Readable for Reg {
    type T = u64;
    type R = CLIDR_EL1::Register;

    sys_coproc_read_raw!(u64, "CLIDR_EL1", "x");
}

pub const CLIDR_EL1: Reg = Reg {};

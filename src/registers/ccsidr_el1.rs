// SPDX-License-Identifier: Apache-2.0 OR MIT
//
// Copyright (c) 2024 by the author(s)

//! Current Cache Size ID Register
//!
//! Provides information about the architecture of the currently selected
//! cache. The layout of the set and associativity fields depends on whether
//! FEAT_CCIDX is implemented, see `ID_AA64MMFR2_EL1::CCIDX`.

use tock_registers::{interfaces::Readable, register_bitfields};

register_bitfields! {u64,
    pub CCSIDR_EL1 [
        /// (Number of sets in cache) - 1, when FEAT_CCIDX is implemented.
        NumSetsCcidx OFFSET(32) NUMBITS(24) [],

        /// (Associativity of cache) - 1, when FEAT_CCIDX is implemented.
        AssociativityCcidx OFFSET(3) NUMBITS(21) [],

        /// (Number of sets in cache) - 1. The number of sets does not have
        /// to be a power of 2.
        NumSets OFFSET(13) NUMBITS(15) [],

        /// (Associativity of cache) - 1. The associativity does not have to
        /// be a power of 2.
        Associativity OFFSET(3) NUMBITS(10) [],

        /// (Log2(Number of bytes in cache line)) - 4.
        LineSize OFFSET(0) NUMBITS(3) []
    ]
}

pub struct Reg;

impl Readable for Reg {
    type T = u64;
    type R = CCSIDR_EL1::Register;

    sys_coproc_read_raw!(u64, "CCSIDR_EL1", "x");
}

pub const CCSIDR_EL1: Reg = Reg {};

// SPDX-License-Identifier: Apache-2.0 OR MIT
//
// Copyright (c) 2024 by the author(s)

//! AArch64 Memory Model Feature Register 2 - EL1

use tock_registers::{interfaces::Readable, register_bitfields};

register_bitfields! {u64,
    pub ID_AA64MMFR2_EL1 [
        /// Support for the extended 64-bit CCSIDR_EL1 format.
        CCIDX OFFSET(20) NUMBITS(4) [
            ThirtyTwoBit = 0b0000,
            SixtyFourBit = 0b0001
        ]
    ]
}

pub struct Reg;

impl Readable for Reg {
    type T = u64;
    type R = ID_AA64MMFR2_EL1::Register;

    // Older assemblers do not know the name.
    sys_coproc_read_raw!(u64, "S3_0_C0_C7_2", "x");
}

pub const ID_AA64MMFR2_EL1: Reg = Reg {};

// SPDX-License-Identifier: Apache-2.0 OR MIT
//
// Copyright (c) 2024 by the author(s)

//! Main ID Register - EL1
//!
//! Provides identification information for the PE, including an
//! implementer code for the device and a device ID number.

use tock_registers::{interfaces::Readable, register_bitfields};

register_bitfields! {u64,
    pub MIDR_EL1 [
        /// The Implementer code.
        ///
        /// 0x41 Arm Limited.
        Implementer OFFSET(24) NUMBITS(8) [
            Arm = 0x41
        ],

        /// Variant number. Typically used to distinguish between different
        /// product variants, or major revisions of a product.
        Variant OFFSET(20) NUMBITS(4) [],

        /// Architecture. 0b1111 means the architectural features are
        /// individually identified in the ID_* registers.
        Architecture OFFSET(16) NUMBITS(4) [],

        /// An IMPLEMENTATION DEFINED primary part number for the device.
        PartNum OFFSET(4) NUMBITS(12) [],

        /// An IMPLEMENTATION DEFINED revision number for the device.
        Revision OFFSET(0) NUMBITS(4) []
    ]
}

pub struct Reg;

impl Readable for Reg {
    type T = u64;
    type R = MIDR_EL1::Register;

    sys_coproc_read_raw!(u64, "MIDR_EL1", "x");
}

pub const MIDR_EL1: Reg = Reg {};

// SPDX-License-Identifier: Apache-2.0 OR MIT
//
// Copyright (c) 2024 by the author(s)

//! Accessor bodies for the `Readable`/`Writeable` implementations of system
//! registers that `cortex-a` does not provide.
//!
//! The register name is passed as a string so that implementation defined
//! registers can be given by their `S<op0>_<op1>_C<n>_C<m>_<op2>` encoding.

macro_rules! sys_coproc_read_raw {
    ($width:ty, $asm_reg_name:tt, $asm_width:tt) => {
        #[inline]
        fn get(&self) -> $width {
            match () {
                #[cfg(target_arch = "aarch64")]
                () => {
                    let reg;
                    unsafe {
                        core::arch::asm!(
                            concat!("mrs {reg:", $asm_width, "}, ", $asm_reg_name),
                            reg = out(reg) reg,
                            options(nomem, nostack),
                        );
                    }
                    reg
                }

                #[cfg(not(target_arch = "aarch64"))]
                () => unimplemented!(),
            }
        }
    };
}

macro_rules! sys_coproc_write_raw {
    ($width:ty, $asm_reg_name:tt, $asm_width:tt) => {
        #[inline]
        fn set(&self, value: $width) {
            match () {
                #[cfg(target_arch = "aarch64")]
                () => unsafe {
                    core::arch::asm!(
                        concat!("msr ", $asm_reg_name, ", {reg:", $asm_width, "}"),
                        reg = in(reg) value,
                        options(nomem, nostack),
                    );
                },

                #[cfg(not(target_arch = "aarch64"))]
                () => {
                    let _ = value;
                    unimplemented!()
                }
            }
        }
    };
}

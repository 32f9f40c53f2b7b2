// SPDX-License-Identifier: Apache-2.0 OR MIT
//
// Copyright (c) 2024 by the author(s)

//! Errors reported by the cache introspection core.

use snafu::Snafu;

/// Everything that can go wrong while identifying the core, probing a cache
/// or dumping cache lines. Nothing is retried; every error reaches the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    /// A level, cache type, set or way was rejected by the cache geometry.
    #[snafu(display("invalid argument: {what}"))]
    InvalidArgument { what: &'static str },

    /// The core is not known, the requested cache has no dumper on this core,
    /// or the secure monitor refused the call.
    #[snafu(display("unsupported: {what}"))]
    Unsupported { what: &'static str },

    /// Accessing the caller's memory faulted, or a buffer had the wrong size.
    #[snafu(display("fault while accessing caller memory"))]
    IoFault,

    /// An identification register carried a reserved encoding.
    #[snafu(display("reserved encoding {value:#x} in {register}"))]
    DecodeError { register: &'static str, value: u64 },
}

pub type Result<T, E = Error> = core::result::Result<T, E>;

const EIO: i32 = 5;
const EFAULT: i32 = 14;
const EINVAL: i32 = 22;
const EOPNOTSUPP: i32 = 95;

impl Error {
    /// The negative errno the command surface reports for this error.
    pub const fn errno(&self) -> i32 {
        match self {
            Error::InvalidArgument { .. } => -EINVAL,
            Error::Unsupported { .. } => -EOPNOTSUPP,
            Error::IoFault => -EFAULT,
            Error::DecodeError { .. } => -EIO,
        }
    }
}

impl From<Error> for i32 {
    fn from(err: Error) -> i32 {
        err.errno()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errno_values() {
        assert_eq!(Error::InvalidArgument { what: "set" }.errno(), -22);
        assert_eq!(Error::Unsupported { what: "core" }.errno(), -95);
        assert_eq!(Error::IoFault.errno(), -14);
        assert_eq!(
            Error::DecodeError {
                register: "CLIDR_EL1",
                value: 5
            }
            .errno(),
            -5
        );
    }

    #[test]
    fn display() {
        assert_eq!(
            format!("{}", Error::InvalidArgument { what: "way out of range" }),
            "invalid argument: way out of range"
        );
        assert_eq!(
            format!(
                "{}",
                Error::DecodeError {
                    register: "CLIDR_EL1",
                    value: 0x5
                }
            ),
            "reserved encoding 0x5 in CLIDR_EL1"
        );
    }
}

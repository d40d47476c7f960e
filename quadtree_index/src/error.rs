// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Construction errors.

/// Errors raised when a tree or codec is configured with unusable parameters.
#[derive(thiserror::Error, Clone, Copy, Debug, PartialEq)]
pub enum Error {
    /// The requested depth exceeds [`MAX_DEPTH`](crate::MAX_DEPTH).
    #[error("tree depth {depth} exceeds the supported maximum of {max}")]
    DepthTooLarge {
        /// Requested depth.
        depth: u32,
        /// Largest accepted depth.
        max: u32,
    },
    /// Field dimensions must be finite and strictly positive.
    #[error("field size {width}x{height} must be finite and positive")]
    InvalidField {
        /// Requested field width.
        width: f64,
        /// Requested field height.
        height: f64,
    },
}

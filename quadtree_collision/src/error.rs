// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Errors surfaced by [`Detector`](crate::Detector).

use quadtree_index::ItemId;

/// Errors from constructing a detector or feeding it items.
#[derive(thiserror::Error, Clone, Copy, Debug, PartialEq)]
pub enum Error {
    /// The tree could not be built with the given configuration.
    #[error(transparent)]
    Index(#[from] quadtree_index::Error),
    /// Item bounds are not finite or have a negative size.
    #[error("item bounds must be finite with non-negative size")]
    InvalidBounds,
    /// The id was never issued by this detector, or was forgotten.
    #[error("unknown item {0}")]
    UnknownItem(ItemId),
    /// The tree could not place a new item, so no id was issued.
    #[error("item could not be addressed to a bucket")]
    Unaddressable,
}

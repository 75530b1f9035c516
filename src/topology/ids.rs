//! Identifier Partitioning
//!
//! Real and synthetic RandR identifiers share one numeric space. Every
//! identifier the display server hands out keeps the bits under
//! [`SPLIT_MASK`] clear; a synthetic identifier stores a 1-based split index
//! in exactly those bits, on top of the real identifier it was derived from.
//!
//! ```text
//!   31        24 23  20 19                    0
//!  ┌────────────┬──────┬───────────────────────┐
//!  │  real id   │split │        real id        │
//!  └────────────┴──────┴───────────────────────┘
//! ```
//!
//! A split index of zero means "not synthetic", so at most
//! [`MAX_SPLIT_INDEX`] leaves can be derived from one physical object.

use thiserror::Error;

/// Numeric identifier of an output, controller or mode
pub type Xid = u32;

/// Reserved bits that carry the split index
pub const SPLIT_MASK: Xid = 0x00f0_0000;

/// Position of the split index inside an identifier
pub const SPLIT_SHIFT: u32 = 20;

/// Largest split index that fits into [`SPLIT_MASK`]
pub const MAX_SPLIT_INDEX: u32 = SPLIT_MASK >> SPLIT_SHIFT;

/// Identifier encoding errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdError {
    /// Tried to derive a synthetic identifier from one that already is
    #[error("Identifier 0x{0:08x} is already synthetic")]
    AlreadySynthetic(Xid),

    /// Split index is zero or does not fit the reserved bits
    #[error("Split index {0} out of range (1..=15)")]
    SplitIndexOutOfRange(u32),
}

/// Clear the reserved bits, yielding the real identifier behind `id`
#[inline]
pub fn strip(id: Xid) -> Xid {
    id & !SPLIT_MASK
}

/// Whether `id` carries a split index
#[inline]
pub fn is_synthetic(id: Xid) -> bool {
    id & SPLIT_MASK != 0
}

/// Split index stored in `id` (0 for real identifiers)
#[inline]
pub fn split_index(id: Xid) -> u32 {
    (id & SPLIT_MASK) >> SPLIT_SHIFT
}

/// Derive the synthetic identifier for leaf `split_index` of `real_id`
///
/// # Errors
///
/// Fails if `real_id` already carries a split index or if `split_index` is
/// not in `1..=MAX_SPLIT_INDEX`. Both mean the caller broke an invariant.
pub fn make_synthetic(real_id: Xid, split_index: u32) -> Result<Xid, IdError> {
    if is_synthetic(real_id) {
        return Err(IdError::AlreadySynthetic(real_id));
    }
    if split_index == 0 || split_index > MAX_SPLIT_INDEX {
        return Err(IdError::SplitIndexOutOfRange(split_index));
    }

    Ok(strip(real_id) | (split_index << SPLIT_SHIFT))
}

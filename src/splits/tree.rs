//! Split trees
//!
//! Owned form of a split program, used when authoring or printing
//! configurations. The byte grammar is
//!
//! ```text
//! <splits> := ('H' | 'V') <cut: u32, native endian> <splits> <splits>
//!           | 'N'
//! ```
//!
//! `H` cuts horizontally (the cut is a y offset, first child on top), `V`
//! cuts vertically (x offset, first child on the left).

use bytes::{Buf, BufMut};

use super::{Result, SplitError};
use crate::topology::ids::MAX_SPLIT_INDEX;

/// Split nodes a tree may hold while keeping every leaf addressable
pub const MAX_SPLITS: u32 = MAX_SPLIT_INDEX - 1;

/// Leaf node byte
pub const NODE_LEAF: u8 = b'N';
/// Horizontal split node byte
pub const NODE_HORIZONTAL: u8 = b'H';
/// Vertical split node byte
pub const NODE_VERTICAL: u8 = b'V';

/// Recursive split description of one output
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SplitTree {
    /// No further splits
    #[default]
    Leaf,

    /// Top/bottom split at `cut` pixels from the top
    Horizontal {
        /// Height of the top part
        cut: u32,
        /// Part above the cut
        top: Box<SplitTree>,
        /// Part below the cut
        bottom: Box<SplitTree>,
    },

    /// Left/right split at `cut` pixels from the left
    Vertical {
        /// Width of the left part
        cut: u32,
        /// Part left of the cut
        left: Box<SplitTree>,
        /// Part right of the cut
        right: Box<SplitTree>,
    },
}

impl SplitTree {
    /// Horizontal split helper
    pub fn horizontal(cut: u32, top: SplitTree, bottom: SplitTree) -> Self {
        Self::Horizontal {
            cut,
            top: Box::new(top),
            bottom: Box::new(bottom),
        }
    }

    /// Vertical split helper
    pub fn vertical(cut: u32, left: SplitTree, right: SplitTree) -> Self {
        Self::Vertical {
            cut,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Whether the tree splits anything at all
    pub fn is_leaf(&self) -> bool {
        matches!(self, Self::Leaf)
    }

    /// Number of leaves (virtual outputs) the tree produces
    pub fn leaf_count(&self) -> u32 {
        match self {
            Self::Leaf => 1,
            Self::Horizontal { top, bottom, .. } => top.leaf_count() + bottom.leaf_count(),
            Self::Vertical { left, right, .. } => left.leaf_count() + right.leaf_count(),
        }
    }

    /// 1-based split index of the leaf containing the point `(x, y)`
    ///
    /// Coordinates are relative to the split output. Points on a cut belong
    /// to the second child.
    pub fn leaf_at(&self, x: u32, y: u32) -> u32 {
        match self {
            Self::Leaf => 1,
            Self::Horizontal { cut, top, bottom } => {
                if y < *cut {
                    top.leaf_at(x, y)
                } else {
                    top.leaf_count() + bottom.leaf_at(x, y - cut)
                }
            }
            Self::Vertical { cut, left, right } => {
                if x < *cut {
                    left.leaf_at(x, y)
                } else {
                    left.leaf_count() + right.leaf_at(x - cut, y)
                }
            }
        }
    }

    /// Encode into the split program byte grammar
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.encode_into(&mut out);
        out
    }

    fn encode_into(&self, out: &mut Vec<u8>) {
        match self {
            Self::Leaf => out.put_u8(NODE_LEAF),
            Self::Horizontal { cut, top, bottom } => {
                out.put_u8(NODE_HORIZONTAL);
                out.put_u32_ne(*cut);
                top.encode_into(out);
                bottom.encode_into(out);
            }
            Self::Vertical { cut, left, right } => {
                out.put_u8(NODE_VERTICAL);
                out.put_u32_ne(*cut);
                left.encode_into(out);
                right.encode_into(out);
            }
        }
    }

    /// Decode a split program, ignoring any bytes after the tree
    ///
    /// # Errors
    ///
    /// Fails on an unknown node byte, a program that ends mid-node, or
    /// more than [`MAX_SPLITS`] split nodes.
    pub fn decode(program: &[u8]) -> Result<Self> {
        let mut cursor = program;
        let mut splits = 0;
        Self::decode_node(program.len(), &mut cursor, &mut splits)
    }

    fn decode_node(total: usize, cursor: &mut &[u8], splits: &mut u32) -> Result<Self> {
        let offset = total - cursor.len();
        if !cursor.has_remaining() {
            return Err(SplitError::Truncated { offset });
        }

        match cursor.get_u8() {
            NODE_LEAF => Ok(Self::Leaf),
            node @ (NODE_HORIZONTAL | NODE_VERTICAL) => {
                // nesting depth never exceeds the split count
                *splits += 1;
                if *splits > MAX_SPLITS {
                    return Err(SplitError::TooManyLeaves {
                        max: MAX_SPLIT_INDEX,
                    });
                }
                if cursor.remaining() < 4 {
                    return Err(SplitError::Truncated { offset });
                }
                let cut = cursor.get_u32_ne();
                let first = Self::decode_node(total, cursor, splits)?;
                let second = Self::decode_node(total, cursor, splits)?;
                Ok(if node == NODE_HORIZONTAL {
                    Self::horizontal(cut, first, second)
                } else {
                    Self::vertical(cut, first, second)
                })
            }
            byte => Err(SplitError::UnknownNode { offset, byte }),
        }
    }
}

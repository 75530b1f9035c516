//! Split Layout Interpretation
//!
//! Walks a split program and produces the rectangles it cuts a controller
//! into. The walk is lazy and keeps an explicit stack of pending
//! rectangles, so a program is interpreted without recursion and without
//! building a [`SplitTree`](crate::splits::SplitTree) first.
//!
//! Leaves come out in pre-order, first child before second child. Their
//! split indices count up from 1 in that order; this is the order consumers
//! see the virtual outputs in.
//!
//! ```text
//! V 1680 N N  on (0, 0, 3360, 1050)
//!
//!   ┌──────────────┬──────────────┐
//!   │              │              │
//!   │  #1          │  #2          │
//!   │  0,0         │  1680,0      │
//!   │  1680x1050   │  1680x1050   │
//!   └──────────────┴──────────────┘
//! ```

use bytes::Buf;
use tracing::trace;

use crate::splits::tree::{NODE_HORIZONTAL, NODE_LEAF, NODE_VERTICAL};
use crate::splits::{Result, SplitError};
use crate::topology::ids::MAX_SPLIT_INDEX;

/// Rectangle in controller-local coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SplitRect {
    /// Left edge
    pub x: u32,
    /// Top edge
    pub y: u32,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl SplitRect {
    /// Rectangle anchored at the origin
    pub fn with_size(width: u32, height: u32) -> Self {
        Self {
            x: 0,
            y: 0,
            width,
            height,
        }
    }

    /// Area in pixels
    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    fn split_horizontal(&self, cut: u32) -> Result<(Self, Self)> {
        if cut > self.height {
            return Err(SplitError::CutOutOfRange {
                cut,
                extent: self.height,
            });
        }
        let top = Self {
            height: cut,
            ..*self
        };
        let bottom = Self {
            y: self.y + cut,
            height: self.height - cut,
            ..*self
        };
        Ok((top, bottom))
    }

    fn split_vertical(&self, cut: u32) -> Result<(Self, Self)> {
        if cut > self.width {
            return Err(SplitError::CutOutOfRange {
                cut,
                extent: self.width,
            });
        }
        let left = Self {
            width: cut,
            ..*self
        };
        let right = Self {
            x: self.x + cut,
            width: self.width - cut,
            ..*self
        };
        Ok((left, right))
    }
}

/// One region produced by a split program
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitLeaf {
    /// Region inside the controller
    pub rect: SplitRect,
    /// 1-based position in pre-order
    pub split_index: u32,
}

/// Lazy sequence of the leaves of one split program
///
/// Yields `Err` at most once; the iterator is fused afterwards.
#[derive(Debug, Clone)]
pub struct SplitLeaves<'p> {
    program: &'p [u8],
    cursor: &'p [u8],
    pending: Vec<SplitRect>,
    emitted: u32,
}

impl<'p> SplitLeaves<'p> {
    /// Interpret `program` on the rectangle `root`
    pub fn new(program: &'p [u8], root: SplitRect) -> Self {
        Self {
            program,
            cursor: program,
            pending: vec![root],
            emitted: 0,
        }
    }

    fn offset(&self) -> usize {
        self.program.len() - self.cursor.len()
    }

    fn fail(&mut self, err: SplitError) -> Option<Result<SplitLeaf>> {
        self.pending.clear();
        Some(Err(err))
    }

    fn read_cut(&mut self, offset: usize) -> Result<u32> {
        if self.cursor.remaining() < 4 {
            return Err(SplitError::Truncated { offset });
        }
        Ok(self.cursor.get_u32_ne())
    }
}

impl Iterator for SplitLeaves<'_> {
    type Item = Result<SplitLeaf>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let rect = self.pending.pop()?;
            let offset = self.offset();

            if !self.cursor.has_remaining() {
                return self.fail(SplitError::Truncated { offset });
            }

            let children = match self.cursor.get_u8() {
                NODE_LEAF => {
                    if self.emitted == MAX_SPLIT_INDEX {
                        return self.fail(SplitError::TooManyLeaves {
                            max: MAX_SPLIT_INDEX,
                        });
                    }
                    self.emitted += 1;
                    trace!("Leaf #{} at {:?}", self.emitted, rect);
                    return Some(Ok(SplitLeaf {
                        rect,
                        split_index: self.emitted,
                    }));
                }
                NODE_HORIZONTAL => self
                    .read_cut(offset)
                    .and_then(|cut| rect.split_horizontal(cut)),
                NODE_VERTICAL => self
                    .read_cut(offset)
                    .and_then(|cut| rect.split_vertical(cut)),
                byte => Err(SplitError::UnknownNode { offset, byte }),
            };

            match children {
                Ok((first, second)) => {
                    // first child is visited first, so it goes on top
                    self.pending.push(second);
                    self.pending.push(first);
                }
                Err(err) => return self.fail(err),
            }
        }
    }
}

impl std::iter::FusedIterator for SplitLeaves<'_> {}

/// Interpret a whole program, all leaves or nothing
///
/// # Errors
///
/// Returns the first [`SplitError`] encountered; leaves already produced
/// are discarded.
pub fn interpret(program: &[u8], root: SplitRect) -> Result<Vec<SplitLeaf>> {
    SplitLeaves::new(program, root).collect()
}

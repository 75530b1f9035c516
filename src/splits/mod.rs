//! Split Configuration
//!
//! Everything about *describing* how outputs are split: the binary record
//! store the engine reads, the owned [`SplitTree`] used to author programs,
//! and the text notation the command-line tooling speaks.
//!
//! # Example
//!
//! ```
//! use splitrandr::splits::{SplitConfiguration, SplitStore, SplitTree};
//!
//! let tree: SplitTree = "V 1680 N N".parse().unwrap();
//! let mut store = SplitStore::new();
//! store.upsert(SplitConfiguration::new("DP-1", "00ffffffffffff00", 3360, 1050, &tree));
//!
//! let blob = store.to_bytes().unwrap();
//! assert_eq!(SplitStore::from_bytes(&blob), store);
//! ```

pub mod notation;
pub mod store;
pub mod tree;

pub use notation::{parse_blocks, RecordBlock};
pub use store::{SplitConfiguration, SplitStore};
pub use tree::SplitTree;

use thiserror::Error;

/// Result type for split program handling
pub type Result<T> = std::result::Result<T, SplitError>;

/// Malformed split program
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SplitError {
    /// Node byte is not one of `N`, `H`, `V`
    #[error("Unknown split node 0x{byte:02x} at offset {offset}")]
    UnknownNode {
        /// Position of the node byte
        offset: usize,
        /// The offending byte
        byte: u8,
    },

    /// Program ends in the middle of a node
    #[error("Split program truncated at offset {offset}")]
    Truncated {
        /// Start of the incomplete node
        offset: usize,
    },

    /// Cut lies outside the rectangle it splits
    #[error("Cut at {cut} does not fit extent {extent}")]
    CutOutOfRange {
        /// Requested cut
        cut: u32,
        /// Width or height being cut
        extent: u32,
    },

    /// More leaves than split indices available
    #[error("Split program has more than {max} leaves")]
    TooManyLeaves {
        /// Leaf limit
        max: u32,
    },
}

/// Configuration store errors
#[derive(Error, Debug)]
pub enum StoreError {
    /// Fixed-width field cannot hold the value
    #[error("Field '{field}' is {len} bytes, at most {max} fit")]
    FieldTooLong {
        /// Field name
        field: &'static str,
        /// Encoded length of the value
        len: usize,
        /// Field capacity
        max: usize,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Text notation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NotationError {
    /// Split kind other than `H`, `V`, `N`
    #[error("Unknown split type: {0}")]
    UnknownSplit(String),

    /// Cut position is not an unsigned integer
    #[error("Invalid split position: {0}")]
    InvalidCut(String),

    /// Input ended inside a split
    #[error("Split description ends early")]
    UnexpectedEnd,

    /// Input continues after a complete tree
    #[error("Unexpected token after split description: {0}")]
    TrailingToken(String),

    /// More split nodes than leaves can be numbered
    #[error("Split description has more than {max} outputs")]
    TooManyOutputs {
        /// Leaf limit
        max: u32,
    },

    /// Word in a block is not `KEY=value`
    #[error("Expected KEY=value, found: {0}")]
    NotAnAssignment(String),

    /// Unrecognized variable
    #[error("Unknown variable: {0}")]
    UnknownKey(String),

    /// Block lacks a required variable
    #[error("Missing variable: {0}")]
    MissingKey(&'static str),

    /// Variable has an unusable value
    #[error("Invalid value for {key}: {value}")]
    InvalidValue {
        /// Variable name
        key: String,
        /// Rejected value
        value: String,
    },

    /// Quote never closed
    #[error("Unterminated quote")]
    UnterminatedQuote,

    /// Stored program could not be decoded
    #[error("Stored split program is malformed: {0}")]
    Program(#[from] SplitError),
}

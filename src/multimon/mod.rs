//! Virtual Output Synthesis
//!
//! Splits physical outputs into independent virtual outputs. Each split
//! output disappears from the output list and is replaced by one virtual
//! output per region, each driven by its own virtual controller running
//! its own virtual mode. Consumers see ordinary-looking records.
//!
//! # Pipeline
//!
//! ```text
//! DisplaySource ──► EdidMatcher ──► interpret() ──► RecordSynthesizer ──► AugmentedTopology
//!   topology,         fingerprint,     split          output, controller,     physical records
//!   EDID bytes        store lookup     leaves         mode per leaf           + synthetic ones
//! ```
//!
//! # Matching
//!
//! A physical output is split when all of the following hold:
//!
//! - it is driven by a controller
//! - it has a non-empty EDID property
//! - the store holds a record with that EDID fingerprint whose width and
//!   height equal the controller's current size
//!
//! Otherwise the output passes through untouched. This is the normal case,
//! not an error.
//!
//! # Example
//!
//! ```text
//! Physical                         Augmented
//!
//! ┌────────────────────────────┐   ┌─────────────┬──────────────┐
//! │ DP-1                       │   │ DP-1~1      │ DP-1~2       │
//! │ 3360x1050 @ (1920,0)       │ ► │ 1680x1050   │ 1680x1050    │
//! │                            │   │ @ (1920,0)  │ @ (3600,0)   │
//! └────────────────────────────┘   └─────────────┴──────────────┘
//! ```
//!
//! ```no_run
//! use splitrandr::multimon::{MultiMonitorConfig, TopologyAugmenter};
//! use splitrandr::splits::SplitStore;
//! use splitrandr::topology::{DisplaySource, SnapshotSource};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = SplitStore::load("/home/user/.config/fakexrandr.bin")?;
//! let source = SnapshotSource::load("snapshot.json")?;
//! let physical = source.topology()?;
//!
//! let augmenter = TopologyAugmenter::new(&store, MultiMonitorConfig::default());
//! let augmented = augmenter.augment(&source, &physical)?;
//! for output in augmented.outputs() {
//!     println!("{} -> {:?}", output.name, output.crtc);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Failure Handling
//!
//! - **Malformed split program:** that output is left unsplit, the rest of
//!   the pass continues
//! - **Inconsistent topology:** (unknown controller, missing active mode,
//!   synthetic id among physical records) [`TopologyAugmenter::augment`]
//!   returns the physical topology unchanged
//! - **Display source failure:** returned to the caller unchanged, no retry

mod edid;
mod layout;
mod manager;
mod synthesizer;

pub use edid::{fingerprint, EdidMatcher};
pub use layout::{interpret, SplitLeaf, SplitLeaves, SplitRect};
pub use manager::{
    AugmentedTopology, MultiMonitorConfig, OutputSummary, RecordKind, TopologyAugmenter,
};
pub use synthesizer::{RecordSynthesizer, SyntheticRecords};

use crate::topology::{IdError, SourceError};
use thiserror::Error;

/// Augmentation result type
pub type Result<T> = std::result::Result<T, MultiMonitorError>;

/// Augmentation error types
#[derive(Error, Debug)]
pub enum MultiMonitorError {
    /// Physical topology contradicts itself
    #[error("Inconsistent topology: {0}")]
    Invariant(String),

    /// Identifier could not be made synthetic
    #[error("Identifier error: {0}")]
    Id(#[from] IdError),

    /// Display source failed
    #[error("Display source error: {0}")]
    Source(#[from] SourceError),
}

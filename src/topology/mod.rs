//! Display Topology Model
//!
//! Descriptors for controllers (CRTCs), outputs and modes, the identifier
//! scheme that lets synthetic records share an id space with real ones, and
//! the [`DisplaySource`] contract through which physical topology enters
//! the engine.
//!
//! # Identifier space
//!
//! Real identifiers never use the bits in [`ids::SPLIT_MASK`]. Synthetic
//! ones carry a 1-based split index there, so "is this synthetic?" is a
//! single mask test and the real object behind any synthetic id is
//! recovered with [`ids::strip`].

pub mod ids;
pub mod source;
pub mod types;

pub use ids::{is_synthetic, make_synthetic, split_index, strip, IdError, Xid};
pub use source::{DisplaySource, SnapshotSource, SourceError};
pub use types::{
    Connection, CrtcInfo, ModeInfo, OutputInfo, PhysicalTopology, Rotation, SubpixelOrder,
};

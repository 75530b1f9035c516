//! # splitrandr
//!
//! Virtual RandR outputs for Linux: split one physical monitor into several
//! independent virtual monitors.
//!
//! A configured physical output is presented to window managers and layout
//! tools as several ordinary-looking outputs, each with its own controller
//! and mode. Nothing downstream needs to know that they are synthetic.
//!
//! # Architecture
//!
//! ```text
//! splitrandr
//!   ├─> topology   (descriptors, identifier scheme, display source contract)
//!   ├─> splits     (binary configuration store, split trees, text notation)
//!   ├─> multimon   (EDID matching, split interpretation, record synthesis,
//!   │               topology augmentation)
//!   ├─> dispatch   (passthrough policy for non-read operations)
//!   ├─> config     (TOML application configuration)
//!   └─> utils      (user-facing error formatting)
//! ```
//!
//! # Data Flow
//!
//! **Query Path:** DisplaySource → EdidMatcher → interpret → RecordSynthesizer
//! → AugmentedTopology → consumer
//!
//! **Control Path:** consumer → PassthroughGuard → DisplayControl
//!
//! **Configuration Path:** `set-config` → SplitStore → `fakexrandr.bin`

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Application configuration
pub mod config;

/// Passthrough policy for operations on synthetic records
pub mod dispatch;

/// Virtual output synthesis
pub mod multimon;

/// Split configuration store and notation
pub mod splits;

/// Display topology model
pub mod topology;

/// Utility functions
pub mod utils;

//! Utility Functions
//!
//! User-friendly error formatting for the command-line tool.
//!
//! ```rust
//! use splitrandr::utils::format_user_error;
//!
//! let error = anyhow::anyhow!("something went wrong");
//! eprintln!("{}", format_user_error(&error));
//! ```
//!
//! Error categories with context-aware help:
//! - Store errors → file permissions, field size limits
//! - Notation errors → expected block format and split syntax
//! - Topology errors → snapshot path and JSON layout
//! - Config errors → TOML syntax, known sections

pub mod errors;

pub use errors::format_user_error;

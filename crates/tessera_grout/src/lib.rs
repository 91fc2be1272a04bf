//! Grout - The shared binding material for Tessera.
//!
//! Tiles (individual CSS modules) are only a mosaic once something holds
//! them together. This crate provides the small utilities every other
//! Tessera crate leans on.
//!
//! # Modules
//!
//! - **hash**: xxHash3 based hashing for scoped names and change detection
//! - **ident**: JavaScript identifier rules (validity, reserved words, sanitizing)
//! - **convention**: naming conventions for export aliases (`camelCase`, `dashes`)
//! - **line_index**: byte offset <-> line/column conversion
//! - **source_map**: Source Map v3 encoding, decoding and offset remapping
//! - **diagnostic**: warning-grade diagnostics shared across the pipeline
//!
//! # Example
//!
//! ```
//! use tessera_grout::ident::{is_valid_identifier, sanitize_identifier};
//!
//! assert!(is_valid_identifier("button"));
//! assert!(!is_valid_identifier("btn-primary"));
//! assert_eq!(sanitize_identifier("btn-primary"), "btn_primary");
//! ```

pub mod convention;
pub mod diagnostic;
pub mod hash;
pub mod ident;
pub mod line_index;
pub mod source_map;

// Re-export rustc-hash for fast hash maps/sets
pub use rustc_hash::{FxHashMap, FxHashSet};

// Re-export indexmap for insertion-ordered maps (source declaration order matters)
pub use indexmap::{IndexMap, IndexSet};

pub use diagnostic::{Diagnostic, Severity};
pub use line_index::LineIndex;
pub use source_map::SourceMap;

//! # tessera
//!
//! Tessera - CSS Modules compiler in Rust.
//!
//! ## Name Origin
//!
//! A **tessera** is a single tile of a mosaic. Each stylesheet is built on
//! its own, then set into place next to the modules it composes from.
//!
//! This crate is the command line front end. It walks a project, builds
//! every CSS module through [`mosaic`], and writes `.js`, `.css` and
//! `.d.ts` files next to each other in an output directory.

pub use tessera_glaze as glaze;
pub use tessera_grout as grout;
pub use tessera_mosaic as mosaic;
pub use tessera_tile as tile;

pub mod batch;
pub mod config;
pub mod fs_host;
pub mod report;

//! `usd_compose` composes USD-style layers into a single flattened layer.
//!
//! # Modules
//!
//! - `sdf` - Scene description data model: paths, values, prims and layers
//! - `asset` - Asset resolution with per-prim resolution contexts
//! - `format` - File format plugins and built-in format detection
//! - `usda` - Text format (.usda) reader and writer
//! - `mtlx` - MaterialX (.mtlx) documents as prim trees
//! - `composition` - Sublayers, references, payloads, inherits and variant sets

pub mod asset;
pub mod composition;
pub mod format;
pub mod mtlx;
pub mod sdf;
pub mod usda;

//! Layer composition.
//!
//! Composition flattens a layer and everything its arcs point at into one
//! layer without any arc metadata left. Opinions are ordered by strength,
//! strongest first (LIVRPS):
//!
//! - **L**ocal: prims authored in the layer itself and its sublayer stack
//! - **I**nherits: `inherits = </_Class>`
//! - **V**ariant sets: `variants = { string look = "red" }`
//! - **R**eferences: `references = @./prop.usda@</Prop>`
//! - **P**ayload: `payload = @./heavy.usda@`
//! - **S**pecializes: reported, not resolved
//!
//! Every compositor takes a layer by reference and returns a new one, so a
//! failed call leaves its input as it was. [compose] runs them all until
//! nothing is left to resolve:
//!
//! ```no_run
//! use usd_compose::composition::{compose_file, CompositionOptions};
//!
//! let options = CompositionOptions::default().with_selection("look", "red");
//! let composition = compose_file("scene.usda", &options)?;
//! for warning in &composition.warnings {
//!     eprintln!("{warning}");
//! }
//! # Ok::<(), usd_compose::composition::CompositionError>(())
//! ```

mod arcs;
mod driver;
mod error;
mod extract;
mod inherits;
mod load;
mod merge;
mod options;
mod sublayers;
mod variants;

pub use arcs::{composite_payload, composite_references};
pub use driver::{compose, compose_file, Composition};
pub use error::{ArcKind, CompositionError};
pub use extract::{extract_variants, VariantInfo};
pub use inherits::composite_inherits;
pub use merge::{inherit_prim_spec, override_prim_spec};
pub use options::*;
pub use sublayers::composite_sublayers;
pub use variants::composite_variants;

/// Path string of the child `name` under `parent` (`""` for the root).
pub(crate) fn child_path(parent: &str, name: &str) -> String {
    if parent.is_empty() || parent == "/" {
        format!("/{name}")
    } else {
        format!("{parent}/{name}")
    }
}

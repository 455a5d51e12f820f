//! Scene description data model: paths, values, prim specs and layers.

mod layer;
mod list_edit;
mod path;
mod prim_spec;
mod property;
mod value;

pub use layer::{Layer, LayerMeta, DEFAULT_PREDICATE_DEPTH};
pub use list_edit::{LayerOffset, ListEdit, ListEditQual, Payload, Reference, SubLayer};
pub use path::{is_valid_prim_name, is_valid_property_name, path, Path};
pub use prim_spec::{PrimMeta, PrimSpec, Specifier, VariantSelectionMap, VariantSet};
pub use property::{Property, PropertyKind, Variability};
pub use value::{merge_dictionary, Dictionary, Value};

use anyhow::{bail, ensure, Result};
use std::collections::HashMap;

use crate::asset::ResolutionContext;

use super::{is_valid_prim_name, Dictionary, Path, PrimSpec, Specifier, SubLayer};

/// Layer-level metadata authored in the layer header.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayerMeta {
    pub doc: Option<String>,
    pub default_prim: Option<String>,
    pub up_axis: Option<String>,
    pub meters_per_unit: Option<f64>,
    pub start_time_code: Option<f64>,
    pub end_time_code: Option<f64>,
    pub frames_per_second: Option<f64>,
    pub time_codes_per_second: Option<f64>,
    pub sub_layers: Vec<SubLayer>,
    pub custom_layer_data: Option<Dictionary>,
    /// Metadata without a dedicated field.
    pub other: Dictionary,
}

/// A named collection of root prims plus layer metadata.
///
/// Root prim names are unique; insertion order is kept for output.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Layer {
    pub identifier: String,
    pub meta: LayerMeta,
    /// Where the layer's own `subLayers` resolve from.
    pub resolution: ResolutionContext,
    prim_specs: Vec<PrimSpec>,
    index: HashMap<String, usize>,
}

/// Default depth bound for the unresolved-arc predicates.
pub const DEFAULT_PREDICATE_DEPTH: usize = 1024 * 1024;

impl Layer {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            ..Default::default()
        }
    }

    pub fn len(&self) -> usize {
        self.prim_specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prim_specs.is_empty()
    }

    /// Root prims in insertion order.
    pub fn prim_specs(&self) -> impl Iterator<Item = &PrimSpec> {
        self.prim_specs.iter()
    }

    /// Mutable root prims in insertion order. Renaming a prim through this
    /// iterator is not supported; use [Layer::remove_prim_spec] and re-add it.
    pub fn prim_specs_mut(&mut self) -> impl Iterator<Item = &mut PrimSpec> {
        self.prim_specs.iter_mut()
    }

    pub fn prim_spec_names(&self) -> impl Iterator<Item = &str> {
        self.prim_specs.iter().map(|prim| prim.name.as_str())
    }

    pub fn has_prim_spec(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn prim_spec(&self, name: &str) -> Option<&PrimSpec> {
        self.index.get(name).map(|&index| &self.prim_specs[index])
    }

    pub fn prim_spec_mut(&mut self, name: &str) -> Option<&mut PrimSpec> {
        self.index.get(name).map(|&index| &mut self.prim_specs[index])
    }

    /// Adds a new root prim. Fails if the name is invalid or already taken.
    pub fn add_prim_spec(&mut self, prim: PrimSpec) -> Result<()> {
        ensure!(
            is_valid_prim_name(&prim.name),
            "Invalid root prim name '{}' in layer '{}'",
            prim.name,
            self.identifier
        );
        if self.has_prim_spec(&prim.name) {
            bail!(
                "Root prim '{}' is already defined in layer '{}'",
                prim.name,
                self.identifier
            );
        }
        self.insert_prim_spec(prim);
        Ok(())
    }

    /// Replaces an existing root prim. Fails if no prim has that name.
    pub fn replace_prim_spec(&mut self, prim: PrimSpec) -> Result<()> {
        ensure!(
            self.has_prim_spec(&prim.name),
            "Root prim '{}' does not exist in layer '{}'",
            prim.name,
            self.identifier
        );
        self.insert_prim_spec(prim);
        Ok(())
    }

    /// Inserts or replaces a root prim. A replaced prim keeps its position.
    pub fn insert_prim_spec(&mut self, prim: PrimSpec) -> Option<PrimSpec> {
        match self.index.get(&prim.name) {
            Some(&index) => Some(std::mem::replace(&mut self.prim_specs[index], prim)),
            None => {
                self.index.insert(prim.name.clone(), self.prim_specs.len());
                self.prim_specs.push(prim);
                None
            }
        }
    }

    pub fn remove_prim_spec(&mut self, name: &str) -> Option<PrimSpec> {
        let index = self.index.remove(name)?;
        let removed = self.prim_specs.remove(index);
        for position in self.index.values_mut() {
            if *position > index {
                *position -= 1;
            }
        }
        Some(removed)
    }

    /// Takes every root prim out of the layer, leaving it empty.
    pub fn take_prim_specs(&mut self) -> Vec<PrimSpec> {
        self.index.clear();
        std::mem::take(&mut self.prim_specs)
    }

    /// Finds the prim at an absolute prim path.
    pub fn find_prim_spec(&self, path: &Path) -> Option<&PrimSpec> {
        if !path.is_absolute() || !path.is_prim_path() || path.is_root() {
            return None;
        }
        let mut names = path.element_names();
        let root = self.prim_spec(names.next()?)?;
        root.descendant(names)
    }

    /// The prim named by `defaultPrim`, falling back to the first root prim.
    pub fn default_prim_spec(&self) -> Option<&PrimSpec> {
        self.meta
            .default_prim
            .as_deref()
            .and_then(|name| self.prim_spec(name))
            .or_else(|| self.prim_specs.first())
    }

    /// Stamps `context` onto the layer and every prim it holds.
    pub fn set_resolution(&mut self, context: ResolutionContext) {
        for prim in &mut self.prim_specs {
            prim.set_resolution_recursive(&context);
        }
        self.resolution = context;
    }

    fn any_prim(&self, max_depth: usize, predicate: impl Fn(&PrimSpec) -> bool) -> bool {
        self.prim_specs.iter().any(|prim| prim.any(max_depth, &predicate))
    }

    pub fn has_unresolved_references(&self, max_depth: usize) -> bool {
        self.any_prim(max_depth, |prim| prim.meta.references.is_some())
    }

    pub fn has_unresolved_payload(&self, max_depth: usize) -> bool {
        self.any_prim(max_depth, |prim| prim.meta.payload.is_some())
    }

    pub fn has_unresolved_inherits(&self, max_depth: usize) -> bool {
        self.any_prim(max_depth, |prim| prim.meta.inherits.is_some())
    }

    /// Variant metadata or stored variant sets still waiting for selection.
    pub fn has_unresolved_variants(&self, max_depth: usize) -> bool {
        self.any_prim(max_depth, |prim| {
            prim.meta.variants.is_some() || prim.meta.variant_sets.is_some() || !prim.variant_sets.is_empty()
        })
    }

    pub fn has_unresolved_specializes(&self, max_depth: usize) -> bool {
        self.any_prim(max_depth, |prim| prim.meta.specializes.is_some())
    }

    pub fn has_over_prim_spec(&self, max_depth: usize) -> bool {
        self.any_prim(max_depth, |prim| prim.specifier == Specifier::Over)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sdf::{path, ListEdit, Reference};

    fn sample_layer() -> Layer {
        let mut layer = Layer::new("sample.usda");
        layer
            .add_prim_spec(PrimSpec::def("World").with_child(PrimSpec::def("Geom")))
            .unwrap();
        layer.add_prim_spec(PrimSpec::class("Base")).unwrap();
        layer
    }

    #[test]
    fn keeps_insertion_order() {
        let mut layer = sample_layer();
        layer.add_prim_spec(PrimSpec::def("Apple")).unwrap();
        assert_eq!(layer.prim_spec_names().collect::<Vec<_>>(), ["World", "Base", "Apple"]);

        layer.insert_prim_spec(PrimSpec::over("Base"));
        assert_eq!(layer.prim_spec_names().collect::<Vec<_>>(), ["World", "Base", "Apple"]);
        assert_eq!(layer.prim_spec("Base").unwrap().specifier, Specifier::Over);

        layer.remove_prim_spec("World");
        assert_eq!(layer.prim_spec_names().collect::<Vec<_>>(), ["Base", "Apple"]);
        assert!(layer.prim_spec("Apple").is_some());
    }

    #[test]
    fn add_rejects_duplicates() {
        let mut layer = sample_layer();
        assert!(layer.add_prim_spec(PrimSpec::def("World")).is_err());
        assert!(layer.add_prim_spec(PrimSpec::def("")).is_err());
        assert!(layer.replace_prim_spec(PrimSpec::def("Missing")).is_err());
    }

    #[test]
    fn find_by_absolute_path() {
        let layer = sample_layer();
        assert!(layer.find_prim_spec(&path("/World/Geom").unwrap()).is_some());
        assert!(layer.find_prim_spec(&path("/World/Missing").unwrap()).is_none());
        assert!(layer.find_prim_spec(&path("World/Geom").unwrap()).is_none());
        assert!(layer.find_prim_spec(&Path::abs_root()).is_none());
    }

    #[test]
    fn default_prim_falls_back_to_first() {
        let mut layer = sample_layer();
        assert_eq!(layer.default_prim_spec().unwrap().name, "World");
        layer.meta.default_prim = Some("Base".into());
        assert_eq!(layer.default_prim_spec().unwrap().name, "Base");
    }

    #[test]
    fn unresolved_predicates_walk_children() {
        let mut layer = sample_layer();
        assert!(!layer.has_unresolved_references(DEFAULT_PREDICATE_DEPTH));

        let geom = layer
            .prim_spec_mut("World")
            .and_then(|world| world.child_mut("Geom"))
            .unwrap();
        geom.meta.references = Some(ListEdit::explicit(vec![Reference::internal(path("/Base").unwrap())]));

        assert!(layer.has_unresolved_references(DEFAULT_PREDICATE_DEPTH));
        assert!(!layer.has_unresolved_references(0));
        assert!(!layer.has_unresolved_inherits(DEFAULT_PREDICATE_DEPTH));
        assert!(!layer.has_over_prim_spec(DEFAULT_PREDICATE_DEPTH));
    }
}

use anyhow::{ensure, Result};
use std::collections::BTreeMap;

use crate::sdf::{Layer, PrimSpec, VariantSelectionMap};

use super::child_path;

/// Variant metadata authored on one prim.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VariantInfo {
    /// Names listed in `variantSets`.
    pub variant_sets: Vec<String>,
    /// Authored `variants` selections.
    pub selections: VariantSelectionMap,
    /// Variant names stored under each variant set.
    pub variants: BTreeMap<String, Vec<String>>,
}

/// Collects the variant metadata of every prim of `layer`, keyed by prim path.
///
/// Only prims with variant metadata or stored variant sets are listed.
pub fn extract_variants(layer: &Layer) -> Result<BTreeMap<String, VariantInfo>> {
    let mut found = BTreeMap::new();
    for prim in layer.prim_specs() {
        collect(prim, "", &mut found)?;
    }
    Ok(found)
}

fn collect(prim: &PrimSpec, parent: &str, found: &mut BTreeMap<String, VariantInfo>) -> Result<()> {
    ensure!(!prim.name.is_empty(), "Prim under '{}' has an empty name", if parent.is_empty() { "/" } else { parent });
    let path = child_path(parent, &prim.name);

    let info = VariantInfo {
        variant_sets: prim
            .meta
            .variant_sets
            .as_ref()
            .map(|list| list.items.clone())
            .unwrap_or_default(),
        selections: prim.meta.variants.clone().unwrap_or_default(),
        variants: prim
            .variant_sets
            .iter()
            .map(|(name, set)| (name.clone(), set.variant_names().map(str::to_owned).collect()))
            .collect(),
    };
    if info != VariantInfo::default() {
        found.insert(path.clone(), info);
    }

    for child in &prim.children {
        collect(child, &path, found)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sdf::ListEdit;

    #[test]
    fn lists_sets_selections_and_variants() {
        let mut ball = PrimSpec::def("Ball")
            .with_variant("look", PrimSpec::over("red"))
            .with_variant("look", PrimSpec::over("blue"));
        ball.meta.variant_sets = Some(ListEdit::prepend(vec!["look".to_owned()]));
        ball.meta.variants = Some(VariantSelectionMap::from([("look".to_owned(), "red".to_owned())]));

        let mut layer = Layer::new("memory.usda");
        layer
            .add_prim_spec(PrimSpec::def("World").with_child(ball).with_child(PrimSpec::def("Plain")))
            .unwrap();

        let variants = extract_variants(&layer).unwrap();
        assert_eq!(variants.keys().collect::<Vec<_>>(), ["/World/Ball"]);

        let info = &variants["/World/Ball"];
        assert_eq!(info.variant_sets, ["look"]);
        assert_eq!(info.selections["look"], "red");
        assert_eq!(info.variants["look"], ["blue", "red"]);
    }

    #[test]
    fn empty_prim_name_is_an_error() {
        let mut layer = Layer::new("memory.usda");
        layer.insert_prim_spec(PrimSpec::def("World").with_child(PrimSpec::def("")));
        assert!(extract_variants(&layer).is_err());
    }
}

//! Variant selection.
//!
//! For every prim authoring both `variantSets` and `variants`, the selected
//! variant of each set is promoted into the prim. Unselected variants are
//! dropped.

use std::collections::BTreeMap;

use crate::sdf::{Layer, ListEditQual, PrimSpec, VariantSelectionMap, VariantSet};

use super::load::Diagnostics;
use super::merge::{inherit_prim_spec, override_unchecked};
use super::{child_path, ArcKind, Composition, CompositionError, VariantOptions};

/// Applies variant selections throughout `layer`.
///
/// Selections in `options` win over the ones authored on the prims. A
/// selection naming a variant that does not exist changes nothing.
pub fn composite_variants(layer: &Layer, options: &VariantOptions) -> Result<Composition, CompositionError> {
    let mut pass = VariantPass {
        options,
        diagnostics: Diagnostics::default(),
    };

    let mut output = layer.clone();
    for prim in output.prim_specs_mut() {
        let path = child_path("", &prim.name);
        pass.visit(prim, &path, 0)?;
    }

    Ok(Composition {
        layer: output,
        warnings: pass.diagnostics.warnings,
        layers: Vec::new(),
    })
}

struct VariantPass<'a> {
    options: &'a VariantOptions,
    diagnostics: Diagnostics,
}

impl VariantPass<'_> {
    fn visit(&mut self, prim: &mut PrimSpec, path: &str, depth: usize) -> Result<(), CompositionError> {
        if depth > self.options.max_depth {
            return Err(CompositionError::TooDeep {
                arc: ArcKind::Variants,
                path: path.to_owned(),
                max_depth: self.options.max_depth,
            });
        }

        for child in &mut prim.children {
            let child_path = child_path(path, &child.name);
            self.visit(child, &child_path, depth + 1)?;
        }

        let variant_sets = prim.meta.variant_sets.take();
        let selections = prim.meta.variants.take();
        let table = std::mem::take(&mut prim.variant_sets);

        let (variant_sets, selections) = match (variant_sets, selections) {
            (Some(variant_sets), Some(selections)) => (variant_sets, selections),
            (None, None) => return Ok(()),
            (Some(_), None) => {
                self.diagnostics
                    .warn(format!("'{path}' declares variantSets without variant selections, ignoring them"));
                return Ok(());
            }
            (None, Some(_)) => {
                self.diagnostics
                    .warn(format!("'{path}' selects variants without declaring variantSets, ignoring them"));
                return Ok(());
            }
        };

        match variant_sets.qual {
            ListEditQual::ResetToExplicit | ListEditQual::Prepend | ListEditQual::Append => {}
            ListEditQual::Add | ListEditQual::Delete | ListEditQual::Order => {
                return Err(CompositionError::UnsupportedListEdit {
                    arc: ArcKind::Variants,
                    path: path.to_owned(),
                    qual: variant_sets.qual,
                })
            }
            ListEditQual::Invalid => {
                return Err(CompositionError::InvalidListEdit {
                    arc: ArcKind::Variants,
                    path: path.to_owned(),
                })
            }
        }

        let mut selected = PrimSpec::over(&prim.name);
        selected.resolution.clone_from(&prim.resolution);

        // Later sets are weaker, so they go in first.
        for set_name in variant_sets.items.iter().rev() {
            let Some(selection) = self
                .options
                .selections
                .get(set_name)
                .or_else(|| selections.get(set_name))
            else {
                continue;
            };
            let Some(variant) = table.get(set_name).and_then(|set| set.variant(selection)) else {
                log::debug!("'{path}' has no variant '{selection}' in set '{set_name}'");
                continue;
            };
            log::trace!("'{path}' selects {{{set_name}={selection}}}");
            contribute(&mut selected, variant);
        }

        inherit_prim_spec(prim, &selected);

        // Variant sets revealed by the selection still see this prim's selections.
        if prim.meta.variant_sets.is_some() {
            let mut merged: VariantSelectionMap = prim.meta.variants.take().unwrap_or_default();
            merged.extend(selections);
            prim.meta.variants = Some(merged);
        }

        Ok(())
    }
}

/// Adds the content of a selected variant to the accumulated result.
fn contribute(selected: &mut PrimSpec, variant: &PrimSpec) {
    // Arcs authored inside a variant resolve where the variant was loaded from.
    let brings_assets = (variant.meta.references.is_some() && selected.meta.references.is_none())
        || (variant.meta.payload.is_some() && selected.meta.payload.is_none());
    if brings_assets && !variant.resolution.is_empty() {
        selected.resolution.clone_from(&variant.resolution);
    }
    selected.meta.update_from(&variant.meta, false);

    for (name, property) in &variant.properties {
        selected.properties.insert(name.clone(), property.clone());
    }

    for child in &variant.children {
        match selected.child_mut(&child.name) {
            Some(existing) => override_unchecked(existing, child),
            None => selected.children.push(child.clone()),
        }
    }

    merge_tables(&mut selected.variant_sets, &variant.variant_sets);
}

fn merge_tables(dst: &mut BTreeMap<String, VariantSet>, src: &BTreeMap<String, VariantSet>) {
    for (set_name, variant_set) in src {
        let dst_set = dst.entry(set_name.clone()).or_default();
        for (name, variant) in &variant_set.variants {
            dst_set.variants.entry(name.clone()).or_insert_with(|| variant.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sdf::{ListEdit, PrimMeta, Value};

    fn with_look(prim: PrimSpec, selection: &str) -> PrimSpec {
        let mut prim = prim
            .with_variant("look", PrimSpec::over("red").with_attribute("color", "red"))
            .with_variant("look", PrimSpec::over("blue").with_attribute("color", "blue"));
        prim.meta.variant_sets = Some(ListEdit::prepend(vec!["look".to_owned()]));
        prim.meta.variants = Some(VariantSelectionMap::from([("look".to_owned(), selection.to_owned())]));
        prim
    }

    fn layer_with(prim: PrimSpec) -> Layer {
        let mut layer = Layer::new("memory.usda");
        layer.add_prim_spec(prim).unwrap();
        layer
    }

    fn assert_no_variant_metadata(prim: &PrimSpec) {
        assert!(prim.meta.variant_sets.is_none());
        assert!(prim.meta.variants.is_none());
        assert!(prim.variant_sets.is_empty());
    }

    #[test]
    fn promotes_selected_variant() {
        let layer = layer_with(with_look(PrimSpec::def("Ball"), "red"));
        let composed = composite_variants(&layer, &VariantOptions::default()).unwrap().layer;

        let ball = composed.prim_spec("Ball").unwrap();
        assert_eq!(ball.attribute_value("color"), Some(&Value::String("red".into())));
        assert_no_variant_metadata(ball);
        assert!(!composed.has_unresolved_variants(crate::sdf::DEFAULT_PREDICATE_DEPTH));
    }

    #[test]
    fn option_selection_wins() {
        let layer = layer_with(with_look(PrimSpec::def("Ball"), "red"));
        let mut options = VariantOptions::default();
        options.selections.insert("look".into(), "blue".into());

        let composed = composite_variants(&layer, &options).unwrap().layer;
        let ball = composed.prim_spec("Ball").unwrap();
        assert_eq!(ball.attribute_value("color"), Some(&Value::String("blue".into())));
    }

    #[test]
    fn missing_variant_keeps_local_properties() {
        let layer = layer_with(with_look(PrimSpec::def("Ball").with_attribute("size", 2), "green"));
        let composition = composite_variants(&layer, &VariantOptions::default()).unwrap();

        let ball = composition.layer.prim_spec("Ball").unwrap();
        assert_eq!(ball.attribute_value("size"), Some(&Value::Int(2)));
        assert!(ball.attribute_value("color").is_none());
        assert_no_variant_metadata(ball);
        assert!(composition.warnings.is_empty());
    }

    #[test]
    fn local_opinions_win_over_variant() {
        let layer = layer_with(with_look(PrimSpec::def("Ball").with_attribute("color", "white"), "red"));
        let composed = composite_variants(&layer, &VariantOptions::default()).unwrap().layer;
        let ball = composed.prim_spec("Ball").unwrap();
        assert_eq!(ball.attribute_value("color"), Some(&Value::String("white".into())));
    }

    #[test]
    fn earlier_sets_are_stronger() {
        let mut prim = PrimSpec::def("Ball")
            .with_variant("look", PrimSpec::over("red").with_attribute("color", "red"))
            .with_variant("lod", PrimSpec::over("high").with_attribute("color", "grey").with_attribute("detail", 3));
        prim.meta.variant_sets = Some(ListEdit::explicit(vec!["look".to_owned(), "lod".to_owned()]));
        prim.meta.variants = Some(VariantSelectionMap::from([
            ("look".to_owned(), "red".to_owned()),
            ("lod".to_owned(), "high".to_owned()),
        ]));

        let composed = composite_variants(&layer_with(prim), &VariantOptions::default())
            .unwrap()
            .layer;
        let ball = composed.prim_spec("Ball").unwrap();
        assert_eq!(ball.attribute_value("color"), Some(&Value::String("red".into())));
        assert_eq!(ball.attribute_value("detail"), Some(&Value::Int(3)));
    }

    #[test]
    fn half_authored_variants_warn() {
        let mut prim = PrimSpec::def("Ball").with_variant("look", PrimSpec::over("red").with_attribute("color", "red"));
        prim.meta.variants = Some(VariantSelectionMap::from([("look".to_owned(), "red".to_owned())]));

        let composition = composite_variants(&layer_with(prim), &VariantOptions::default()).unwrap();
        let ball = composition.layer.prim_spec("Ball").unwrap();
        assert!(ball.attribute_value("color").is_none());
        assert_no_variant_metadata(ball);
        assert_eq!(composition.warnings.len(), 1);
    }

    #[test]
    fn variant_children_merge_into_prim() {
        let variant = PrimSpec::over("red").with_child(PrimSpec::over("Shell").with_attribute("opacity", 0.5));
        let mut prim = PrimSpec::def("Ball")
            .with_child(PrimSpec::def("Shell").with_attribute("radius", 1))
            .with_variant("look", variant);
        prim.meta.variant_sets = Some(ListEdit::explicit(vec!["look".to_owned()]));
        prim.meta.variants = Some(VariantSelectionMap::from([("look".to_owned(), "red".to_owned())]));

        let composed = composite_variants(&layer_with(prim), &VariantOptions::default())
            .unwrap()
            .layer;
        let shell = composed.prim_spec("Ball").unwrap().child("Shell").unwrap();
        assert_eq!(shell.attribute_value("radius"), Some(&Value::Int(1)));
        assert_eq!(shell.attribute_value("opacity"), Some(&Value::Double(0.5)));
    }

    #[test]
    fn nested_variant_sets_keep_outer_selection() {
        let inner = PrimSpec::over("high").with_attribute("detail", 3);
        let outer = PrimSpec::over("red")
            .with_meta(PrimMeta {
                variant_sets: Some(ListEdit::explicit(vec!["lod".to_owned()])),
                ..Default::default()
            })
            .with_variant("lod", inner);
        let mut prim = PrimSpec::def("Ball").with_variant("look", outer);
        prim.meta.variant_sets = Some(ListEdit::explicit(vec!["look".to_owned()]));
        prim.meta.variants = Some(VariantSelectionMap::from([
            ("look".to_owned(), "red".to_owned()),
            ("lod".to_owned(), "high".to_owned()),
        ]));

        let first = composite_variants(&layer_with(prim), &VariantOptions::default())
            .unwrap()
            .layer;
        let ball = first.prim_spec("Ball").unwrap();
        assert_eq!(ball.meta.variants.as_ref().unwrap()["lod"], "high");
        assert!(first.has_unresolved_variants(crate::sdf::DEFAULT_PREDICATE_DEPTH));

        let second = composite_variants(&first, &VariantOptions::default()).unwrap().layer;
        let ball = second.prim_spec("Ball").unwrap();
        assert_eq!(ball.attribute_value("detail"), Some(&Value::Int(3)));
        assert_no_variant_metadata(ball);
    }
}

use std::path::Path;

use crate::asset::{AssetResolver, ResolutionContext};
use crate::format::load_layer_from_asset;
use crate::sdf::{Layer, PrimSpec, DEFAULT_PREDICATE_DEPTH};

use super::load::Diagnostics;
use super::{
    child_path, composite_inherits, composite_payload, composite_references, composite_sublayers, composite_variants,
    ArcKind, CompositionError, CompositionOptions,
};

/// Result of a successful composition call.
#[derive(Debug, Clone, PartialEq)]
pub struct Composition {
    pub layer: Layer,
    /// Non-fatal problems, in the order they were found.
    pub warnings: Vec<String>,
    /// Identifiers of the layers that were loaded along the way.
    pub layers: Vec<String>,
}

/// Composes `layer` into a single flattened layer.
///
/// Sublayers are flattened once. References, payloads, inherits and
/// variants are then resolved in that order, again and again, until none
/// of them is left or `options.max_iterations` runs out. `specializes`
/// arcs are reported and left in place.
pub fn compose(
    resolver: &AssetResolver,
    layer: &Layer,
    options: &CompositionOptions,
) -> Result<Composition, CompositionError> {
    let mut diagnostics = Diagnostics::default();

    let Composition { layer, warnings, layers } = composite_sublayers(resolver, layer, &options.sublayers)?;
    diagnostics.absorb(warnings, layers);
    let mut layer = layer;

    let mut iterations = 0;
    loop {
        let pending = pending_arcs(&layer, options);
        if pending.is_empty() {
            break;
        }
        if iterations == options.max_iterations {
            return Err(CompositionError::NotConverged {
                iterations,
                remaining: pending,
            });
        }
        iterations += 1;
        log::debug!("Composition iteration {iterations}: {pending:?}");

        for arc in pending {
            let step = match arc {
                ArcKind::References => composite_references(resolver, &layer, &options.references)?,
                ArcKind::Payload => composite_payload(resolver, &layer, &options.payload)?,
                ArcKind::Inherits => composite_inherits(&layer, &options.inherits)?,
                ArcKind::Variants => composite_variants(&layer, &options.variants)?,
                ArcKind::Sublayers | ArcKind::Specializes => continue,
            };
            diagnostics.absorb(step.warnings, step.layers);
            layer = step.layer;
        }
    }

    report_leftovers(&layer, options, &mut diagnostics);
    log::debug!(
        "Composed '{}' in {iterations} iterations from {} layers",
        layer.identifier,
        diagnostics.layers.len()
    );

    Ok(Composition {
        layer,
        warnings: diagnostics.warnings,
        layers: diagnostics.layers,
    })
}

/// Arc kinds the driver still has to resolve, in resolution order.
fn pending_arcs(layer: &Layer, options: &CompositionOptions) -> Vec<ArcKind> {
    let mut pending = Vec::new();
    if layer.has_unresolved_references(options.references.max_depth) {
        pending.push(ArcKind::References);
    }
    if options.load_payloads && layer.has_unresolved_payload(options.payload.max_depth) {
        pending.push(ArcKind::Payload);
    }
    if layer.has_unresolved_inherits(options.inherits.max_depth) {
        pending.push(ArcKind::Inherits);
    }
    if layer.has_unresolved_variants(options.variants.max_depth) {
        pending.push(ArcKind::Variants);
    }
    pending
}

fn report_leftovers(layer: &Layer, options: &CompositionOptions, diagnostics: &mut Diagnostics) {
    if layer.has_unresolved_specializes(DEFAULT_PREDICATE_DEPTH) {
        for prim in layer.prim_specs() {
            let root = child_path("", &prim.name);
            let mut found = Vec::new();
            visit_paths(prim, &root, &mut |path, prim| {
                if prim.meta.specializes.is_some() {
                    found.push(path.to_owned());
                }
            });
            for path in found {
                diagnostics.warn(format!("specializes arc of '{path}' is not supported, leaving it unresolved"));
            }
        }
    }

    if !options.load_payloads && layer.has_unresolved_payload(DEFAULT_PREDICATE_DEPTH) {
        diagnostics.warn(format!("Payloads of '{}' were not loaded", layer.identifier));
    }
}

fn visit_paths(prim: &PrimSpec, path: &str, visit: &mut impl FnMut(&str, &PrimSpec)) {
    visit(path, prim);
    for child in &prim.children {
        visit_paths(child, &child_path(path, &child.name), visit);
    }
}

/// Reads the layer file at `path` and composes it, resolving assets
/// relative to the file's directory and then `options.search_paths`.
pub fn compose_file(path: impl AsRef<Path>, options: &CompositionOptions) -> Result<Composition, CompositionError> {
    let path = path.as_ref();
    let asset_path = path.display().to_string();
    let resolved = path
        .canonicalize()
        .map_err(|err| CompositionError::load(&asset_path, err.into()))?;

    let mut context = ResolutionContext::default().with_search_paths(options.search_paths.clone());
    if let Some(dir) = resolved.parent() {
        context.working_path = Some(dir.to_path_buf());
    }
    let resolver = AssetResolver::with_context(context);

    let asset = resolver
        .open_asset(&resolved, &asset_path)
        .map_err(|err| CompositionError::load(&asset_path, err))?;
    let mut layer = load_layer_from_asset(&asset, &options.sublayers.file_formats)
        .map_err(|err| CompositionError::load(&asset_path, err))?
        .ok_or_else(|| CompositionError::UnsupportedFormat {
            arc: ArcKind::Sublayers,
            path: "/".to_owned(),
            asset_path: asset_path.clone(),
        })?;
    layer.set_resolution(resolver.context().clone());

    let mut composition = compose(&resolver, &layer, options)?;
    if !composition.layers.contains(&layer.identifier) {
        composition.layers.insert(0, layer.identifier);
    }
    Ok(composition)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sdf::{path, ListEdit, Payload, PrimMeta, Reference, Value};
    use std::fs;

    fn layer_with(prims: Vec<PrimSpec>) -> Layer {
        let mut layer = Layer::new("memory.usda");
        for prim in prims {
            layer.add_prim_spec(prim).unwrap();
        }
        layer
    }

    #[test]
    fn resolves_arcs_revealed_by_other_arcs() {
        // The reference brings in an inherits arc, which brings in variants.
        let mut look = PrimSpec::class("_Look").with_variant("look", PrimSpec::over("red").with_attribute("color", "red"));
        look.meta.variant_sets = Some(ListEdit::explicit(vec!["look".to_owned()]));
        look.meta.variants = Some([("look".to_owned(), "red".to_owned())].into());

        let source = PrimSpec::def("Source").with_meta(PrimMeta {
            inherits: Some(ListEdit::explicit(vec![path("/_Look").unwrap()])),
            ..Default::default()
        });
        let world = PrimSpec::def("World").with_meta(PrimMeta {
            references: Some(ListEdit::explicit(vec![Reference::internal(path("/Source").unwrap())])),
            ..Default::default()
        });

        let layer = layer_with(vec![look, source, world]);
        let composition = compose(&AssetResolver::new(), &layer, &CompositionOptions::default()).unwrap();

        let world = composition.layer.prim_spec("World").unwrap();
        assert_eq!(world.attribute_value("color"), Some(&Value::String("red".into())));
        assert!(!world.meta.has_arcs());
        assert!(composition.warnings.is_empty());
    }

    #[test]
    fn cyclic_internal_references_do_not_converge() {
        let a = PrimSpec::def("A").with_meta(PrimMeta {
            references: Some(ListEdit::explicit(vec![Reference::internal(path("/B").unwrap())])),
            ..Default::default()
        });
        let b = PrimSpec::def("B").with_meta(PrimMeta {
            references: Some(ListEdit::explicit(vec![Reference::internal(path("/A").unwrap())])),
            ..Default::default()
        });
        let options = CompositionOptions {
            max_iterations: 4,
            ..Default::default()
        };

        let err = compose(&AssetResolver::new(), &layer_with(vec![a, b]), &options).unwrap_err();
        match err {
            CompositionError::NotConverged { iterations, remaining } => {
                assert_eq!(iterations, 4);
                assert_eq!(remaining, [ArcKind::References]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn specializes_and_unloaded_payloads_warn() {
        let mut prim = PrimSpec::def("World").with_child(PrimSpec::def("Special").with_meta(PrimMeta {
            specializes: Some(ListEdit::explicit(vec![path("/Base").unwrap()])),
            ..Default::default()
        }));
        prim.meta.payload = Some(ListEdit::explicit(vec![Payload::new("heavy.usda", path("/Heavy").unwrap())]));

        let options = CompositionOptions {
            load_payloads: false,
            ..Default::default()
        };
        let composition = compose(&AssetResolver::new(), &layer_with(vec![prim]), &options).unwrap();
        assert_eq!(composition.warnings.len(), 2);
        assert!(composition.warnings[0].contains("/World/Special"));

        let world = composition.layer.prim_spec("World").unwrap();
        assert!(world.meta.payload.is_some());
        assert!(world.child("Special").unwrap().meta.specializes.is_some());
    }

    #[test]
    fn flattened_layer_is_unchanged() {
        let layer = layer_with(vec![PrimSpec::def("World")
            .with_attribute("x", 1)
            .with_child(PrimSpec::def("Geom"))]);
        let composition = compose(&AssetResolver::new(), &layer, &CompositionOptions::default()).unwrap();
        assert_eq!(composition.layer, layer);
    }

    #[test]
    fn compose_file_resolves_from_file_directory() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("prop.usda"), "#usda 1.0\ndef Xform \"Prop\" { int x = 7 }\n").unwrap();
        fs::write(
            dir.path().join("scene.usda"),
            "#usda 1.0\ndef \"World\" (\n    references = @./prop.usda@\n)\n{\n}\n",
        )
        .unwrap();

        let composition = compose_file(dir.path().join("scene.usda"), &CompositionOptions::default()).unwrap();
        let world = composition.layer.prim_spec("World").unwrap();
        assert_eq!(world.type_name, "Xform");
        assert_eq!(world.attribute_value("x"), Some(&Value::Int(7)));
        assert_eq!(composition.layers.len(), 2);
        assert!(composition.layers[0].ends_with("scene.usda"));
    }
}

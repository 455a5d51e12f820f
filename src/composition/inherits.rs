use crate::sdf::{Layer, ListEditQual, PrimSpec};

use super::merge::inherit_prim_spec;
use super::{child_path, ArcKind, Composition, CompositionError, InheritsOptions};

/// Resolves every `inherits` arc of `layer` against the prims of `layer`.
///
/// A prim inherits at most one prim. The inherited prim becomes the base of
/// the inheriting one, which keeps all of its own opinions.
pub fn composite_inherits(layer: &Layer, options: &InheritsOptions) -> Result<Composition, CompositionError> {
    let mut output = layer.clone();
    for prim in output.prim_specs_mut() {
        let path = child_path("", &prim.name);
        visit(layer, prim, &path, 0, options.max_depth)?;
    }

    Ok(Composition {
        layer: output,
        warnings: Vec::new(),
        layers: Vec::new(),
    })
}

fn visit(source: &Layer, prim: &mut PrimSpec, path: &str, depth: usize, max_depth: usize) -> Result<(), CompositionError> {
    if depth > max_depth {
        return Err(CompositionError::TooDeep {
            arc: ArcKind::Inherits,
            path: path.to_owned(),
            max_depth,
        });
    }

    for child in &mut prim.children {
        let child_path = child_path(path, &child.name);
        visit(source, child, &child_path, depth + 1, max_depth)?;
    }

    let Some(inherits) = prim.meta.inherits.take() else {
        return Ok(());
    };

    match inherits.qual {
        ListEditQual::ResetToExplicit | ListEditQual::Prepend | ListEditQual::Append => {}
        ListEditQual::Add | ListEditQual::Delete | ListEditQual::Order => {
            return Err(CompositionError::UnsupportedListEdit {
                arc: ArcKind::Inherits,
                path: path.to_owned(),
                qual: inherits.qual,
            })
        }
        ListEditQual::Invalid => {
            return Err(CompositionError::InvalidListEdit {
                arc: ArcKind::Inherits,
                path: path.to_owned(),
            })
        }
    }

    let target = match inherits.items.as_slice() {
        [] => return Ok(()),
        [target] => target,
        items => {
            return Err(CompositionError::MultipleInherits {
                path: path.to_owned(),
                count: items.len(),
            })
        }
    };

    let Some(base) = source.find_prim_spec(target) else {
        return Err(CompositionError::InheritTargetNotFound {
            path: path.to_owned(),
            target: target.to_string(),
        });
    };

    log::trace!("'{path}' inherits '{target}'");
    inherit_prim_spec(prim, base);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sdf::{path, ListEdit, Path, PrimMeta, Specifier, Value};

    fn inheriting(name: &str, targets: Vec<Path>) -> PrimSpec {
        PrimSpec::def(name).with_meta(PrimMeta {
            inherits: Some(ListEdit::explicit(targets)),
            ..Default::default()
        })
    }

    fn layer_with(prims: Vec<PrimSpec>) -> Layer {
        let mut layer = Layer::new("memory.usda");
        for prim in prims {
            layer.add_prim_spec(prim).unwrap();
        }
        layer
    }

    #[test]
    fn inherits_class_content() {
        let class = PrimSpec::class("_Chair")
            .with_type("Xform")
            .with_attribute("legs", 4)
            .with_child(PrimSpec::def("Seat"));
        let chair = inheriting("Chair", vec![path("/_Chair").unwrap()]).with_attribute("color", "red");
        let layer = layer_with(vec![class, chair]);

        let composed = composite_inherits(&layer, &InheritsOptions::default()).unwrap().layer;
        let chair = composed.prim_spec("Chair").unwrap();
        assert_eq!(chair.specifier, Specifier::Def);
        assert_eq!(chair.type_name, "");
        assert_eq!(chair.attribute_value("legs"), Some(&Value::Int(4)));
        assert_eq!(chair.attribute_value("color"), Some(&Value::String("red".into())));
        assert!(chair.child("Seat").is_some());
        assert!(chair.meta.inherits.is_none());
        assert!(composed.prim_spec("_Chair").is_some());
    }

    #[test]
    fn local_opinions_win() {
        let layer = layer_with(vec![
            PrimSpec::class("Base").with_attribute("a", 9).with_attribute("b", 9),
            inheriting("Thing", vec![path("/Base").unwrap()]).with_attribute("a", 1),
        ]);
        let composed = composite_inherits(&layer, &InheritsOptions::default()).unwrap().layer;
        let thing = composed.prim_spec("Thing").unwrap();
        assert_eq!(thing.attribute_value("a"), Some(&Value::Int(1)));
        assert_eq!(thing.attribute_value("b"), Some(&Value::Int(9)));
    }

    #[test]
    fn multiple_targets_fail() {
        let layer = layer_with(vec![
            PrimSpec::class("A"),
            PrimSpec::class("B"),
            inheriting("C", vec![path("/A").unwrap(), path("/B").unwrap()]),
        ]);
        let err = composite_inherits(&layer, &InheritsOptions::default()).unwrap_err();
        assert!(matches!(err, CompositionError::MultipleInherits { count: 2, .. }));
    }

    #[test]
    fn empty_list_only_clears() {
        let layer = layer_with(vec![inheriting("C", vec![]).with_attribute("x", 1)]);
        let composed = composite_inherits(&layer, &InheritsOptions::default()).unwrap().layer;
        let prim = composed.prim_spec("C").unwrap();
        assert!(prim.meta.inherits.is_none());
        assert_eq!(prim.attribute_value("x"), Some(&Value::Int(1)));
    }

    #[test]
    fn missing_target_fails() {
        let layer = layer_with(vec![inheriting("C", vec![path("/Missing").unwrap()])]);
        let err = composite_inherits(&layer, &InheritsOptions::default()).unwrap_err();
        assert_eq!(err.to_string(), "Inherit target '/Missing' of '/C' not found");
    }

    #[test]
    fn nested_prims_inherit() {
        let layer = layer_with(vec![
            PrimSpec::class("Base").with_attribute("from_base", true),
            PrimSpec::def("World").with_child(inheriting("Leaf", vec![path("/Base").unwrap()])),
        ]);
        let composed = composite_inherits(&layer, &InheritsOptions::default()).unwrap().layer;
        let leaf = composed.find_prim_spec(&path("/World/Leaf").unwrap()).unwrap();
        assert_eq!(leaf.attribute_value("from_base"), Some(&Value::Bool(true)));
    }

    #[test]
    fn composed_layer_is_a_fixed_point() {
        let layer = layer_with(vec![PrimSpec::def("World").with_child(PrimSpec::def("Geom"))]);
        let composed = composite_inherits(&layer, &InheritsOptions::default()).unwrap().layer;
        assert_eq!(composed, layer);
    }
}

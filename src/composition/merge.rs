//! The two tree merge primitives every compositor is built on.

use crate::sdf::{PrimSpec, Specifier};

use super::CompositionError;

/// Splices the sparse override `src` onto `dst`.
///
/// Metadata and properties authored on `src` win, children are matched by
/// name and merged recursively, and children only `src` has are appended.
/// Fails if `src` is not an `over`.
pub fn override_prim_spec(dst: &mut PrimSpec, src: &PrimSpec) -> Result<(), CompositionError> {
    if src.specifier != Specifier::Over {
        return Err(CompositionError::NotAnOver {
            name: src.name.clone(),
            specifier: src.specifier,
        });
    }
    override_unchecked(dst, src);
    Ok(())
}

/// [override_prim_spec] without the specifier check, also used for nested
/// children, which may be defs.
///
/// A non-`over` specifier and a non-empty type on `src` replace those of `dst`.
pub(crate) fn override_unchecked(dst: &mut PrimSpec, src: &PrimSpec) {
    if src.specifier != Specifier::Over {
        dst.specifier = src.specifier;
    }
    if !src.type_name.is_empty() {
        dst.type_name.clone_from(&src.type_name);
    }
    dst.meta.update_from(&src.meta, true);

    for (name, property) in &src.properties {
        dst.properties.insert(name.clone(), property.clone());
    }

    for child in &src.children {
        match dst.child_mut(&child.name) {
            Some(existing) => override_unchecked(existing, child),
            None => dst.children.push(child.clone()),
        }
    }

    for (set_name, variant_set) in &src.variant_sets {
        let dst_set = dst.variant_sets.entry(set_name.clone()).or_default();
        for (variant_name, variant) in &variant_set.variants {
            match dst_set.variants.get_mut(variant_name) {
                Some(existing) => override_unchecked(existing, variant),
                None => {
                    dst_set.variants.insert(variant_name.clone(), variant.clone());
                }
            }
        }
    }
}

/// Rebuilds `dst` on top of `src`: the content of `src` becomes the base and
/// every opinion already authored on `dst` is re-applied over it.
///
/// Name, type and specifier always stay those of `dst`.
pub fn inherit_prim_spec(dst: &mut PrimSpec, src: &PrimSpec) {
    let mut base = src.clone();
    base.name.clone_from(&dst.name);
    base.type_name.clone_from(&dst.type_name);
    base.specifier = dst.specifier;

    // Arcs that arrive with `src` resolve where `src` was loaded from. Arcs
    // still pending on `dst` fall back to its own context.
    let src_brings_assets = src.meta.references.is_some() || src.meta.payload.is_some();
    let dst_has_assets = dst.meta.references.is_some() || dst.meta.payload.is_some();
    if !src_brings_assets || src.resolution.is_empty() {
        base.resolution.clone_from(&dst.resolution);
    } else if dst_has_assets {
        base.resolution = src.resolution.combined_with(&dst.resolution);
    }

    let local = std::mem::take(dst);
    base.meta.update_from(&local.meta, true);

    for (name, property) in local.properties {
        base.properties.insert(name, property);
    }

    for child in local.children {
        match base.child_mut(&child.name) {
            Some(existing) => override_unchecked(existing, &child),
            None => base.children.push(child),
        }
    }

    for (set_name, variant_set) in local.variant_sets {
        let base_set = base.variant_sets.entry(set_name).or_default();
        for (variant_name, variant) in variant_set.variants {
            match base_set.variants.get_mut(&variant_name) {
                Some(existing) => override_unchecked(existing, &variant),
                None => {
                    base_set.variants.insert(variant_name, variant);
                }
            }
        }
    }

    *dst = base;
}

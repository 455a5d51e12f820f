//! `references` and `payload` arcs.
//!
//! Both pull a prim from another layer (or, with an empty asset path, from
//! the layer being composed) underneath the prim that authors the arc.

use crate::asset::{self, AssetResolver};
use crate::sdf::{self, Layer, ListEdit, ListEditQual, Payload, PrimMeta, PrimSpec, Reference, Specifier};

use super::load::{ArcLoader, Diagnostics};
use super::merge::{inherit_prim_spec, override_unchecked};
use super::{child_path, ArcKind, Composition, CompositionError, PayloadOptions, ReferencesOptions};

/// An arc whose entries address a prim in some asset.
trait AssetArc {
    type Item;

    const KIND: ArcKind;

    fn take(meta: &mut PrimMeta) -> Option<ListEdit<Self::Item>>;

    /// Asset path and prim path of one entry.
    fn target(item: &Self::Item) -> (&str, &sdf::Path);
}

struct ReferenceArc;

impl AssetArc for ReferenceArc {
    type Item = Reference;

    const KIND: ArcKind = ArcKind::References;

    fn take(meta: &mut PrimMeta) -> Option<ListEdit<Reference>> {
        meta.references.take()
    }

    fn target(item: &Reference) -> (&str, &sdf::Path) {
        (&item.asset_path, &item.prim_path)
    }
}

struct PayloadArc;

impl AssetArc for PayloadArc {
    type Item = Payload;

    const KIND: ArcKind = ArcKind::Payload;

    fn take(meta: &mut PrimMeta) -> Option<ListEdit<Payload>> {
        meta.payload.take()
    }

    fn target(item: &Payload) -> (&str, &sdf::Path) {
        (&item.asset_path, &item.prim_path)
    }
}

/// Resolves every `references` arc of `layer`.
///
/// Entries are strongest first. With `prepend` or no qualifier each target
/// becomes a base underneath the prim's own opinions; with `append` the
/// target is spliced over them.
pub fn composite_references(
    resolver: &AssetResolver,
    layer: &Layer,
    options: &ReferencesOptions,
) -> Result<Composition, CompositionError> {
    composite_arc::<ReferenceArc>(resolver, layer, options)
}

/// Resolves every `payload` arc of `layer`, exactly like references.
pub fn composite_payload(
    resolver: &AssetResolver,
    layer: &Layer,
    options: &PayloadOptions,
) -> Result<Composition, CompositionError> {
    composite_arc::<PayloadArc>(resolver, layer, options)
}

fn composite_arc<A: AssetArc>(
    resolver: &AssetResolver,
    layer: &Layer,
    options: &ReferencesOptions,
) -> Result<Composition, CompositionError> {
    let mut pass = ArcPass {
        loader: ArcLoader {
            resolver,
            arc: A::KIND,
            error_when_asset_not_found: options.error_when_asset_not_found,
            error_when_unsupported_format: options.error_when_unsupported_format,
            file_formats: &options.file_formats,
        },
        source: layer,
        max_depth: options.max_depth,
        diagnostics: Diagnostics::default(),
    };

    let mut output = layer.clone();
    for prim in output.prim_specs_mut() {
        let path = child_path("", &prim.name);
        pass.visit::<A>(prim, &path, 0)?;
    }

    Ok(Composition {
        layer: output,
        warnings: pass.diagnostics.warnings,
        layers: pass.diagnostics.layers,
    })
}

struct ArcPass<'a> {
    loader: ArcLoader<'a>,
    /// Input snapshot that internal arcs resolve against.
    source: &'a Layer,
    max_depth: usize,
    diagnostics: Diagnostics,
}

impl ArcPass<'_> {
    fn visit<A: AssetArc>(&mut self, prim: &mut PrimSpec, path: &str, depth: usize) -> Result<(), CompositionError> {
        if depth > self.max_depth {
            return Err(CompositionError::TooDeep {
                arc: A::KIND,
                path: path.to_owned(),
                max_depth: self.max_depth,
            });
        }

        for child in &mut prim.children {
            let child_path = child_path(path, &child.name);
            self.visit::<A>(child, &child_path, depth + 1)?;
        }

        let Some(list) = A::take(&mut prim.meta) else {
            return Ok(());
        };

        let as_base = match list.qual {
            ListEditQual::ResetToExplicit | ListEditQual::Prepend => true,
            ListEditQual::Append => false,
            ListEditQual::Add | ListEditQual::Delete | ListEditQual::Order => {
                return Err(CompositionError::UnsupportedListEdit {
                    arc: A::KIND,
                    path: path.to_owned(),
                    qual: list.qual,
                })
            }
            ListEditQual::Invalid => {
                return Err(CompositionError::InvalidListEdit {
                    arc: A::KIND,
                    path: path.to_owned(),
                })
            }
        };

        for item in &list.items {
            let (asset_path, prim_path) = A::target(item);
            let Some(target) = self.resolve_target(A::KIND, prim, path, asset_path, prim_path)? else {
                continue;
            };

            let adopt_type = (prim.type_name.is_empty() || prim.type_name == "Model")
                && !target.type_name.is_empty()
                && target.type_name != "Model";
            let type_name = target.type_name.clone();
            if as_base {
                inherit_prim_spec(prim, &target);
            } else {
                let mut over = target;
                over.specifier = Specifier::Over;
                over.type_name.clear();
                override_unchecked(prim, &over);
            }
            if adopt_type {
                prim.type_name = type_name;
            }
        }

        Ok(())
    }

    /// `Ok(None)` means the entry was skipped with a warning.
    fn resolve_target(
        &mut self,
        arc: ArcKind,
        prim: &PrimSpec,
        path: &str,
        asset_path: &str,
        prim_path: &sdf::Path,
    ) -> Result<Option<PrimSpec>, CompositionError> {
        if asset_path.is_empty() {
            if prim_path.is_empty() || !prim_path.is_absolute() {
                return Err(CompositionError::InvalidInternalArc {
                    arc,
                    path: path.to_owned(),
                    target: prim_path.to_string(),
                });
            }
            return match self.source.find_prim_spec(prim_path) {
                Some(target) => Ok(Some(target.clone())),
                None => {
                    let error = CompositionError::TargetNotFound {
                        arc,
                        path: path.to_owned(),
                        asset_path: self.source.identifier.clone(),
                        target: prim_path.to_string(),
                    };
                    self.loader
                        .fail_or_warn(self.loader.error_when_asset_not_found, error, &mut self.diagnostics)?;
                    Ok(None)
                }
            };
        }

        let context = prim.resolution.or(self.loader.resolver.context()).clone();
        let Some(layer) = self.loader.load(path, asset_path, &context, &mut self.diagnostics)? else {
            return Ok(None);
        };

        if layer.is_empty() {
            return Err(CompositionError::NoPrims {
                arc,
                path: path.to_owned(),
                asset_path: asset_path.to_owned(),
            });
        }

        let is_material_x = asset::extension(asset_path).as_deref() == Some("mtlx");
        let target = if is_material_x && prim_path.to_string() != format!("/{}", crate::mtlx::ROOT_PRIM_NAME) {
            None
        } else if prim_path.is_empty() {
            layer.default_prim_spec()
        } else {
            layer.find_prim_spec(prim_path)
        };

        match target {
            Some(target) => Ok(Some(target.clone())),
            None => Err(CompositionError::TargetNotFound {
                arc,
                path: path.to_owned(),
                asset_path: asset_path.to_owned(),
                target: prim_path.to_string(),
            }),
        }
    }
}

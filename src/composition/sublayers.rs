//! Sublayer stacks.
//!
//! `subLayers = [@a.usda@, @b.usda@]` lists layers strongest first: `a`
//! wins over `b`, and the layer that declares them wins over both. Each
//! sublayer is flattened with its own sublayers before it is folded in.

use crate::asset::AssetResolver;
use crate::sdf::{Layer, Specifier};

use super::load::{ArcLoader, Diagnostics};
use super::merge::override_unchecked;
use super::{ArcKind, Composition, CompositionError, SublayersOptions};

/// Flattens the sublayer stack of `layer` into a single layer.
///
/// The result keeps the metadata of `layer` with `subLayers` cleared. Root
/// prims of `layer` come first, followed by prims only its sublayers define.
pub fn composite_sublayers(
    resolver: &AssetResolver,
    layer: &Layer,
    options: &SublayersOptions,
) -> Result<Composition, CompositionError> {
    let mut stack = SublayerStack {
        loader: ArcLoader {
            resolver,
            arc: ArcKind::Sublayers,
            error_when_asset_not_found: options.error_when_asset_not_found,
            error_when_unsupported_format: options.error_when_unsupported_format,
            file_formats: &options.file_formats,
        },
        options,
        open: vec![canonical_identifier(&layer.identifier)],
        diagnostics: Diagnostics::default(),
    };

    let layer = stack.flatten(layer, 0)?;
    Ok(Composition {
        layer,
        warnings: stack.diagnostics.warnings,
        layers: stack.diagnostics.layers,
    })
}

fn canonical_identifier(identifier: &str) -> String {
    std::fs::canonicalize(identifier)
        .map(|path| path.display().to_string())
        .unwrap_or_else(|_| identifier.to_owned())
}

struct SublayerStack<'a> {
    loader: ArcLoader<'a>,
    options: &'a SublayersOptions,
    /// Layers being flattened on the current branch, outermost first.
    open: Vec<String>,
    diagnostics: Diagnostics,
}

impl SublayerStack<'_> {
    fn flatten(&mut self, layer: &Layer, depth: usize) -> Result<Layer, CompositionError> {
        if depth > self.options.max_depth {
            return Err(CompositionError::TooDeep {
                arc: ArcKind::Sublayers,
                path: layer.identifier.clone(),
                max_depth: self.options.max_depth,
            });
        }

        let context = layer.resolution.or(self.loader.resolver.context()).clone();

        // First writer wins: earlier sublayers are stronger.
        let mut weaker = Layer::new(layer.identifier.clone());
        for sub_layer in &layer.meta.sub_layers {
            let asset_path = sub_layer.asset_path.as_str();
            let Some(resolved) = self
                .loader
                .resolve(&layer.identifier, asset_path, &context, &mut self.diagnostics)?
            else {
                continue;
            };

            let identifier = resolved.display().to_string();
            if self.open.contains(&identifier) {
                return Err(CompositionError::CircularSublayer {
                    layer: identifier,
                    parent: layer.identifier.clone(),
                });
            }

            let Some(loaded) =
                self.loader
                    .open(&layer.identifier, asset_path, &resolved, &context, &mut self.diagnostics)?
            else {
                continue;
            };

            self.open.push(identifier);
            let flattened = self.flatten(&loaded, depth + 1);
            self.open.pop();
            let mut flattened = flattened?;

            if flattened.is_empty() {
                let error = CompositionError::NoPrims {
                    arc: ArcKind::Sublayers,
                    path: layer.identifier.clone(),
                    asset_path: asset_path.to_owned(),
                };
                if self.options.error_when_no_prims {
                    return Err(error);
                }
                self.diagnostics.warn(format!("{error}, skipping"));
                continue;
            }

            for prim in flattened.take_prim_specs() {
                if !weaker.has_prim_spec(&prim.name) {
                    weaker.insert_prim_spec(prim);
                }
            }
        }

        let mut result = Layer::new(layer.identifier.clone());
        result.meta = layer.meta.clone();
        result.meta.sub_layers.clear();
        result.resolution = layer.resolution.clone();

        for prim in layer.prim_specs() {
            let composed = match weaker.remove_prim_spec(&prim.name) {
                Some(mut base) if prim.specifier == Specifier::Over => {
                    override_unchecked(&mut base, prim);
                    base
                }
                _ => prim.clone(),
            };
            result.insert_prim_spec(composed);
        }
        for prim in weaker.take_prim_specs() {
            result.insert_prim_spec(prim);
        }

        Ok(result)
    }
}

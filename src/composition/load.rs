//! Asset loading shared by the compositors that pull in other layers.

use std::path::PathBuf;

use crate::asset::{AssetResolver, ResolutionContext};
use crate::format::{load_layer_from_asset, FileFormatRegistry, FormatKind};
use crate::sdf::Layer;

use super::{ArcKind, CompositionError};

/// Warnings and loaded layer identifiers gathered during one composition call.
#[derive(Debug, Default)]
pub(crate) struct Diagnostics {
    pub warnings: Vec<String>,
    pub layers: Vec<String>,
}

impl Diagnostics {
    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        log::warn!("{message}");
        self.warnings.push(message);
    }

    pub fn loaded(&mut self, identifier: &str) {
        if !self.layers.iter().any(|layer| layer == identifier) {
            self.layers.push(identifier.to_owned());
        }
    }

    pub fn absorb(&mut self, warnings: Vec<String>, layers: Vec<String>) {
        self.warnings.extend(warnings);
        for layer in layers {
            self.loaded(&layer);
        }
    }
}

/// Resolves and loads the assets of one arc kind, applying its
/// error-or-warn policy.
pub(crate) struct ArcLoader<'a> {
    pub resolver: &'a AssetResolver,
    pub arc: ArcKind,
    pub error_when_asset_not_found: bool,
    pub error_when_unsupported_format: bool,
    pub file_formats: &'a FileFormatRegistry,
}

impl ArcLoader<'_> {
    /// Turns a recoverable error into a warning when `strict` is unset.
    pub fn fail_or_warn(
        &self,
        strict: bool,
        error: CompositionError,
        diagnostics: &mut Diagnostics,
    ) -> Result<(), CompositionError> {
        if strict {
            return Err(error);
        }
        diagnostics.warn(format!("{error}, skipping"));
        Ok(())
    }

    /// Resolves `asset_path` in `context`. `Ok(None)` means skipped.
    pub fn resolve(
        &self,
        prim_path: &str,
        asset_path: &str,
        context: &ResolutionContext,
        diagnostics: &mut Diagnostics,
    ) -> Result<Option<PathBuf>, CompositionError> {
        if let Some(resolved) = self.resolver.resolve_in(asset_path, context) {
            return Ok(Some(resolved));
        }
        let error = CompositionError::AssetNotFound {
            arc: self.arc,
            path: prim_path.to_owned(),
            asset_path: asset_path.to_owned(),
            context: context.to_string(),
        };
        self.fail_or_warn(self.error_when_asset_not_found, error, diagnostics)?;
        Ok(None)
    }

    /// Opens a resolved asset as a layer whose prims resolve from the
    /// asset's directory. `Ok(None)` means skipped.
    pub fn open(
        &self,
        prim_path: &str,
        asset_path: &str,
        resolved: &std::path::Path,
        context: &ResolutionContext,
        diagnostics: &mut Diagnostics,
    ) -> Result<Option<Layer>, CompositionError> {
        if FormatKind::detect(asset_path, self.file_formats).is_none() {
            let error = CompositionError::UnsupportedFormat {
                arc: self.arc,
                path: prim_path.to_owned(),
                asset_path: asset_path.to_owned(),
            };
            self.fail_or_warn(self.error_when_unsupported_format, error, diagnostics)?;
            return Ok(None);
        }

        let asset = self
            .resolver
            .open_asset(resolved, asset_path)
            .map_err(|err| CompositionError::load(asset_path, err))?;
        let Some(mut layer) =
            load_layer_from_asset(&asset, self.file_formats).map_err(|err| CompositionError::load(asset_path, err))?
        else {
            return Ok(None);
        };

        layer.set_resolution(context.for_asset(resolved));
        diagnostics.loaded(&layer.identifier);
        log::debug!("Loaded {} asset '{}' for '{}'", self.arc, layer.identifier, prim_path);
        Ok(Some(layer))
    }

    pub fn load(
        &self,
        prim_path: &str,
        asset_path: &str,
        context: &ResolutionContext,
        diagnostics: &mut Diagnostics,
    ) -> Result<Option<Layer>, CompositionError> {
        match self.resolve(prim_path, asset_path, context, diagnostics)? {
            Some(resolved) => self.open(prim_path, asset_path, &resolved, context, diagnostics),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn loader<'a>(resolver: &'a AssetResolver, formats: &'a FileFormatRegistry, strict: bool) -> ArcLoader<'a> {
        ArcLoader {
            resolver,
            arc: ArcKind::References,
            error_when_asset_not_found: strict,
            error_when_unsupported_format: strict,
            file_formats: formats,
        }
    }

    #[test]
    fn loads_and_stamps_resolution() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.usda"), "#usda 1.0\ndef \"A\" {}\n").unwrap();

        let resolver = AssetResolver::new();
        let formats = FileFormatRegistry::new();
        let context = ResolutionContext::new(dir.path());
        let mut diagnostics = Diagnostics::default();

        let layer = loader(&resolver, &formats, true)
            .load("/World", "./a.usda", &context, &mut diagnostics)
            .unwrap()
            .unwrap();

        let prim = layer.prim_spec("A").unwrap();
        let base_dir = dir.path().canonicalize().unwrap();
        assert_eq!(prim.resolution.working_path.as_deref(), Some(base_dir.as_path()));
        assert_eq!(diagnostics.layers, [layer.identifier.clone()]);
    }

    #[test]
    fn missing_asset_error_or_warning() {
        let resolver = AssetResolver::new();
        let formats = FileFormatRegistry::new();
        let context = ResolutionContext::default();

        let mut diagnostics = Diagnostics::default();
        let err = loader(&resolver, &formats, true)
            .load("/World", "missing.usda", &context, &mut diagnostics)
            .unwrap_err();
        assert!(matches!(err, CompositionError::AssetNotFound { .. }));

        let skipped = loader(&resolver, &formats, false)
            .load("/World", "missing.usda", &context, &mut diagnostics)
            .unwrap();
        assert!(skipped.is_none());
        assert_eq!(diagnostics.warnings.len(), 1);
        assert!(diagnostics.warnings[0].contains("missing.usda"));
    }

    #[test]
    fn unknown_extension_is_unsupported() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("mesh.obj"), "v 0 0 0\n").unwrap();

        let resolver = AssetResolver::new();
        let formats = FileFormatRegistry::new();
        let context = ResolutionContext::new(dir.path());
        let mut diagnostics = Diagnostics::default();

        let err = loader(&resolver, &formats, true)
            .load("/World", "mesh.obj", &context, &mut diagnostics)
            .unwrap_err();
        assert!(matches!(err, CompositionError::UnsupportedFormat { .. }));
    }
}

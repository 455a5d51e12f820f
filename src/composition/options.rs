use std::path::PathBuf;

use crate::format::FileFormatRegistry;
use crate::sdf::VariantSelectionMap;

/// Default recursion bound for sublayer stacks.
pub const DEFAULT_SUBLAYER_DEPTH: usize = 1024;

/// Default recursion bound for prim hierarchies.
pub const DEFAULT_PRIM_DEPTH: usize = 1024 * 1024;

/// Default fixpoint iteration budget of [crate::composition::compose].
pub const DEFAULT_MAX_ITERATIONS: usize = 128;

#[derive(Debug, Clone)]
pub struct SublayersOptions {
    pub max_depth: usize,
    pub error_when_asset_not_found: bool,
    pub error_when_unsupported_format: bool,
    /// Sublayers without any prim are skipped unless this is set.
    pub error_when_no_prims: bool,
    /// Formats for extensions that are not built in.
    pub file_formats: FileFormatRegistry,
}

impl Default for SublayersOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_SUBLAYER_DEPTH,
            error_when_asset_not_found: true,
            error_when_unsupported_format: true,
            error_when_no_prims: false,
            file_formats: FileFormatRegistry::default(),
        }
    }
}

/// Options for `references` (and, through [PayloadOptions], `payload`).
///
/// A referenced layer without prims is always an error.
#[derive(Debug, Clone)]
pub struct ReferencesOptions {
    pub max_depth: usize,
    /// Also applies to internal targets missing from the layer.
    pub error_when_asset_not_found: bool,
    pub error_when_unsupported_format: bool,
    pub file_formats: FileFormatRegistry,
}

impl Default for ReferencesOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_PRIM_DEPTH,
            error_when_asset_not_found: true,
            error_when_unsupported_format: true,
            file_formats: FileFormatRegistry::default(),
        }
    }
}

/// Payload arcs resolve exactly like references.
pub type PayloadOptions = ReferencesOptions;

#[derive(Debug, Clone)]
pub struct InheritsOptions {
    pub max_depth: usize,
}

impl Default for InheritsOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_PRIM_DEPTH,
        }
    }
}

#[derive(Debug, Clone)]
pub struct VariantOptions {
    pub max_depth: usize,
    /// Variant set name to variant name. Wins over selections authored in
    /// the layer.
    pub selections: VariantSelectionMap,
}

impl Default for VariantOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_PRIM_DEPTH,
            selections: VariantSelectionMap::new(),
        }
    }
}

/// Options of the composition driver.
#[derive(Debug, Clone)]
pub struct CompositionOptions {
    pub max_iterations: usize,
    /// When unset, `payload` arcs are left in place.
    pub load_payloads: bool,
    /// Extra directories [crate::composition::compose_file] resolves assets from.
    pub search_paths: Vec<PathBuf>,
    pub sublayers: SublayersOptions,
    pub references: ReferencesOptions,
    pub payload: PayloadOptions,
    pub inherits: InheritsOptions,
    pub variants: VariantOptions,
}

impl Default for CompositionOptions {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            load_payloads: true,
            search_paths: Vec::new(),
            sublayers: SublayersOptions::default(),
            references: ReferencesOptions::default(),
            payload: PayloadOptions::default(),
            inherits: InheritsOptions::default(),
            variants: VariantOptions::default(),
        }
    }
}

impl CompositionOptions {
    /// Warns and skips instead of failing on missing assets and unknown formats.
    pub fn relaxed() -> Self {
        let mut options = Self::default();
        options.sublayers.error_when_asset_not_found = false;
        options.sublayers.error_when_unsupported_format = false;
        options.sublayers.error_when_no_prims = false;
        for arc in [&mut options.references, &mut options.payload] {
            arc.error_when_asset_not_found = false;
            arc.error_when_unsupported_format = false;
        }
        options
    }

    /// Uses `registry` for every arc that loads assets.
    pub fn with_file_formats(mut self, registry: FileFormatRegistry) -> Self {
        self.sublayers.file_formats = registry.clone();
        self.references.file_formats = registry.clone();
        self.payload.file_formats = registry;
        self
    }

    pub fn with_selection(mut self, variant_set: impl Into<String>, variant: impl Into<String>) -> Self {
        self.variants.selections.insert(variant_set.into(), variant.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relaxed_flips_every_error_toggle() {
        let options = CompositionOptions::relaxed();
        assert!(!options.sublayers.error_when_asset_not_found);
        assert!(!options.sublayers.error_when_unsupported_format);
        assert!(!options.references.error_when_asset_not_found);
        assert!(!options.payload.error_when_unsupported_format);
        assert_eq!(options.max_iterations, DEFAULT_MAX_ITERATIONS);
        assert_eq!(options.sublayers.max_depth, DEFAULT_SUBLAYER_DEPTH);
    }

    #[test]
    fn defaults_are_strict() {
        let options = CompositionOptions::default().with_selection("look", "red");
        assert!(options.load_payloads);
        assert!(options.references.error_when_asset_not_found);
        assert_eq!(options.variants.selections["look"], "red");
    }
}

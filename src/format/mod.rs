//! File format plugins and built-in format detection.
//!
//! The native text format and MaterialX are recognised by extension. Every
//! other extension needs a [FileFormat] registered in a [FileFormatRegistry].

use anyhow::{ensure, Context, Result};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::asset::{self, Asset};
use crate::sdf::{Layer, PrimSpec};
use crate::{mtlx, usda};

/// A pluggable layer format.
pub trait FileFormat: Send + Sync {
    /// Returns `true` if `data` looks like this format.
    fn check(&self, data: &[u8]) -> bool;

    /// Reads `data` into a single prim tree.
    fn read(&self, data: &[u8], asset_path: &str) -> Result<PrimSpec>;

    /// Serialises a prim tree.
    fn write(&self, prim: &PrimSpec) -> Result<Vec<u8>>;
}

/// Formats keyed by lowercase extension (without the dot).
#[derive(Default, Clone)]
pub struct FileFormatRegistry {
    formats: HashMap<String, Arc<dyn FileFormat>>,
}

impl fmt::Debug for FileFormatRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileFormatRegistry")
            .field("formats", &self.formats.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl FileFormatRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, extension: &str, format: impl FileFormat + 'static) {
        self.formats
            .insert(extension.trim_start_matches('.').to_ascii_lowercase(), Arc::new(format));
    }

    pub fn get(&self, extension: &str) -> Option<&Arc<dyn FileFormat>> {
        self.formats.get(&extension.trim_start_matches('.').to_ascii_lowercase())
    }

    pub fn contains(&self, extension: &str) -> bool {
        self.get(extension).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.formats.is_empty()
    }
}

/// How an asset is turned into a layer.
#[derive(Clone)]
pub enum FormatKind {
    /// Native text layer (`.usd`, `.usda`).
    Usd,
    /// MaterialX document (`.mtlx`).
    MaterialX,
    Plugin(Arc<dyn FileFormat>),
}

impl fmt::Debug for FormatKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormatKind::Usd => f.write_str("Usd"),
            FormatKind::MaterialX => f.write_str("MaterialX"),
            FormatKind::Plugin(_) => f.write_str("Plugin"),
        }
    }
}

impl FormatKind {
    /// Picks the format for `asset_path`. Built-in formats win over plugins.
    pub fn detect(asset_path: &str, registry: &FileFormatRegistry) -> Option<Self> {
        let ext = asset::extension(asset_path)?;
        match ext.as_str() {
            "usd" | "usda" => Some(FormatKind::Usd),
            "mtlx" => Some(FormatKind::MaterialX),
            other => registry.get(other).cloned().map(FormatKind::Plugin),
        }
    }
}

/// Loads an opened asset as a layer.
///
/// Returns `Ok(None)` when no built-in or registered format handles the
/// asset's extension.
pub fn load_layer_from_asset(asset: &Asset, registry: &FileFormatRegistry) -> Result<Option<Layer>> {
    let Some(kind) = FormatKind::detect(&asset.asset_path, registry) else {
        log::debug!("No file format for '{}'", asset.asset_path);
        return Ok(None);
    };

    let identifier = asset.resolved_path.display().to_string();
    let layer = match kind {
        FormatKind::Usd => usda::read_layer(&asset.data, &identifier)?,
        FormatKind::MaterialX => mtlx::read_layer(&asset.data, &identifier)?,
        FormatKind::Plugin(ref format) => {
            ensure!(
                format.check(&asset.data),
                "'{}' is not recognised by its file format plugin",
                asset.asset_path
            );
            let prim = format
                .read(&asset.data, &asset.asset_path)
                .with_context(|| format!("File format plugin failed to read '{}'", asset.asset_path))?;
            let mut layer = Layer::new(identifier);
            layer.add_prim_spec(prim)?;
            layer
        }
    };

    log::debug!("Loaded {:?} layer '{}' with {} root prims", kind, layer.identifier, layer.len());
    Ok(Some(layer))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    struct NameFormat;

    impl FileFormat for NameFormat {
        fn check(&self, data: &[u8]) -> bool {
            data.starts_with(b"name:")
        }

        fn read(&self, data: &[u8], _asset_path: &str) -> Result<PrimSpec> {
            let text = std::str::from_utf8(data)?;
            Ok(PrimSpec::def(text.trim_start_matches("name:").trim()))
        }

        fn write(&self, prim: &PrimSpec) -> Result<Vec<u8>> {
            Ok(format!("name:{}", prim.name).into_bytes())
        }
    }

    fn asset(path: &str, data: &[u8]) -> Asset {
        Asset {
            asset_path: path.to_owned(),
            resolved_path: PathBuf::from(path),
            data: data.to_vec(),
        }
    }

    #[test]
    fn detects_builtin_formats() {
        let registry = FileFormatRegistry::new();
        assert!(matches!(FormatKind::detect("a.usda", &registry), Some(FormatKind::Usd)));
        assert!(matches!(FormatKind::detect("@a.USD@", &registry), Some(FormatKind::Usd)));
        assert!(matches!(FormatKind::detect("m.mtlx", &registry), Some(FormatKind::MaterialX)));
        assert!(FormatKind::detect("a.obj", &registry).is_none());
        assert!(FormatKind::detect("noext", &registry).is_none());
    }

    #[test]
    fn plugin_format_produces_single_prim_layer() {
        let mut registry = FileFormatRegistry::new();
        registry.register(".name", NameFormat);
        assert!(registry.contains("NAME"));

        let layer = load_layer_from_asset(&asset("thing.name", b"name:Thing"), &registry)
            .unwrap()
            .unwrap();
        assert_eq!(layer.prim_spec_names().collect::<Vec<_>>(), ["Thing"]);

        assert!(load_layer_from_asset(&asset("thing.name", b"garbage"), &registry).is_err());
        assert!(load_layer_from_asset(&asset("thing.obj", b""), &registry)
            .unwrap()
            .is_none());
    }

    #[test]
    fn loads_text_layers() {
        let registry = FileFormatRegistry::new();
        let layer = load_layer_from_asset(&asset("a.usda", b"#usda 1.0\ndef \"A\" {}\n"), &registry)
            .unwrap()
            .unwrap();
        assert!(layer.has_prim_spec("A"));
        assert_eq!(layer.identifier, "a.usda");
    }
}

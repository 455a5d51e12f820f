//! Text layer format (`.usda`).

use anyhow::{anyhow, bail, Context, Result};
use std::fs;
use std::path::Path;

use crate::asset::ResolutionContext;
use crate::format::FileFormat;
use crate::sdf;

pub mod parser;
mod token;
mod writer;

pub use writer::{write_layer, write_prim};

const USDC_MAGIC: &[u8] = b"PXR-USDC";

/// Parses a text layer from raw bytes.
///
/// Parse failures carry the offending line with a column marker.
pub fn read_layer(data: &[u8], identifier: &str) -> Result<sdf::Layer> {
    if data.starts_with(USDC_MAGIC) {
        bail!("'{identifier}' is a binary crate file, only text layers are supported");
    }

    let text = std::str::from_utf8(data).with_context(|| format!("'{identifier}' is not valid UTF-8"))?;
    let mut parser = parser::Parser::new(text);

    let mut layer = match parser.parse() {
        Ok(layer) => layer,
        Err(err) => {
            return Err(match parser.last_error_highlight() {
                Some(highlight) => err.context(format!("Failed to parse '{identifier}' at {highlight}")),
                None => err.context(format!("Failed to parse '{identifier}'")),
            });
        }
    };

    layer.identifier = identifier.to_owned();
    Ok(layer)
}

/// Reads text layers from disk.
pub struct TextReader;

impl TextReader {
    /// Reads the layer at `path` and stamps its directory onto every prim as
    /// the resolution context.
    pub fn read(path: impl AsRef<Path>) -> Result<sdf::Layer> {
        let path = path.as_ref();
        let data = fs::read(path).with_context(|| format!("Failed to read file: {}", path.display()))?;
        let path = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());

        let mut layer = read_layer(&data, &path.display().to_string())?;
        if let Some(dir) = path.parent() {
            layer.set_resolution(ResolutionContext::new(dir));
        }

        log::debug!("Read text layer {} ({} root prims)", path.display(), layer.len());
        Ok(layer)
    }
}

/// The text format as a [FileFormat], reading a layer's default prim.
#[derive(Debug, Default, Clone, Copy)]
pub struct TextFormat;

impl FileFormat for TextFormat {
    fn check(&self, data: &[u8]) -> bool {
        data.starts_with(b"#usda")
    }

    fn read(&self, data: &[u8], asset_path: &str) -> Result<sdf::PrimSpec> {
        let layer = read_layer(data, asset_path)?;
        layer
            .default_prim_spec()
            .cloned()
            .ok_or_else(|| anyhow!("'{asset_path}' has no prims"))
    }

    fn write(&self, prim: &sdf::PrimSpec) -> Result<Vec<u8>> {
        let mut text = String::from("#usda 1.0\n\n");
        text.push_str(&write_prim(prim));
        Ok(text.into_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_binary_crate_files() {
        let err = read_layer(b"PXR-USDC\0\0\0\0", "scene.usdc").unwrap_err();
        assert!(err.to_string().contains("binary"));
    }

    #[test]
    fn parse_errors_name_the_line() {
        let err = read_layer(b"#usda 1.0\ndef \"A\" {\n    float = 1\n}\n", "bad.usda").unwrap_err();
        let message = format!("{err:#}");
        assert!(message.contains("bad.usda"), "{message}");
        assert!(message.contains("line 3"), "{message}");
    }

    #[test]
    fn reader_stamps_layer_directory() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("scene.usda");
        fs::write(&file, "#usda 1.0\ndef \"World\" {\n    def \"Child\" {}\n}\n").unwrap();

        let layer = TextReader::read(&file).unwrap();
        let expected = dir.path().canonicalize().unwrap();
        let child = layer.prim_spec("World").and_then(|world| world.child("Child")).unwrap();
        assert_eq!(child.resolution.working_path.as_deref(), Some(expected.as_path()));
        assert_eq!(layer.resolution.working_path.as_deref(), Some(expected.as_path()));
    }

    #[test]
    fn text_format_reads_default_prim() {
        let data = b"#usda 1.0\n(\n    defaultPrim = \"B\"\n)\ndef \"A\" {}\ndef \"B\" {}\n";
        assert!(TextFormat.check(data));
        let prim = TextFormat.read(data, "two.usda").unwrap();
        assert_eq!(prim.name, "B");

        let written = TextFormat.write(&prim).unwrap();
        let layer = read_layer(&written, "out.usda").unwrap();
        assert!(layer.has_prim_spec("B"));
    }
}

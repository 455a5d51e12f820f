//! MaterialX (.mtlx) loading.
//!
//! MaterialX is an open standard for representing materials and looks in computer graphics.
//! Documents referenced from a layer (`references = @look.mtlx@</MaterialX>`) are parsed
//! and converted into a single `def Scope "MaterialX"` prim:
//!
//! - `nodegraph` becomes a `NodeGraph` prim holding its nodes
//! - `surfacematerial` becomes a `Material` whose `outputs:mtlx:surface` connects to its shader
//! - every other node becomes a `Shader` with `info:id = "ND_<category>_<type>"`
//!
//! `input` elements turn into `inputs:*` attributes, either valued or connected.

mod convert;
mod parser;
mod types;

use anyhow::{Context, Result};

use crate::sdf;

pub use convert::ROOT_PRIM_NAME;
pub use parser::parse_mtlx;
pub use types::*;

/// Reads a MaterialX document as a layer whose only prim is `/MaterialX`.
pub fn read_layer(data: &[u8], identifier: &str) -> Result<sdf::Layer> {
    let content = std::str::from_utf8(data).with_context(|| format!("'{identifier}' is not valid UTF-8"))?;
    let document = parse_mtlx(content).with_context(|| format!("Failed to read MaterialX '{identifier}'"))?;
    let prim = document
        .to_prim_spec()
        .with_context(|| format!("Failed to convert MaterialX '{identifier}'"))?;

    let mut layer = sdf::Layer::new(identifier);
    layer.meta.default_prim = Some(ROOT_PRIM_NAME.to_owned());
    layer.add_prim_spec(prim)?;
    Ok(layer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layer_holds_single_root() {
        let layer = read_layer(
            br#"<materialx version="1.39"><standard_surface name="S" type="surfaceshader"/></materialx>"#,
            "look.mtlx",
        )
        .unwrap();
        assert_eq!(layer.prim_spec_names().collect::<Vec<_>>(), [ROOT_PRIM_NAME]);
        assert_eq!(layer.default_prim_spec().unwrap().children[0].name, "S");
    }

    #[test]
    fn invalid_xml_is_an_error() {
        assert!(read_layer(b"<materialx", "broken.mtlx").is_err());
    }
}

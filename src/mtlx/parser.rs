//! MaterialX XML parser.

use anyhow::{bail, ensure, Context, Result};
use roxmltree::{Document, Node};

use super::types::*;

/// Oldest document version accepted.
const MIN_VERSION: f32 = 1.38;

/// Parse MaterialX XML content into a document structure.
pub fn parse_mtlx(content: &str) -> Result<MtlxDocument> {
    let doc = Document::parse(content).context("Failed to parse MaterialX XML")?;
    let root = doc.root_element();

    if root.tag_name().name() != "materialx" {
        bail!(
            "Not a MaterialX document: root element is '{}'",
            root.tag_name().name()
        );
    }

    let version = root
        .attribute("version")
        .context("version attribute not found in <materialx>")?;
    let numeric = version
        .parse::<f32>()
        .with_context(|| format!("Invalid MaterialX version '{version}'"))?;
    ensure!(
        numeric >= MIN_VERSION,
        "MaterialX version {MIN_VERSION} or greater is required, got {version}"
    );

    let mut mtlx_doc = MtlxDocument {
        version: version.to_owned(),
        colorspace: root.attribute("colorspace").map(String::from),
        ..Default::default()
    };

    for child in root.children().filter(|n| n.is_element()) {
        match child.tag_name().name() {
            "look" | "collection" | "typedef" | "nodedef" | "implementation" => {
                log::debug!("Skipping MaterialX element: {}", child.tag_name().name());
            }
            _ => mtlx_doc.elements.push(parse_node(&child)?),
        }
    }

    log::debug!(
        "Parsed MaterialX {}: {} top-level elements",
        mtlx_doc.version,
        mtlx_doc.elements.len()
    );

    Ok(mtlx_doc)
}

fn parse_node(node: &Node) -> Result<MtlxNode> {
    let category = node.tag_name().name();
    let name = node
        .attribute("name")
        .with_context(|| format!("<{category}> element without a name"))?;

    let mut out = MtlxNode {
        category: category.to_owned(),
        name: name.to_owned(),
        node_type: node.attribute("type").map(String::from),
        ..Default::default()
    };

    for child in node.children().filter(|n| n.is_element()) {
        match child.tag_name().name() {
            "input" => out.inputs.push(parse_input(&child).with_context(|| format!("In <{category}> '{name}'"))?),
            "output" => out.outputs.push(parse_output(&child).with_context(|| format!("In <{category}> '{name}'"))?),
            _ if out.is_node_graph() => out.nodes.push(parse_node(&child)?),
            other => log::warn!("Ignoring <{other}> inside <{category}> '{name}'"),
        }
    }

    Ok(out)
}

fn parse_input(node: &Node) -> Result<MtlxInput> {
    let name = node.attribute("name").context("<input> without a name")?;
    let input_type = node.attribute("type").unwrap_or("float");
    let output = node.attribute("output").map(String::from);

    let source = if let Some(nodegraph) = node.attribute("nodegraph") {
        Some(InputSource::NodeGraph {
            nodegraph: nodegraph.to_owned(),
            output,
        })
    } else if let Some(nodename) = node.attribute("nodename") {
        Some(InputSource::Node {
            nodename: nodename.to_owned(),
            output,
        })
    } else if let Some(interface) = node.attribute("interfacename") {
        Some(InputSource::Interface(interface.to_owned()))
    } else {
        node.attribute("value").map(|value| InputSource::Value(value.to_owned()))
    };

    Ok(MtlxInput {
        name: name.to_owned(),
        input_type: input_type.to_owned(),
        source,
        colorspace: node.attribute("colorspace").map(String::from),
    })
}

fn parse_output(node: &Node) -> Result<MtlxOutput> {
    let name = node.attribute("name").context("<output> without a name")?;
    Ok(MtlxOutput {
        name: name.to_owned(),
        output_type: node.attribute("type").unwrap_or("color3").to_owned(),
        nodename: node.attribute("nodename").map(String::from),
        output: node.attribute("output").map(String::from),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_MTLX: &str = r#"<?xml version="1.0"?>
<materialx version="1.38" colorspace="lin_rec709">
  <nodegraph name="NG_Test">
    <input name="tiling" type="vector2" value="2, 2" />
    <image name="img_basecolor" type="color3">
      <input name="file" type="filename" value="tex/basecolor.jpg" colorspace="srgb_texture" />
      <input name="uvtiling" type="vector2" interfacename="tiling" />
    </image>
    <output name="base_color_output" type="color3" nodename="img_basecolor" />
  </nodegraph>

  <standard_surface name="TestShader" type="surfaceshader">
    <input name="base_color" type="color3" nodegraph="NG_Test" output="base_color_output" />
    <input name="base" type="float" value="1.0" />
  </standard_surface>

  <surfacematerial name="M_Test" type="material">
    <input name="surfaceshader" type="surfaceshader" nodename="TestShader" />
  </surfacematerial>

  <look name="unused" />
</materialx>"#;

    #[test]
    fn test_parse_mtlx() {
        let doc = parse_mtlx(SAMPLE_MTLX).unwrap();

        assert_eq!(doc.version, "1.38");
        assert_eq!(doc.colorspace, Some("lin_rec709".to_string()));
        assert_eq!(
            doc.elements.iter().map(|e| e.name.as_str()).collect::<Vec<_>>(),
            ["NG_Test", "TestShader", "M_Test"]
        );
    }

    #[test]
    fn test_parse_nodegraph() {
        let doc = parse_mtlx(SAMPLE_MTLX).unwrap();
        let ng = doc.element("NG_Test").unwrap();

        assert!(ng.is_node_graph());
        assert_eq!(ng.nodes.len(), 1);
        assert_eq!(ng.outputs[0].nodename.as_deref(), Some("img_basecolor"));

        let img = &ng.nodes[0];
        let file = img.input("file").unwrap();
        assert_eq!(file.source, Some(InputSource::Value("tex/basecolor.jpg".into())));
        assert_eq!(file.colorspace.as_deref(), Some("srgb_texture"));
        assert_eq!(
            img.input("uvtiling").unwrap().source,
            Some(InputSource::Interface("tiling".into()))
        );
    }

    #[test]
    fn test_parse_connections() {
        let doc = parse_mtlx(SAMPLE_MTLX).unwrap();
        let shader = doc.element("TestShader").unwrap();
        assert_eq!(
            shader.input("base_color").unwrap().source,
            Some(InputSource::NodeGraph {
                nodegraph: "NG_Test".into(),
                output: Some("base_color_output".into()),
            })
        );

        let material = doc.element("M_Test").unwrap();
        assert!(material.is_material());
        assert_eq!(
            material.input("surfaceshader").unwrap().source,
            Some(InputSource::Node {
                nodename: "TestShader".into(),
                output: None,
            })
        );
    }

    #[test]
    fn test_rejects_old_or_foreign_documents() {
        assert!(parse_mtlx(r#"<materialx version="1.37"/>"#).is_err());
        assert!(parse_mtlx(r#"<materialx/>"#).is_err());
        assert!(parse_mtlx(r#"<collada version="1.4"/>"#).is_err());
    }
}

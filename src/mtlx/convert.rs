//! MaterialX document to prim tree conversion.
//!
//! ```text
//! def Scope "MaterialX" {
//!     def NodeGraph "NG" { def Shader "image" { ... } }
//!     def Shader "Surface" { uniform token info:id = "ND_standard_surface_surfaceshader" }
//!     def Material "M" { token outputs:mtlx:surface.connect = </MaterialX/Surface.outputs:out> }
//! }
//! ```

use anyhow::{bail, ensure, Context, Result};

use crate::sdf::{self, PrimSpec, Property, Value, Variability};

use super::types::*;

/// Name of the root prim every MaterialX document converts into.
pub const ROOT_PRIM_NAME: &str = "MaterialX";

impl MtlxDocument {
    /// Converts the document into a `def Scope "MaterialX"` prim tree.
    pub fn to_prim_spec(&self) -> Result<PrimSpec> {
        let root_path = sdf::Path::abs_root().append_child(ROOT_PRIM_NAME)?;

        let mut custom_data = sdf::Dictionary::new();
        custom_data.insert("mtlx:version".to_owned(), Value::String(self.version.clone()));
        if let Some(colorspace) = &self.colorspace {
            custom_data.insert("mtlx:colorspace".to_owned(), Value::String(colorspace.clone()));
        }

        let mut root = PrimSpec::def(ROOT_PRIM_NAME).with_type("Scope");
        root.meta.custom_data = Some(custom_data);

        for element in &self.elements {
            let prim = convert_node(element, &root_path, &root_path)
                .with_context(|| format!("Failed to convert <{}> '{}'", element.category, element.name))?;
            ensure!(
                root.child(&prim.name).is_none(),
                "Duplicate MaterialX element name '{}'",
                prim.name
            );
            root.children.push(prim);
        }

        Ok(root)
    }
}

/// `scope` is the prim that sibling `nodename` references resolve under.
fn convert_node(node: &MtlxNode, parent: &sdf::Path, scope: &sdf::Path) -> Result<PrimSpec> {
    ensure!(sdf::is_valid_prim_name(&node.name), "Invalid node name '{}'", node.name);
    let path = parent.append_child(&node.name)?;

    if node.is_node_graph() {
        let mut graph = PrimSpec::def(&node.name).with_type("NodeGraph");
        for input in &node.inputs {
            add_input(&mut graph, input, scope, &path)?;
        }
        for output in &node.outputs {
            let mut property = Property::declaration(usd_type_name(&output.output_type));
            if let Some(nodename) = &output.nodename {
                property = property.with_connection(vec![output_path(&path, nodename, output.output.as_deref())?]);
            }
            graph.properties.insert(format!("outputs:{}", output.name), property);
        }
        for child in &node.nodes {
            let prim = convert_node(child, &path, &path)?;
            ensure!(graph.child(&prim.name).is_none(), "Duplicate node name '{}'", prim.name);
            graph.children.push(prim);
        }
        return Ok(graph);
    }

    if node.is_material() {
        let mut material = PrimSpec::def(&node.name).with_type("Material");
        for input in &node.inputs {
            if input.input_type == "surfaceshader" || input.name == "surfaceshader" {
                let Some(InputSource::Node { nodename, output }) = &input.source else {
                    bail!("surfaceshader input of '{}' must reference a node", node.name);
                };
                let target = output_path(scope, nodename, output.as_deref())?;
                material.properties.insert(
                    "outputs:mtlx:surface".to_owned(),
                    Property::declaration("token").with_connection(vec![target]),
                );
            } else {
                add_input(&mut material, input, scope, &path)?;
            }
        }
        return Ok(material);
    }

    let mut shader = PrimSpec::def(&node.name).with_type("Shader");
    let node_type = node.node_type.as_deref().unwrap_or("color3");
    shader.properties.insert(
        "info:id".to_owned(),
        Property::attribute("token", Value::Token(format!("ND_{}_{}", node.category, node_type)))
            .with_variability(Variability::Uniform),
    );
    for input in &node.inputs {
        add_input(&mut shader, input, scope, &path)?;
    }
    if node.outputs.is_empty() {
        shader
            .properties
            .insert("outputs:out".to_owned(), Property::declaration(usd_type_name(node_type)));
    }
    for output in &node.outputs {
        shader.properties.insert(
            format!("outputs:{}", output.name),
            Property::declaration(usd_type_name(&output.output_type)),
        );
    }
    Ok(shader)
}

fn output_path(scope: &sdf::Path, nodename: &str, output: Option<&str>) -> Result<sdf::Path> {
    scope
        .append_child(nodename)?
        .append_property(&format!("outputs:{}", output.unwrap_or("out")))
}

/// Interface connections resolve against the parent of `node_path`.
fn add_input(prim: &mut PrimSpec, input: &MtlxInput, scope: &sdf::Path, node_path: &sdf::Path) -> Result<()> {
    let type_name = usd_type_name(&input.input_type);
    let mut property = Property::declaration(type_name);

    match &input.source {
        Some(InputSource::Value(raw)) => {
            property.default = Some(
                parse_value(&input.input_type, raw)
                    .with_context(|| format!("Invalid value '{raw}' for input '{}'", input.name))?,
            );
        }
        Some(InputSource::Node { nodename, output }) => {
            property.targets = Some(sdf::ListEdit::explicit(vec![output_path(
                scope,
                nodename,
                output.as_deref(),
            )?]));
        }
        Some(InputSource::NodeGraph { nodegraph, output }) => {
            let root = sdf::Path::abs_root().append_child(ROOT_PRIM_NAME)?;
            property.targets = Some(sdf::ListEdit::explicit(vec![output_path(
                &root,
                nodegraph,
                output.as_deref(),
            )?]));
        }
        Some(InputSource::Interface(name)) => {
            let parent = node_path.parent().context("Interface input outside of a node graph")?;
            property.targets = Some(sdf::ListEdit::explicit(vec![
                parent.append_property(&format!("inputs:{name}"))?
            ]));
        }
        None => {}
    }

    if let Some(colorspace) = &input.colorspace {
        property
            .metadata
            .insert("colorSpace".to_owned(), Value::Token(colorspace.clone()));
    }

    prim.properties.insert(format!("inputs:{}", input.name), property);
    Ok(())
}

/// MaterialX type name to attribute type name.
fn usd_type_name(mtlx_type: &str) -> &'static str {
    match mtlx_type {
        "float" => "float",
        "integer" => "int",
        "boolean" => "bool",
        "color3" => "color3f",
        "color4" => "color4f",
        "vector2" => "float2",
        "vector3" => "float3",
        "vector4" => "float4",
        "matrix33" => "matrix3d",
        "matrix44" => "matrix4d",
        "string" => "string",
        "filename" => "asset",
        _ => "token",
    }
}

fn floats(raw: &str, count: usize) -> Result<Vec<f32>> {
    let values = raw
        .split(',')
        .map(|part| part.trim().parse::<f32>())
        .collect::<Result<Vec<_>, _>>()?;
    ensure!(values.len() == count, "Expected {count} components, got {}", values.len());
    Ok(values)
}

fn parse_value(mtlx_type: &str, raw: &str) -> Result<Value> {
    Ok(match mtlx_type {
        "float" => Value::Float(raw.trim().parse()?),
        "integer" => Value::Int(raw.trim().parse()?),
        "boolean" => Value::Bool(matches!(raw.trim(), "true" | "1")),
        "color3" | "vector3" => Value::Vec3f(floats(raw, 3)?),
        "color4" | "vector4" => Value::Vec4f(floats(raw, 4)?),
        "vector2" => Value::Vec2f(floats(raw, 2)?),
        "matrix33" => Value::Matrix3d(floats(raw, 9)?.into_iter().map(f64::from).collect()),
        "matrix44" => Value::Matrix4d(floats(raw, 16)?.into_iter().map(f64::from).collect()),
        "string" => Value::String(raw.to_owned()),
        "filename" => Value::AssetPath(raw.to_owned()),
        _ => Value::Token(raw.to_owned()),
    })
}

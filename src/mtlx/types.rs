//! MaterialX data types for representing parsed .mtlx files.
//!
//! The model is generic: every node keeps its category (`image`,
//! `standard_surface`, ...) instead of having a dedicated struct.

/// A parsed MaterialX document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MtlxDocument {
    /// MaterialX version (e.g., "1.38")
    pub version: String,
    /// Default colorspace for the document
    pub colorspace: Option<String>,
    /// Top-level elements in document order.
    pub elements: Vec<MtlxNode>,
}

impl MtlxDocument {
    pub fn element(&self, name: &str) -> Option<&MtlxNode> {
        self.elements.iter().find(|node| node.name == name)
    }
}

/// A node, node graph or material element.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MtlxNode {
    /// Element tag (`surfacematerial`, `nodegraph`, `image`, ...).
    pub category: String,
    pub name: String,
    /// Output type of the node (`color3`, `surfaceshader`, `material`, ...).
    pub node_type: Option<String>,
    pub inputs: Vec<MtlxInput>,
    pub outputs: Vec<MtlxOutput>,
    /// Nested nodes of a `nodegraph`.
    pub nodes: Vec<MtlxNode>,
}

impl MtlxNode {
    pub fn is_node_graph(&self) -> bool {
        self.category == "nodegraph"
    }

    pub fn is_material(&self) -> bool {
        self.category == "surfacematerial" || self.category == "volumematerial"
    }

    pub fn input(&self, name: &str) -> Option<&MtlxInput> {
        self.inputs.iter().find(|input| input.name == name)
    }
}

/// Where an input's value comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum InputSource {
    /// Constant value, still in its XML string form.
    Value(String),
    /// Output of a sibling node.
    Node { nodename: String, output: Option<String> },
    /// Output of a top-level node graph.
    NodeGraph { nodegraph: String, output: Option<String> },
    /// Interface input of the enclosing node graph.
    Interface(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct MtlxInput {
    pub name: String,
    pub input_type: String,
    pub source: Option<InputSource>,
    pub colorspace: Option<String>,
}

/// An output of a node graph or node.
#[derive(Debug, Clone, PartialEq)]
pub struct MtlxOutput {
    pub name: String,
    pub output_type: String,
    /// Node inside the graph this output reads from.
    pub nodename: Option<String>,
    pub output: Option<String>,
}

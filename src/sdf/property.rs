use super::{Dictionary, ListEdit, Path, Value};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Variability {
    #[default]
    Varying,
    Uniform,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum PropertyKind {
    #[default]
    Attribute,
    Relationship,
}

/// An attribute or relationship authored on a prim.
///
/// Attribute connections (`inputs:x.connect`) and relationship targets both
/// live in `targets`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Property {
    pub kind: PropertyKind,
    /// Declared value type (`float3`, `token[]`, ...). Empty for relationships.
    pub type_name: String,
    pub variability: Variability,
    pub custom: bool,
    pub default: Option<Value>,
    pub time_samples: Vec<(f64, Value)>,
    pub targets: Option<ListEdit<Path>>,
    pub metadata: Dictionary,
}

impl Property {
    /// Attribute with a default value.
    pub fn attribute(type_name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            type_name: type_name.into(),
            default: Some(value.into()),
            ..Default::default()
        }
    }

    /// Attribute declaration without a value.
    pub fn declaration(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            ..Default::default()
        }
    }

    /// Relationship with explicit targets.
    pub fn relationship(targets: Vec<Path>) -> Self {
        Self {
            kind: PropertyKind::Relationship,
            targets: Some(ListEdit::explicit(targets)),
            ..Default::default()
        }
    }

    #[inline]
    pub fn is_relationship(&self) -> bool {
        self.kind == PropertyKind::Relationship
    }

    /// Default value, if authored.
    #[inline]
    pub fn value(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    pub fn with_variability(mut self, variability: Variability) -> Self {
        self.variability = variability;
        self
    }

    pub fn with_connection(mut self, targets: Vec<Path>) -> Self {
        self.targets = Some(ListEdit::explicit(targets));
        self
    }
}

use super::{Dictionary, Path};

/// Qualifier of a list-edited metadata field such as `references` or `inherits`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
pub enum ListEditQual {
    /// No qualifier: the list replaces weaker opinions.
    #[default]
    #[strum(to_string = "explicit")]
    ResetToExplicit,
    #[strum(to_string = "prepend")]
    Prepend,
    #[strum(to_string = "append")]
    Append,
    #[strum(to_string = "add")]
    Add,
    #[strum(to_string = "delete")]
    Delete,
    #[strum(to_string = "reorder")]
    Order,
    #[strum(to_string = "invalid")]
    Invalid,
}

impl ListEditQual {
    /// Keyword written before the field name, if any.
    pub fn keyword(self) -> Option<&'static str> {
        match self {
            ListEditQual::ResetToExplicit | ListEditQual::Invalid => None,
            ListEditQual::Prepend => Some("prepend"),
            ListEditQual::Append => Some("append"),
            ListEditQual::Add => Some("add"),
            ListEditQual::Delete => Some("delete"),
            ListEditQual::Order => Some("reorder"),
        }
    }
}

/// A qualified list of items.
#[derive(Debug, Clone, PartialEq)]
pub struct ListEdit<T> {
    pub qual: ListEditQual,
    pub items: Vec<T>,
}

impl<T> ListEdit<T> {
    pub fn new(qual: ListEditQual, items: Vec<T>) -> Self {
        Self { qual, items }
    }

    pub fn explicit(items: Vec<T>) -> Self {
        Self::new(ListEditQual::ResetToExplicit, items)
    }

    pub fn prepend(items: Vec<T>) -> Self {
        Self::new(ListEditQual::Prepend, items)
    }

    pub fn append(items: Vec<T>) -> Self {
        Self::new(ListEditQual::Append, items)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }
}

impl<T> Default for ListEdit<T> {
    fn default() -> Self {
        Self::explicit(Vec::new())
    }
}

/// Time offset and scale applied to a referenced layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayerOffset {
    pub offset: f64,
    pub scale: f64,
}

impl LayerOffset {
    pub fn new(offset: f64, scale: f64) -> Self {
        Self { offset, scale }
    }

    #[inline]
    pub fn is_identity(&self) -> bool {
        self.offset == 0.0 && self.scale == 1.0
    }
}

impl Default for LayerOffset {
    fn default() -> Self {
        Self {
            offset: 0.0,
            scale: 1.0,
        }
    }
}

/// A `references` entry.
///
/// An empty asset path makes the reference internal: the target prim is
/// looked up in the layer being composed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reference {
    pub asset_path: String,
    pub prim_path: Path,
    pub layer_offset: LayerOffset,
    pub custom_data: Dictionary,
}

impl Reference {
    pub fn new(asset_path: impl Into<String>, prim_path: Path) -> Self {
        Self {
            asset_path: asset_path.into(),
            prim_path,
            ..Default::default()
        }
    }

    /// Reference to a prim of the layer being composed.
    pub fn internal(prim_path: Path) -> Self {
        Self::new(String::new(), prim_path)
    }
}

/// A `payload` entry. Same addressing as [Reference], loaded on demand.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Payload {
    pub asset_path: String,
    pub prim_path: Path,
    pub layer_offset: Option<LayerOffset>,
}

impl Payload {
    pub fn new(asset_path: impl Into<String>, prim_path: Path) -> Self {
        Self {
            asset_path: asset_path.into(),
            prim_path,
            layer_offset: None,
        }
    }
}

/// A `subLayers` entry of a layer header.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubLayer {
    pub asset_path: String,
    pub layer_offset: LayerOffset,
}

impl SubLayer {
    pub fn new(asset_path: impl Into<String>) -> Self {
        Self {
            asset_path: asset_path.into(),
            layer_offset: LayerOffset::default(),
        }
    }
}

use std::collections::BTreeMap;

use crate::asset::ResolutionContext;

use super::{merge_dictionary, Dictionary, ListEdit, Path, Payload, Property, Reference, Value};

/// Prim specifier.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Specifier {
    /// Concrete definition.
    #[default]
    Def,
    /// Sparse override.
    Over,
    /// Abstract template, only reachable through `inherits`.
    Class,
}

/// Variant set name to selected variant name.
pub type VariantSelectionMap = BTreeMap<String, String>;

/// Prim metadata.
///
/// Every field is optional: `None` means "not authored", which is what the
/// merge rules in [PrimMeta::update_from] key on.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PrimMeta {
    pub active: Option<bool>,
    pub hidden: Option<bool>,
    pub instanceable: Option<bool>,
    pub kind: Option<String>,
    pub doc: Option<String>,
    pub comment: Option<String>,
    pub display_name: Option<String>,
    pub scene_name: Option<String>,
    pub api_schemas: Option<ListEdit<String>>,
    pub asset_info: Option<Dictionary>,
    pub custom_data: Option<Dictionary>,
    pub sdr_metadata: Option<Dictionary>,
    pub clips: Option<Dictionary>,

    pub references: Option<ListEdit<Reference>>,
    pub payload: Option<ListEdit<Payload>>,
    pub inherits: Option<ListEdit<Path>>,
    pub specializes: Option<ListEdit<Path>>,
    pub variant_sets: Option<ListEdit<String>>,
    pub variants: Option<VariantSelectionMap>,

    /// Metadata without a dedicated field.
    pub other: Dictionary,
}

impl PrimMeta {
    /// Merges `rhs` into `self`.
    ///
    /// With `override_authored` the fields authored on `rhs` win; otherwise
    /// `rhs` only fills fields `self` leaves unset. Dictionaries merge key by
    /// key under the same rule.
    pub fn update_from(&mut self, rhs: &PrimMeta, override_authored: bool) {
        merge_field(&mut self.active, &rhs.active, override_authored);
        merge_field(&mut self.hidden, &rhs.hidden, override_authored);
        merge_field(&mut self.instanceable, &rhs.instanceable, override_authored);
        merge_field(&mut self.kind, &rhs.kind, override_authored);
        merge_field(&mut self.doc, &rhs.doc, override_authored);
        merge_field(&mut self.comment, &rhs.comment, override_authored);
        merge_field(&mut self.display_name, &rhs.display_name, override_authored);
        merge_field(&mut self.scene_name, &rhs.scene_name, override_authored);
        merge_field(&mut self.api_schemas, &rhs.api_schemas, override_authored);

        merge_dict_field(&mut self.asset_info, &rhs.asset_info, override_authored);
        merge_dict_field(&mut self.custom_data, &rhs.custom_data, override_authored);
        merge_dict_field(&mut self.sdr_metadata, &rhs.sdr_metadata, override_authored);
        merge_dict_field(&mut self.clips, &rhs.clips, override_authored);

        merge_field(&mut self.references, &rhs.references, override_authored);
        merge_field(&mut self.payload, &rhs.payload, override_authored);
        merge_field(&mut self.inherits, &rhs.inherits, override_authored);
        merge_field(&mut self.specializes, &rhs.specializes, override_authored);
        merge_field(&mut self.variant_sets, &rhs.variant_sets, override_authored);
        merge_field(&mut self.variants, &rhs.variants, override_authored);

        merge_dictionary(&mut self.other, &rhs.other, override_authored);
    }

    /// Returns `true` if no field is authored.
    pub fn is_empty(&self) -> bool {
        *self == PrimMeta::default()
    }

    /// Returns `true` if any composition arc is authored.
    pub fn has_arcs(&self) -> bool {
        self.references.is_some()
            || self.payload.is_some()
            || self.inherits.is_some()
            || self.specializes.is_some()
            || self.variant_sets.is_some()
            || self.variants.is_some()
    }
}

fn merge_field<T: Clone>(dst: &mut Option<T>, src: &Option<T>, override_authored: bool) {
    if src.is_some() && (override_authored || dst.is_none()) {
        dst.clone_from(src);
    }
}

fn merge_dict_field(dst: &mut Option<Dictionary>, src: &Option<Dictionary>, override_authored: bool) {
    match (dst.as_mut(), src) {
        (Some(dst), Some(src)) => merge_dictionary(dst, src, override_authored),
        (None, Some(src)) => *dst = Some(src.clone()),
        (_, None) => {}
    }
}

/// Variants of one variant set, keyed by variant name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VariantSet {
    pub variants: BTreeMap<String, PrimSpec>,
}

impl VariantSet {
    pub fn variant(&self, name: &str) -> Option<&PrimSpec> {
        self.variants.get(name)
    }

    pub fn variant_names(&self) -> impl Iterator<Item = &str> {
        self.variants.keys().map(String::as_str)
    }
}

/// A single node of a layer's prim hierarchy.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PrimSpec {
    pub name: String,
    pub specifier: Specifier,
    pub type_name: String,
    pub properties: BTreeMap<String, Property>,
    pub meta: PrimMeta,
    pub children: Vec<PrimSpec>,
    /// Variant set name to its variants. Not part of `children` until selected.
    pub variant_sets: BTreeMap<String, VariantSet>,
    /// Where asset paths authored on this prim resolve from.
    pub resolution: ResolutionContext,
}

impl PrimSpec {
    pub fn new(specifier: Specifier, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            specifier,
            ..Default::default()
        }
    }

    pub fn def(name: impl Into<String>) -> Self {
        Self::new(Specifier::Def, name)
    }

    pub fn over(name: impl Into<String>) -> Self {
        Self::new(Specifier::Over, name)
    }

    pub fn class(name: impl Into<String>) -> Self {
        Self::new(Specifier::Class, name)
    }

    pub fn with_type(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = type_name.into();
        self
    }

    pub fn with_property(mut self, name: impl Into<String>, property: Property) -> Self {
        self.properties.insert(name.into(), property);
        self
    }

    /// Adds an attribute with a default value, deriving the type name from the value.
    pub fn with_attribute(self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        let value = value.into();
        let property = Property::attribute(value.type_name(), value);
        self.with_property(name, property)
    }

    pub fn with_child(mut self, child: PrimSpec) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_meta(mut self, meta: PrimMeta) -> Self {
        self.meta = meta;
        self
    }

    pub fn with_variant(mut self, variant_set: impl Into<String>, variant: PrimSpec) -> Self {
        self.variant_sets
            .entry(variant_set.into())
            .or_default()
            .variants
            .insert(variant.name.clone(), variant);
        self
    }

    pub fn child(&self, name: &str) -> Option<&PrimSpec> {
        self.children.iter().find(|child| child.name == name)
    }

    pub fn child_mut(&mut self, name: &str) -> Option<&mut PrimSpec> {
        self.children.iter_mut().find(|child| child.name == name)
    }

    pub fn property(&self, name: &str) -> Option<&Property> {
        self.properties.get(name)
    }

    /// Default value of the named attribute, if authored.
    pub fn attribute_value(&self, name: &str) -> Option<&Value> {
        self.properties.get(name).and_then(Property::value)
    }

    /// Walks `names` down the children of this prim.
    pub fn descendant<'s, 'n>(&'s self, names: impl IntoIterator<Item = &'n str>) -> Option<&'s PrimSpec> {
        names
            .into_iter()
            .try_fold(self, |current, name| current.child(name))
    }

    /// Stamps `context` onto this prim and every prim below it, variants included.
    pub fn set_resolution_recursive(&mut self, context: &ResolutionContext) {
        self.resolution.clone_from(context);
        for child in &mut self.children {
            child.set_resolution_recursive(context);
        }
        for variant_set in self.variant_sets.values_mut() {
            for variant in variant_set.variants.values_mut() {
                variant.set_resolution_recursive(context);
            }
        }
    }

    /// Visits this prim and its descendants (not variants), parents first.
    ///
    /// Fails with the offending path once the nesting exceeds `max_depth`.
    pub fn try_visit(
        &self,
        path: &Path,
        max_depth: usize,
        visit: &mut impl FnMut(&Path, &PrimSpec),
    ) -> Result<(), Path> {
        self.visit_rec(path, 0, max_depth, visit)
    }

    fn visit_rec(
        &self,
        path: &Path,
        depth: usize,
        max_depth: usize,
        visit: &mut impl FnMut(&Path, &PrimSpec),
    ) -> Result<(), Path> {
        if depth > max_depth {
            return Err(path.clone());
        }
        visit(path, self);
        for child in &self.children {
            let child_path = path.append_child(&child.name).unwrap_or_else(|_| path.clone());
            child.visit_rec(&child_path, depth + 1, max_depth, visit)?;
        }
        Ok(())
    }

    /// Returns `true` if this prim or any descendant satisfies `predicate`.
    /// Gives up and returns `false` below `max_depth`.
    pub fn any(&self, max_depth: usize, predicate: &impl Fn(&PrimSpec) -> bool) -> bool {
        self.any_rec(0, max_depth, predicate)
    }

    fn any_rec(&self, depth: usize, max_depth: usize, predicate: &impl Fn(&PrimSpec) -> bool) -> bool {
        if depth > max_depth {
            return false;
        }
        predicate(self)
            || self
                .children
                .iter()
                .any(|child| child.any_rec(depth + 1, max_depth, predicate))
    }
}

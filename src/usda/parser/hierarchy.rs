use anyhow::{anyhow, bail, ensure, Context, Result};

use crate::sdf;
use crate::usda::token::Token;

use super::value::types::Type;

/// Hierarchy parsing functions for prims, attributes, and relationships.
impl<'a> super::Parser<'a> {
    /// Parse the whole token stream into a layer.
    pub fn parse(&mut self) -> Result<sdf::Layer> {
        let mut layer = sdf::Layer::default();
        layer.meta = self.read_layer_header().context("Unable to parse layer header")?;

        while self.peek_next().is_some() {
            let prim = self.read_prim().context("Unable to read root prim")?;
            layer.add_prim_spec(prim)?;
        }

        Ok(layer)
    }

    /// Parse the `#usda 1.0` magic and the optional layer metadata block.
    pub(super) fn read_layer_header(&mut self) -> Result<sdf::LayerMeta> {
        let version = self
            .fetch_next()?
            .try_as_magic()
            .ok_or_else(|| anyhow!("Text file must start with magic token, got {:?}", self.peek_next()))?;
        ensure!(version == "1.0", "File must start with '#usda 1.0', got: {version:?}");

        let mut meta = sdf::LayerMeta::default();

        if !self.is_next(Token::Punctuation('(')) {
            return Ok(meta);
        }
        self.ensure_pun('(')?;

        loop {
            let next = self.fetch_next().context("Unable to fetch next layer metadata entry")?;

            match next {
                Token::Punctuation(')') => break,
                Token::String(doc) => meta.doc = Some(super::token_ops::unescape(doc)),
                Token::Doc => {
                    self.ensure_pun('=')?;
                    meta.doc = Some(self.fetch_string()?);
                }
                Token::SubLayers => {
                    self.ensure_pun('=')?;
                    meta.sub_layers = self.parse_sublayers().context("Unable to parse subLayers")?;
                }
                Token::Identifier(name) => {
                    self.ensure_pun('=')?;
                    self.read_layer_metadata_entry(name, &mut meta)
                        .with_context(|| format!("Unable to parse layer metadata {name}"))?;
                }
                _ => bail!("Unexpected token {next:?}"),
            }
        }

        Ok(meta)
    }

    fn read_layer_metadata_entry(&mut self, name: &str, meta: &mut sdf::LayerMeta) -> Result<()> {
        let as_double = |value: sdf::Value| value.try_as_double().context("Expected double value");

        match name {
            "defaultPrim" => meta.default_prim = Some(self.fetch_string()?),
            "upAxis" => meta.up_axis = Some(self.fetch_string()?),
            "metersPerUnit" => meta.meters_per_unit = Some(as_double(self.parse_value(Type::Double)?)?),
            "startTimeCode" => meta.start_time_code = Some(as_double(self.parse_value(Type::Double)?)?),
            "endTimeCode" => meta.end_time_code = Some(as_double(self.parse_value(Type::Double)?)?),
            "framesPerSecond" => meta.frames_per_second = Some(as_double(self.parse_value(Type::Double)?)?),
            "timeCodesPerSecond" => meta.time_codes_per_second = Some(as_double(self.parse_value(Type::Double)?)?),
            "customLayerData" => meta.custom_layer_data = Some(self.parse_dictionary()?),
            other => {
                let value = self.parse_metadata_value()?;
                meta.other.insert(other.to_owned(), value);
            }
        }
        Ok(())
    }

    /// Parse `def|over|class [Type] "name" (metadata) { body }`.
    pub(super) fn read_prim(&mut self) -> Result<sdf::PrimSpec> {
        let specifier = match self.fetch_next().context("Unable to read prim specifier")? {
            Token::Def => sdf::Specifier::Def,
            Token::Over => sdf::Specifier::Over,
            Token::Class => sdf::Specifier::Class,
            other => bail!("Unexpected prim specifier: {other:?}"),
        };

        let mut type_name = String::new();
        let mut name_token = self.fetch_next()?;
        if let Token::Identifier(prim_type) | Token::NamespacedIdentifier(prim_type) = name_token {
            type_name = prim_type.to_owned();
            name_token = self.fetch_next()?;
        }

        let name = name_token
            .clone()
            .try_as_string()
            .ok_or_else(|| anyhow!("Unexpected token {name_token:?} (want prim name string)"))?;
        ensure!(sdf::is_valid_prim_name(name), "Invalid prim name '{name}'");

        let mut prim = sdf::PrimSpec::new(specifier, name).with_type(type_name);

        if self.is_next(Token::Punctuation('(')) {
            self.fetch_next()?;
            self.read_prim_metadata(&mut prim.meta)
                .with_context(|| format!("Unable to parse metadata of prim '{name}'"))?;
            self.ensure_pun(')').context("Prim metadata must end with )")?;
        }

        self.read_prim_body(&mut prim)
            .with_context(|| format!("Unable to parse body of prim '{name}'"))?;

        Ok(prim)
    }

    /// Parse `{ ... }` holding nested prims, variant sets and properties.
    /// Shared by prims and variants.
    pub(super) fn read_prim_body(&mut self, prim: &mut sdf::PrimSpec) -> Result<()> {
        self.ensure_pun('{')?;

        loop {
            match self.peek_token()? {
                Token::Punctuation('}') => {
                    self.fetch_next()?;
                    break;
                }
                Token::Def | Token::Over | Token::Class => {
                    let child = self.read_prim().context("Unable to read nested prim")?;
                    ensure!(
                        prim.child(&child.name).is_none(),
                        "Prim '{}' is defined twice under '{}'",
                        child.name,
                        prim.name
                    );
                    prim.children.push(child);
                }
                Token::VariantSet => {
                    self.fetch_next()?;
                    self.read_variant_set(prim).context("Unable to read variant set")?;
                }
                _ => self.read_property(prim)?,
            }
        }

        Ok(())
    }

    /// Parse an attribute or relationship, including a list-edit prefix.
    fn read_property(&mut self, prim: &mut sdf::PrimSpec) -> Result<()> {
        let qual = self.fetch_list_edit_qual()?;

        let custom = self.is_next(Token::Custom);
        if custom {
            self.fetch_next()?;
        }

        if self.is_next(Token::Rel) {
            self.fetch_next()?;
            return self
                .read_relationship(prim, qual, custom)
                .context("Unable to read relationship");
        }

        ensure!(
            qual == sdf::ListEditQual::ResetToExplicit,
            "List edits are only supported on relationships"
        );
        self.read_attribute(prim, custom).context("Unable to read attribute")
    }

    /// Parse an attribute declaration: variability, type, name, metadata and value.
    ///
    /// `name.connect` and `name.timeSamples` forms merge into the attribute
    /// declared under `name`.
    pub(super) fn read_attribute(&mut self, prim: &mut sdf::PrimSpec, custom: bool) -> Result<()> {
        let mut variability = sdf::Variability::Varying;

        if self.is_next(Token::Varying) {
            self.fetch_next()?;
        } else if self.is_next(Token::Uniform) {
            variability = sdf::Variability::Uniform;
            self.fetch_next()?;
        }

        let type_token = self.fetch_next()?;
        let type_name = match type_token {
            Token::Identifier(s) | Token::NamespacedIdentifier(s) => s,
            Token::Dictionary => "dictionary",
            other => bail!("Unexpected token type for attribute type, expected Identifier, got {other:?}"),
        };
        let data_type = Self::parse_data_type(type_name)?;

        let full_name = self.fetch_name().context("Attribute name expected")?;
        let (name, suffix) = match full_name.rsplit_once('.') {
            Some((name, suffix @ ("connect" | "timeSamples"))) => (name, Some(suffix)),
            _ => (full_name, None),
        };
        ensure!(sdf::is_valid_property_name(name), "Invalid attribute name '{name}'");

        let property = prim.properties.entry(name.to_owned()).or_insert_with(|| sdf::Property {
            type_name: type_name.to_owned(),
            ..Default::default()
        });
        property.custom |= custom;
        property.variability = variability;

        if self.is_next(Token::Punctuation('(')) {
            self.parse_property_metadata(&mut property.metadata)
                .context("Unable to parse attribute metadata")?;
        }

        if !self.is_next(Token::Punctuation('=')) {
            return Ok(());
        }
        self.ensure_pun('=')?;

        match suffix {
            Some("connect") => {
                let targets = self
                    .parse_connection_targets()
                    .context("Unable to parse connection targets")?;
                property.targets = Some(sdf::ListEdit::explicit(targets));
            }
            Some(_) => {
                property.time_samples = self
                    .parse_time_samples(data_type)
                    .context("Unable to parse time samples")?;
            }
            None if self.is_next(Token::None) => {
                self.fetch_next()?;
                property.default = None;
            }
            None => property.default = Some(self.parse_value(data_type)?),
        }

        if self.is_next(Token::Punctuation('(')) {
            self.parse_property_metadata(&mut property.metadata)
                .context("Unable to parse attribute metadata")?;
        }

        Ok(())
    }

    /// Parse a relationship declaration with optional targets and metadata.
    pub(super) fn read_relationship(
        &mut self,
        prim: &mut sdf::PrimSpec,
        qual: sdf::ListEditQual,
        custom: bool,
    ) -> Result<()> {
        let name = self.fetch_name().context("Relationship name expected")?;
        ensure!(sdf::is_valid_property_name(name), "Invalid relationship name '{name}'");

        let mut property = sdf::Property {
            kind: sdf::PropertyKind::Relationship,
            custom,
            ..Default::default()
        };

        if self.is_next(Token::Punctuation('(')) {
            self.parse_property_metadata(&mut property.metadata)
                .context("Unable to parse relationship metadata")?;
        }

        if self.is_next(Token::Punctuation('=')) {
            self.fetch_next()?;
            let targets = self
                .parse_connection_targets()
                .context("Unable to parse relationship targets")?;
            property.targets = Some(sdf::ListEdit::new(qual, targets));

            if self.is_next(Token::Punctuation('(')) {
                self.parse_property_metadata(&mut property.metadata)
                    .context("Unable to parse relationship metadata")?;
            }
        }

        prim.properties.insert(name.to_owned(), property);
        Ok(())
    }

    /// Parses `None`, `<path>` or `[<path>, ...]`.
    pub(super) fn parse_connection_targets(&mut self) -> Result<Vec<sdf::Path>> {
        if self.is_next(Token::None) {
            self.fetch_next()?;
            return Ok(Vec::new());
        }

        if self.is_next(Token::Punctuation('[')) {
            let mut paths = Vec::new();
            self.parse_array_fn(|this| {
                paths.push(this.parse_path_reference().context("Connection path expected")?);
                Ok(())
            })?;
            Ok(paths)
        } else {
            Ok(vec![self.parse_path_reference()?])
        }
    }

    /// Parses a single `<...>` path reference.
    pub(super) fn parse_path_reference(&mut self) -> Result<sdf::Path> {
        let token = self.fetch_next()?;
        let path_str = token
            .clone()
            .try_as_path_ref()
            .ok_or_else(|| anyhow!("Path reference expected, got {token:?}"))?;
        sdf::Path::new(path_str)
    }

    /// Parse time samples in the format `{ time: value, time: value, ... }`.
    ///
    /// ```text
    /// double3 xformOp:translate.timeSamples = {
    ///     0: (0, 0, 0),
    ///     100: (100, 0, 0),
    /// }
    /// ```
    pub(super) fn parse_time_samples(&mut self, data_type: Type) -> Result<Vec<(f64, sdf::Value)>> {
        self.ensure_pun('{').context("Time samples must start with {")?;

        let mut samples = Vec::new();

        loop {
            if self.is_next(Token::Punctuation('}')) {
                self.fetch_next()?;
                break;
            }

            let time = self.parse_token::<f64>().context("Time sample time expected")?;
            self.ensure_pun(':').context("Expected ':' after time in time sample")?;

            // Blocked samples carry no value.
            if self.is_next(Token::None) {
                self.fetch_next()?;
                log::trace!("Skipping blocked time sample at {time}");
            } else {
                samples.push((time, self.parse_value(data_type)?));
            }

            if self.is_next(Token::Punctuation(',')) {
                self.fetch_next()?;
            }
        }

        Ok(samples)
    }

    /// Parse `variantSet "name" = { "variant" (metadata) { body } ... }`.
    pub(super) fn read_variant_set(&mut self, prim: &mut sdf::PrimSpec) -> Result<()> {
        let set_name = self.fetch_string().context("Expected variant set name string")?;

        self.ensure_pun('=').context("Expected '=' after variant set name")?;
        self.ensure_pun('{').context("Expected '{' to start variant set block")?;

        let mut variant_set = sdf::VariantSet::default();

        loop {
            if self.is_next(Token::Punctuation('}')) {
                self.fetch_next()?;
                break;
            }

            let variant_name = self.fetch_string().context("Expected variant name string")?;
            let mut variant = sdf::PrimSpec::over(variant_name.clone());

            if self.is_next(Token::Punctuation('(')) {
                self.fetch_next()?;
                self.read_prim_metadata(&mut variant.meta)
                    .context("Unable to parse variant metadata")?;
                self.ensure_pun(')').context("Variant metadata must end with )")?;
            }

            self.read_prim_body(&mut variant)
                .with_context(|| format!("Unable to parse variant '{set_name}={variant_name}'"))?;

            variant_set.variants.insert(variant_name, variant);
        }

        prim.variant_sets.insert(set_name, variant_set);
        Ok(())
    }
}

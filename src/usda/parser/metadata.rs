use anyhow::{bail, ensure, Context, Result};

use crate::sdf;
use crate::usda::token::Token;

use super::value::types::{keyword_lexeme, Type};

/// Metadata and dictionary parsing functions.
impl<'a> super::Parser<'a> {
    /// Parse a variant selection map `{ string look = "red" }`.
    pub(super) fn parse_variant_selection_map(&mut self) -> Result<sdf::VariantSelectionMap> {
        self.ensure_pun('{').context("Variant selection must start with {")?;

        let mut selections = sdf::VariantSelectionMap::new();

        loop {
            if self.is_next(Token::Punctuation('}')) {
                self.fetch_next()?;
                break;
            }

            let type_token = self.fetch_next()?;
            ensure!(
                type_token == Token::Identifier("string"),
                "Expected 'string' type in variant selection, got: {type_token:?}"
            );

            let name = self.fetch_name().context("Expected variant set name")?.to_owned();
            self.ensure_pun('=')?;
            let value = self.fetch_string().context("Expected variant selection value")?;
            selections.insert(name, value);

            if self.is_next(Token::Punctuation(',')) || self.is_next(Token::Punctuation(';')) {
                self.fetch_next()?;
            }
        }

        Ok(selections)
    }

    /// Parse a `( ... )` metadata block attached to a property.
    pub(super) fn parse_property_metadata(&mut self, metadata: &mut sdf::Dictionary) -> Result<()> {
        self.ensure_pun('(')?;

        loop {
            if self.is_next(Token::Punctuation(')')) {
                self.fetch_next()?;
                break;
            }

            let name_token = self.fetch_next()?;
            let name = match name_token {
                Token::String(doc) => {
                    metadata.insert("doc".to_owned(), sdf::Value::String(super::token_ops::unescape(doc)));
                    continue;
                }
                Token::Identifier(s) | Token::NamespacedIdentifier(s) => s,
                other => keyword_lexeme(&other)
                    .with_context(|| format!("Unexpected property metadata name token: {other:?}"))?,
            };

            self.ensure_pun('=')?;
            let value = self
                .parse_metadata_value()
                .with_context(|| format!("Unable to parse property metadata value for {name}"))?;
            metadata.insert(name.to_owned(), value);

            if self.is_next(Token::Punctuation(',')) || self.is_next(Token::Punctuation(';')) {
                self.fetch_next()?;
            }
        }

        Ok(())
    }

    /// Parse an untyped metadata value, inferring its type from the tokens.
    pub(super) fn parse_metadata_value(&mut self) -> Result<sdf::Value> {
        if self.is_next(Token::Punctuation('[')) {
            let mut values = Vec::new();
            let mut assets = true;
            self.parse_array_fn(|this| {
                let entry = this.fetch_next()?;
                let value = match entry {
                    Token::AssetRef(v) => v.to_owned(),
                    Token::String(v) => {
                        assets = false;
                        super::token_ops::unescape(v)
                    }
                    Token::Identifier(v) | Token::NamespacedIdentifier(v) | Token::Number(v) => {
                        assets = false;
                        v.to_owned()
                    }
                    other => bail!("Unsupported metadata array element: {other:?}"),
                };
                values.push(value);
                Ok(())
            })?;
            return Ok(if assets && !values.is_empty() {
                sdf::Value::AssetPathVec(values)
            } else {
                sdf::Value::StringVec(values)
            });
        }

        if self.is_next(Token::Punctuation('{')) {
            return Ok(sdf::Value::Dictionary(self.parse_dictionary()?));
        }

        let token = self.fetch_next()?;
        match token {
            Token::String(value) => Ok(sdf::Value::String(super::token_ops::unescape(value))),
            Token::AssetRef(value) => Ok(sdf::Value::AssetPath(value.to_owned())),
            Token::Identifier("true") => Ok(sdf::Value::Bool(true)),
            Token::Identifier("false") => Ok(sdf::Value::Bool(false)),
            Token::Identifier(value) | Token::NamespacedIdentifier(value) => Ok(sdf::Value::Token(value.to_owned())),
            Token::Number(raw) => {
                if let Ok(int) = raw.parse::<i64>() {
                    Ok(sdf::Value::Int64(int))
                } else if let Ok(float) = raw.parse::<f64>() {
                    Ok(sdf::Value::Double(float))
                } else {
                    bail!("Unable to parse numeric metadata value: {raw}");
                }
            }
            Token::Punctuation('(') => {
                let mut values = Vec::new();
                loop {
                    values.push(self.parse_token::<f64>()?);
                    match self.fetch_next()? {
                        Token::Punctuation(',') => continue,
                        Token::Punctuation(')') => break,
                        other => bail!("Unexpected token in metadata tuple: {other:?}"),
                    }
                }
                Ok(sdf::Value::DoubleVec(values))
            }
            other => bail!("Unsupported metadata value token: {other:?}"),
        }
    }

    #[inline]
    fn is_type_hint_name(name: &str) -> bool {
        Self::parse_data_type(name).is_ok()
    }

    /// Parse a dictionary from `{` to `}`. Entries are `type key = value`,
    /// where the type may be omitted.
    pub(super) fn parse_dictionary(&mut self) -> Result<sdf::Dictionary> {
        self.ensure_pun('{').context("Dictionary must start with {")?;

        let mut dict = sdf::Dictionary::new();

        loop {
            if self.is_next(Token::Punctuation('}')) {
                self.fetch_next()?;
                break;
            }

            let first_token = self.fetch_next()?;
            let (type_hint, key_token) = match first_token {
                Token::Identifier(name) if Self::is_type_hint_name(name) => {
                    (Some(Self::parse_data_type(name)?), self.fetch_next()?)
                }
                Token::Dictionary => (Some(Type::Dictionary), self.fetch_next()?),
                _ => (None, first_token),
            };

            let key = match key_token {
                Token::Identifier(s) | Token::NamespacedIdentifier(s) => s.to_owned(),
                Token::String(s) => super::token_ops::unescape(s),
                other => keyword_lexeme(&other)
                    .map(str::to_owned)
                    .with_context(|| format!("Expected dictionary key, got: {other:?}"))?,
            };

            self.ensure_pun('=')?;

            let value = match type_hint {
                Some(ty) => self
                    .parse_value(ty)
                    .with_context(|| format!("Unable to parse dictionary value for {key}"))?,
                None => self.parse_metadata_value()?,
            };
            dict.insert(key, value);

            if self.is_next(Token::Punctuation(',')) || self.is_next(Token::Punctuation(';')) {
                self.fetch_next()?;
            }
        }

        Ok(dict)
    }

    /// Parse prim metadata entries up to (not including) the closing `)`.
    pub(super) fn read_prim_metadata(&mut self, meta: &mut sdf::PrimMeta) -> Result<()> {
        while !self.is_next(Token::Punctuation(')')) {
            let token = self.fetch_next()?;
            self.read_prim_metadata_entry(token, meta)
                .context("Unable to parse prim metadata entry")?;
        }
        Ok(())
    }

    /// Parse a single prim metadata assignment, honoring list-edit prefixes on list fields.
    pub(super) fn read_prim_metadata_entry(&mut self, token: Token<'a>, meta: &mut sdf::PrimMeta) -> Result<()> {
        if let Token::String(doc) = token {
            meta.doc = Some(super::token_ops::unescape(doc));
            return Ok(());
        }

        let (qual, name_token) = match token {
            Token::Add => (sdf::ListEditQual::Add, self.fetch_next()?),
            Token::Append => (sdf::ListEditQual::Append, self.fetch_next()?),
            Token::Delete => (sdf::ListEditQual::Delete, self.fetch_next()?),
            Token::Prepend => (sdf::ListEditQual::Prepend, self.fetch_next()?),
            Token::Reorder => (sdf::ListEditQual::Order, self.fetch_next()?),
            _ => (sdf::ListEditQual::ResetToExplicit, token),
        };
        let is_list_edited = qual != sdf::ListEditQual::ResetToExplicit;

        let name = match name_token {
            Token::Identifier(s) | Token::NamespacedIdentifier(s) => s,
            other => keyword_lexeme(&other).with_context(|| format!("Unexpected metadata name token: {other:?}"))?,
        };

        self.ensure_pun('=')?;

        match name {
            "references" => {
                let references = self.parse_reference_list().context("Unable to parse references")?;
                meta.references = Some(sdf::ListEdit::new(qual, references));
            }
            "payload" => {
                let payloads = self.parse_payload_list().context("Unable to parse payload")?;
                meta.payload = Some(sdf::ListEdit::new(qual, payloads));
            }
            "inherits" => {
                let paths = self.parse_path_list().context("Unable to parse inherits")?;
                meta.inherits = Some(sdf::ListEdit::new(qual, paths));
            }
            "specializes" => {
                let paths = self.parse_path_list().context("Unable to parse specializes")?;
                meta.specializes = Some(sdf::ListEdit::new(qual, paths));
            }
            "variantSets" => {
                let names = self.parse_token_list().context("Unable to parse variantSets")?;
                meta.variant_sets = Some(sdf::ListEdit::new(qual, names));
            }
            "apiSchemas" => {
                let names = self.parse_token_list().context("Unable to parse apiSchemas")?;
                meta.api_schemas = Some(sdf::ListEdit::new(qual, names));
            }
            other => {
                ensure!(!is_list_edited, "Metadata '{other}' does not support list edits");
                self.read_scalar_prim_metadata(other, meta)?;
            }
        }

        Ok(())
    }

    fn read_scalar_prim_metadata(&mut self, name: &str, meta: &mut sdf::PrimMeta) -> Result<()> {
        match name {
            "active" => meta.active = Some(self.parse_bool().context("Unable to parse active flag")?),
            "hidden" => meta.hidden = Some(self.parse_bool().context("Unable to parse hidden flag")?),
            "instanceable" => {
                meta.instanceable = Some(self.parse_bool().context("Unable to parse instanceable flag")?)
            }
            "kind" => meta.kind = Some(self.fetch_string().context("Unable to parse kind")?),
            "doc" => meta.doc = Some(self.fetch_string().context("Unable to parse doc")?),
            "comment" => meta.comment = Some(self.fetch_string().context("Unable to parse comment")?),
            "displayName" => meta.display_name = Some(self.fetch_string().context("Unable to parse displayName")?),
            "sceneName" => meta.scene_name = Some(self.fetch_string().context("Unable to parse sceneName")?),
            "variants" => {
                meta.variants = Some(
                    self.parse_variant_selection_map()
                        .context("Unable to parse variant selections")?,
                )
            }
            "customData" => meta.custom_data = Some(self.parse_dictionary().context("Unable to parse customData")?),
            "assetInfo" => meta.asset_info = Some(self.parse_dictionary().context("Unable to parse assetInfo")?),
            "sdrMetadata" => {
                meta.sdr_metadata = Some(self.parse_dictionary().context("Unable to parse sdrMetadata")?)
            }
            "clips" => meta.clips = Some(self.parse_dictionary().context("Unable to parse clips")?),
            other => {
                let value = self
                    .parse_metadata_value()
                    .with_context(|| format!("Unable to parse prim metadata: {other}"))?;
                meta.other.insert(other.to_owned(), value);
            }
        }
        Ok(())
    }
}

use anyhow::{anyhow, bail, Context, Result};

use crate::sdf;
use crate::usda::token::Token;

use super::value::types::Type;

/// Composition arc parsing functions.
impl<'a> super::Parser<'a> {
    /// Parse a reference: `@asset@</Prim>`, `@asset@` or `</Prim>`, each with
    /// an optional `(offset = ..; scale = ..)` block.
    pub(super) fn parse_reference(&mut self) -> Result<sdf::Reference> {
        let (asset_path, prim_path) = self.parse_arc_target().context("Unable to parse reference target")?;
        let mut reference = sdf::Reference::new(asset_path, prim_path);

        if self.is_next(Token::Punctuation('(')) {
            self.parse_layer_offset(&mut reference.layer_offset)
                .context("Unable to parse reference layer offset")?;
        }

        Ok(reference)
    }

    /// Parse a payload, addressed like a reference.
    pub(super) fn parse_payload(&mut self) -> Result<sdf::Payload> {
        let (asset_path, prim_path) = self.parse_arc_target().context("Unable to parse payload target")?;
        let mut payload = sdf::Payload::new(asset_path, prim_path);

        if self.is_next(Token::Punctuation('(')) {
            let mut layer_offset = sdf::LayerOffset::default();
            self.parse_layer_offset(&mut layer_offset)
                .context("Unable to parse payload layer offset")?;
            payload.layer_offset = Some(layer_offset);
        }

        Ok(payload)
    }

    fn parse_arc_target(&mut self) -> Result<(String, sdf::Path)> {
        let token = self.fetch_next()?;
        match token {
            Token::AssetRef(asset_path) => {
                let prim_path = if matches!(self.peek_next(), Some(Ok(Token::PathRef(..)))) {
                    self.parse_path_reference()?
                } else {
                    sdf::Path::default()
                };
                Ok((asset_path.to_owned(), prim_path))
            }
            Token::PathRef(path) => Ok((String::new(), sdf::Path::new(path)?)),
            other => bail!("Asset or path reference expected, got {other:?}"),
        }
    }

    /// Parse `(offset = ...; scale = ...)` blocks attached to references, payloads or sublayers.
    pub(super) fn parse_layer_offset(&mut self, layer_offset: &mut sdf::LayerOffset) -> Result<()> {
        self.parse_seq_fn(';', |this, _index| {
            let token = this.fetch_next()?;
            this.ensure_pun('=')?;
            let value = this
                .parse_value(Type::Double)?
                .try_as_double()
                .context("Expected double value")?;

            match token {
                Token::Offset => layer_offset.offset = value,
                Token::Scale => layer_offset.scale = value,
                unexpected => bail!("Unexpected token in layer offset: {unexpected:?}"),
            }

            Ok(())
        })
    }

    /// `None`, a single item, or an array of items.
    fn parse_arc_list<T>(&mut self, mut parse_item: impl FnMut(&mut Self) -> Result<T>) -> Result<Vec<T>> {
        if self.is_next(Token::None) {
            self.fetch_next()?;
            return Ok(Vec::new());
        }

        if !self.is_next(Token::Punctuation('[')) {
            return Ok(vec![parse_item(self)?]);
        }

        let mut out = Vec::new();
        self.parse_array_fn(|this| {
            out.push(parse_item(this)?);
            Ok(())
        })?;
        Ok(out)
    }

    pub(super) fn parse_reference_list(&mut self) -> Result<Vec<sdf::Reference>> {
        self.parse_arc_list(Self::parse_reference)
    }

    pub(super) fn parse_payload_list(&mut self) -> Result<Vec<sdf::Payload>> {
        self.parse_arc_list(Self::parse_payload)
    }

    /// Path list used by `inherits` and `specializes`.
    pub(super) fn parse_path_list(&mut self) -> Result<Vec<sdf::Path>> {
        self.parse_arc_list(Self::parse_path_reference)
    }

    /// Parse a list of tokens or strings (`variantSets`, `apiSchemas`).
    pub(super) fn parse_token_list(&mut self) -> Result<Vec<String>> {
        self.parse_arc_list(|this| {
            let token = this.fetch_next()?;
            match token {
                Token::String(s) => Ok(super::token_ops::unescape(s)),
                Token::Identifier(s) | Token::NamespacedIdentifier(s) => Ok(s.to_owned()),
                other => Err(anyhow!("String expected, got {other:?}")),
            }
        })
    }

    /// Parse `subLayers` entries along with their optional `(offset/scale)` metadata.
    pub(super) fn parse_sublayers(&mut self) -> Result<Vec<sdf::SubLayer>> {
        let mut sublayers = Vec::new();

        self.parse_array_fn(|this| {
            let mut sublayer = sdf::SubLayer::new(this.parse_asset_path()?);
            if this.is_next(Token::Punctuation('(')) {
                this.parse_layer_offset(&mut sublayer.layer_offset)?;
            }
            sublayers.push(sublayer);
            Ok(())
        })?;

        Ok(sublayers)
    }
}
